//! Deterministic derivation of provider identifiers from a resource name.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A database instance.
    Db,
    Cluster,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Db => "db",
            ResourceKind::Cluster => "cluster",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `arn:aws:rds:<region>:<account>:<kind>:<name>`
pub fn resource_arn(region: &str, account: &str, kind: ResourceKind, name: &str) -> String {
    format!("arn:aws:rds:{region}:{account}:{kind}:{name}")
}

/// Writer and reader instance identifiers of a dedicated cluster, one per
/// availability zone (`a`, then `b`).
pub fn member_instance_ids(name: &str, region: &str) -> [String; 2] {
    [format!("{name}-{region}a"), format!("{name}-{region}b")]
}
