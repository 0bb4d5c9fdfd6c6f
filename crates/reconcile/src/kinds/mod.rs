//! Kind descriptors, one module per resource kind.

pub mod acl;
pub mod alert_route;
pub mod alert_rule;
pub mod backup;
pub mod connector;
pub mod healthcheck;
pub mod log_collector;
pub mod repair;
pub mod schema;
pub mod topic;

use gateway::ClusterRef;

pub use acl::{AclKind, AclSpec};
pub use alert_route::{AlertRouteComputed, AlertRouteKind, AlertRouteSpec};
pub use alert_rule::{AlertRuleKind, AlertRuleSpec};
pub use backup::{BackupKind, BackupSpec};
pub use connector::{ConnectorComputed, ConnectorKind, ConnectorSpec};
pub use healthcheck::{
    HttpCheckKind, HttpCheckSpec, ShellCheckKind, ShellCheckSpec, TcpCheckKind, TcpCheckSpec,
};
pub use log_collector::{LogCollectorKind, LogCollectorSpec};
pub use repair::{RepairKind, RepairSpec};
pub use schema::{SchemaComputed, SchemaKind, SchemaSpec};
pub use topic::{TopicKind, TopicSpec};

/// `clusterType/cluster` from the first two import segments.
pub(crate) fn typed_cluster(segments: &[&str]) -> ClusterRef {
    ClusterRef::new(segments[0], segments[1])
}

fn default_agents() -> Vec<String> {
    vec!["all".to_string()]
}

fn default_true() -> bool {
    true
}
