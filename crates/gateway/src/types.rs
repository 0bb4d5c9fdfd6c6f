//! Wire types for the management API.
//!
//! Field names follow the server's JSON exactly, which is not consistent
//! across endpoint families: topics and connectors use camelCase, repair
//! settings and integration routings use PascalCase, backups mix both.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Cluster addressing
// =============================================================================

/// Cluster name plus cluster-type tag; the server partitions by both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterRef {
    pub cluster_type: String,
    pub name: String,
}

impl ClusterRef {
    pub fn new(cluster_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cluster_type: cluster_type.into(),
            name: name.into(),
        }
    }

    pub fn kafka(name: impl Into<String>) -> Self {
        Self::new("kafka", name)
    }

    pub fn cassandra(name: impl Into<String>) -> Self {
        Self::new("cassandra", name)
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster_type, self.name)
    }
}

// =============================================================================
// Topics
// =============================================================================

/// Create-topic request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPayload {
    pub topic_name: String,
    pub partition_count: i32,
    pub replication_factor: i32,
    pub configs: Vec<ConfigEntry>,
}

/// One topic config as the server spells it (dotted key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
}

/// Topic as returned by the single-topic and list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInfo {
    pub name: String,
    pub partition_count: i32,
    pub replication_factor: i32,
}

/// Incremental config change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfigUpdate {
    pub key: String,
    pub value: String,
    pub op: String,
}

impl TopicConfigUpdate {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            op: "SET".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TopicConfigUpdateRequest {
    pub configs: Vec<TopicConfigUpdate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TopicConfigResponse {
    #[serde(default)]
    pub topic_description: Vec<TopicConfigDescription>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TopicConfigDescription {
    #[serde(default)]
    pub config_entries: Vec<TopicConfigDescribeEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TopicConfigDescribeEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_explicitly_set: bool,
}

impl TopicConfigResponse {
    /// Only entries the operator set explicitly; broker defaults are dropped.
    pub(crate) fn explicit_entries(self) -> Vec<ConfigEntry> {
        self.topic_description
            .into_iter()
            .next()
            .map(|description| {
                description
                    .config_entries
                    .into_iter()
                    .filter(|entry| entry.is_explicitly_set)
                    .map(|entry| ConfigEntry {
                        name: entry.name,
                        value: entry.value,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// ACLs
// =============================================================================

/// A Kafka ACL. It has no id: the full 7-tuple is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acl {
    pub resource_type: String,
    pub resource_name: String,
    pub resource_pattern_type: String,
    pub principal: String,
    pub host: String,
    pub operation: String,
    pub permission_type: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AclListResponse {
    #[serde(default)]
    pub acl_resources: Vec<AclResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AclResource {
    #[serde(default)]
    pub acls: Vec<Acl>,
}

impl AclListResponse {
    pub(crate) fn flatten(self) -> Vec<Acl> {
        self.acl_resources
            .into_iter()
            .flat_map(|resource| resource.acls)
            .collect()
    }
}

// =============================================================================
// Connectors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorPayload {
    pub name: String,
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConnectorConfigRequest<'a> {
    pub config: &'a BTreeMap<String, String>,
}

/// Connector as reported by Kafka Connect.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectorInfo {
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    #[serde(default)]
    pub tasks: Vec<ConnectorTask>,
    #[serde(rename = "type", default)]
    pub connector_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorTask {
    pub connector: String,
    pub task: u32,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConnectorListResponse {
    #[serde(default)]
    pub connectors: BTreeMap<String, ConnectorListEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectorListEntry {
    pub info: ConnectorInfo,
}

// =============================================================================
// Schemas
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReference {
    pub name: String,
    pub subject: String,
    pub version: i64,
}

/// Register-schema request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaPayload {
    pub schema: String,
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SchemaReference>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaIdResponse {
    pub id: i64,
}

/// One registered version of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaVersion {
    pub id: i64,
    pub version: i64,
    pub schema: String,
    /// The registry omits the type for Avro schemas.
    #[serde(rename = "type", default)]
    pub schema_type: String,
    #[serde(default)]
    pub references: Vec<SchemaReference>,
    #[serde(default)]
    pub is_soft_deleted: bool,
}

// =============================================================================
// Health checks
// =============================================================================

/// Alert integration wiring attached to a check. The server owns it; clients
/// preserve it on update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckIntegrations {
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub routing: Vec<String>,
    #[serde(default)]
    pub override_info: bool,
    #[serde(default)]
    pub override_warning: bool,
    #[serde(default)]
    pub override_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShellCheck {
    pub id: String,
    pub name: String,
    pub interval: String,
    pub timeout: String,
    #[serde(default)]
    pub integrations: CheckIntegrations,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub shell: String,
    #[serde(default)]
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpCheck {
    pub id: String,
    pub name: String,
    pub interval: String,
    pub timeout: String,
    #[serde(default)]
    pub integrations: CheckIntegrations,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub supported_agent_type: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub expected_status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpCheck {
    pub id: String,
    pub name: String,
    pub interval: String,
    pub timeout: String,
    #[serde(default)]
    pub integrations: CheckIntegrations,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub supported_agent_type: Vec<String>,
    pub tcp: String,
}

/// All checks of one cluster. The server only accepts the whole object back.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthChecks {
    #[serde(default)]
    pub shellchecks: Vec<ShellCheck>,
    #[serde(default)]
    pub httpchecks: Vec<HttpCheck>,
    #[serde(default)]
    pub tcpchecks: Vec<TcpCheck>,
}

fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

// =============================================================================
// Log collectors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCollector {
    pub name: String,
    /// Regenerated by the server on every replace.
    pub uuid: String,
    pub filename: String,
    #[serde(default)]
    pub date_format: String,
    #[serde(default)]
    pub info_regex: String,
    #[serde(default)]
    pub warning_regex: String,
    #[serde(default)]
    pub error_regex: String,
    #[serde(default)]
    pub supported_agent_type: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub error_alert_threshold: i64,
}

// =============================================================================
// Backups
// =============================================================================

/// A scheduled snapshot definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Backup {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub tag: String,
    #[serde(rename = "LocalRetentionDuration", default)]
    pub local_retention_duration: String,
    #[serde(rename = "Remote", default)]
    pub remote: bool,
    #[serde(rename = "remoteConfig", default, skip_serializing_if = "String::is_empty")]
    pub remote_config: String,
    #[serde(rename = "remotePath", default, skip_serializing_if = "String::is_empty")]
    pub remote_path: String,
    #[serde(
        rename = "RemoteRetentionDuration",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub remote_retention_duration: String,
    #[serde(rename = "remoteType", default, skip_serializing_if = "String::is_empty")]
    pub remote_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub transfers: u32,
    #[serde(rename = "tpslimit", default, skip_serializing_if = "is_zero")]
    pub tps_limit: u32,
    #[serde(rename = "bwlimit", default, skip_serializing_if = "String::is_empty")]
    pub bw_limit: String,
    #[serde(default)]
    pub datacenters: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub keyspaces: Vec<String>,
    #[serde(rename = "allTables", default)]
    pub all_tables: bool,
    #[serde(rename = "allNodes", default)]
    pub all_nodes: bool,
    #[serde(default)]
    pub schedule: bool,
    #[serde(rename = "scheduleExpr", default)]
    pub schedule_expr: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScheduledSnapshotsResponse {
    #[serde(rename = "ScheduledSnapshots", default)]
    pub scheduled_snapshots: Vec<ScheduledSnapshot>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduledSnapshot {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Params", default)]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduledParam {
    #[serde(rename = "BackupDetails", default)]
    pub backup_details: String,
}

/// Decode the scheduled-snapshot listing.
///
/// `Params` arrives either as an array of `{BackupDetails}` or as a string
/// holding that same array as JSON; `BackupDetails` is itself JSON-encoded.
/// Both shapes are accepted. Entries whose details do not decode are skipped.
pub(crate) fn decode_backups(body: &str) -> Result<Vec<Backup>> {
    let response: ScheduledSnapshotsResponse = serde_json::from_str(body)?;
    let mut backups = Vec::new();

    for snapshot in response.scheduled_snapshots {
        let decoded = match snapshot.params {
            None | Some(serde_json::Value::Null) => continue,
            Some(serde_json::Value::String(wrapped)) => serde_json::from_str::<Vec<ScheduledParam>>(&wrapped),
            Some(value) => serde_json::from_value::<Vec<ScheduledParam>>(value),
        };
        let params = match decoded {
            Ok(params) => params,
            Err(e) => {
                log::warn!("skipping snapshot {} with undecodable params: {e}", snapshot.id);
                continue;
            }
        };

        for param in params {
            if param.backup_details.is_empty() {
                continue;
            }
            let Ok(mut backup) = serde_json::from_str::<Backup>(&param.backup_details) else {
                log::warn!("skipping undecodable backup details in snapshot {}", snapshot.id);
                continue;
            };
            if backup.id.is_empty() {
                backup.id.clone_from(&snapshot.id);
            }
            backups.push(backup);
        }
    }

    Ok(backups)
}

// =============================================================================
// Adaptive repair
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RepairSettings {
    pub active: bool,
    pub gc_grace_threshold: i64,
    pub table_parallelism: i64,
    #[serde(default)]
    pub blacklisted_tables: Vec<String>,
    #[serde(rename = "FilterTWCSTables")]
    pub filter_twcs_tables: bool,
    pub segment_retries: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub segments_per_vnode: i64,
    #[serde(rename = "SegmentTargetSizeMB", default, skip_serializing_if = "is_zero")]
    pub segment_target_size_mb: i64,
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            active: true,
            gc_grace_threshold: 86_400,
            table_parallelism: 10,
            blacklisted_tables: Vec::new(),
            filter_twcs_tables: true,
            segment_retries: 3,
            segments_per_vnode: 1,
            segment_target_size_mb: 256,
        }
    }
}

// =============================================================================
// Alert rules
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub id: String,
    pub alert: String,
    #[serde(default)]
    pub r#for: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub warning_value: f64,
    #[serde(default)]
    pub critical_value: f64,
    #[serde(default)]
    pub expr: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub widget_title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub correlation_id: String,
    #[serde(default)]
    pub annotations: AlertAnnotations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<AlertFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertAnnotations {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub widget_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlertFilter {
    pub name: String,
    #[serde(default)]
    pub value: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AlertRulesResponse {
    #[serde(default)]
    pub metricrules: Vec<AlertRule>,
}

// =============================================================================
// Alert routing
// =============================================================================

/// Alert category a route applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Global,
    Metrics,
    Backups,
    ServiceChecks,
    Nodes,
    Commands,
    Repairs,
    RollingRestart,
}

impl RouteType {
    pub const ALL: [RouteType; 8] = [
        Self::Global,
        Self::Metrics,
        Self::Backups,
        Self::ServiceChecks,
        Self::Nodes,
        Self::Commands,
        Self::Repairs,
        Self::RollingRestart,
    ];

    /// Name used in configuration and import ids.
    #[must_use]
    pub fn config_name(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Metrics => "metrics",
            Self::Backups => "backups",
            Self::ServiceChecks => "servicechecks",
            Self::Nodes => "nodes",
            Self::Commands => "commands",
            Self::Repairs => "repairs",
            Self::RollingRestart => "rollingrestart",
        }
    }

    /// Human-readable name the server uses in payloads.
    #[must_use]
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Global => "Global",
            Self::Metrics => "Metrics",
            Self::Backups => "Backups",
            Self::ServiceChecks => "Service Checks",
            Self::Nodes => "Nodes",
            Self::Commands => "Commands",
            Self::Repairs => "Repairs",
            Self::RollingRestart => "Rolling Restart",
        }
    }

    /// Path segment form of [`api_name`](Self::api_name).
    #[must_use]
    pub fn path_segment(&self) -> String {
        urlencoding::encode(self.api_name()).into_owned()
    }

    /// Whether routes of this type support per-severity overrides.
    #[must_use]
    pub fn supports_override(&self) -> bool {
        !matches!(self, Self::Global)
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config_name())
    }
}

impl FromStr for RouteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|route| route.config_name() == s)
            .ok_or_else(|| Error::config(format!("unknown route type: {s}")))
    }
}

/// Integrations and routings of one cluster.
///
/// Responses use PascalCase; camelCase spellings are accepted too so both
/// server generations decode to the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Integrations {
    #[serde(rename = "Definitions", alias = "definitions", default)]
    pub definitions: Vec<IntegrationDefinition>,
    #[serde(rename = "Routings", alias = "routings", default)]
    pub routings: Vec<IntegrationRouting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntegrationDefinition {
    #[serde(rename = "ID", alias = "id", default)]
    pub id: String,
    #[serde(rename = "Type", alias = "type", default)]
    pub integration_type: String,
    #[serde(rename = "Params", alias = "params", default)]
    pub params: BTreeMap<String, String>,
}

impl IntegrationDefinition {
    #[must_use]
    pub fn name(&self) -> &str {
        self.params.get("name").map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntegrationRouting {
    #[serde(rename = "Type", alias = "type", default)]
    pub route_type: String,
    #[serde(rename = "Routing", alias = "routing", default)]
    pub routing: Vec<IntegrationRoute>,
    #[serde(rename = "OverrideInfo", alias = "overrideInfo", default)]
    pub override_info: bool,
    #[serde(rename = "OverrideWarning", alias = "overrideWarning", default)]
    pub override_warning: bool,
    #[serde(rename = "OverrideError", alias = "overrideError", default)]
    pub override_error: bool,
}

impl IntegrationRouting {
    /// Override flag for a severity; unknown severities have none.
    #[must_use]
    pub fn override_for(&self, severity: &str) -> Option<bool> {
        match severity.to_ascii_lowercase().as_str() {
            "info" => Some(self.override_info),
            "warning" => Some(self.override_warning),
            "error" => Some(self.override_error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntegrationRoute {
    #[serde(rename = "ID", alias = "id", default)]
    pub id: String,
    #[serde(rename = "Severity", alias = "severity", default)]
    pub severity: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OverridePayload {
    pub value: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_ref_display() {
        assert_eq!(ClusterRef::kafka("prod").to_string(), "kafka/prod");
        assert_eq!(ClusterRef::cassandra("c1").to_string(), "cassandra/c1");
    }

    #[test]
    fn test_topic_payload_wire_names() {
        let payload = TopicPayload {
            topic_name: "orders".to_string(),
            partition_count: 6,
            replication_factor: 3,
            configs: vec![ConfigEntry {
                name: "cleanup.policy".to_string(),
                value: "compact".to_string(),
            }],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["topicName"], "orders");
        assert_eq!(json["partitionCount"], 6);
        assert_eq!(json["replicationFactor"], 3);
        assert_eq!(json["configs"][0]["name"], "cleanup.policy");
    }

    #[test]
    fn test_explicit_entries_only() {
        let response: TopicConfigResponse = serde_json::from_str(
            r#"{"topicDescription":[{"topicName":"orders","configEntries":[
                {"name":"cleanup.policy","value":"compact","source":"DYNAMIC_TOPIC_CONFIG","isExplicitlySet":true},
                {"name":"retention.ms","value":"604800000","source":"DEFAULT_CONFIG","isExplicitlySet":false}
            ]}]}"#,
        )
        .unwrap();
        let entries = response.explicit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "cleanup.policy");
    }

    #[test]
    fn test_explicit_entries_empty_description() {
        let response: TopicConfigResponse = serde_json::from_str("{}").unwrap();
        assert!(response.explicit_entries().is_empty());
    }

    #[test]
    fn test_acl_list_flatten() {
        let response: AclListResponse = serde_json::from_str(
            r#"{"aclResources":[{"resourceType":"TOPIC","resourceName":"orders","resourcePatternType":"LITERAL","acls":[
                {"resourceType":"TOPIC","resourceName":"orders","resourcePatternType":"LITERAL","principal":"User:a","host":"*","operation":"READ","permissionType":"ALLOW"},
                {"resourceType":"TOPIC","resourceName":"orders","resourcePatternType":"LITERAL","principal":"User:b","host":"*","operation":"WRITE","permissionType":"ALLOW"}
            ]}]}"#,
        )
        .unwrap();
        let acls = response.flatten();
        assert_eq!(acls.len(), 2);
        assert_eq!(acls[1].principal, "User:b");
    }

    #[test]
    fn test_schema_payload_omits_empty_references() {
        let payload = SchemaPayload {
            schema: "{}".to_string(),
            schema_type: "AVRO".to_string(),
            references: vec![],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("references").is_none());
        assert_eq!(json["schemaType"], "AVRO");
    }

    #[test]
    fn test_http_check_omits_empty_optionals() {
        let check = HttpCheck {
            id: "1".to_string(),
            name: "api".to_string(),
            url: "http://x".to_string(),
            ..HttpCheck::default()
        };
        let json = serde_json::to_value(&check).unwrap();
        assert!(json.get("headers").is_none());
        assert!(json.get("body").is_none());
        assert!(json.get("expectedStatus").is_none());
        assert_eq!(json["integrations"]["Routing"], serde_json::json!([]));
    }

    #[test]
    fn test_repair_settings_defaults_and_names() {
        let json = serde_json::to_value(RepairSettings::default()).unwrap();
        assert_eq!(json["Active"], true);
        assert_eq!(json["TableParallelism"], 10);
        assert_eq!(json["GcGraceThreshold"], 86_400);
        assert_eq!(json["FilterTWCSTables"], true);
        assert_eq!(json["SegmentRetries"], 3);
        assert_eq!(json["SegmentsPerVnode"], 1);
        assert_eq!(json["SegmentTargetSizeMB"], 256);
    }

    fn backup_details(tag: &str, id: &str) -> String {
        serde_json::to_string(&Backup {
            id: id.to_string(),
            tag: tag.to_string(),
            schedule: true,
            schedule_expr: "0 1 * * *".to_string(),
            ..Backup::default()
        })
        .unwrap()
    }

    #[test]
    fn test_decode_backups_array_params() {
        let params = serde_json::json!([{ "BackupDetails": backup_details("nightly", "b-1") }]);
        let body = serde_json::json!({
            "ScheduledSnapshots": [{ "ID": "snap-1", "Params": params }]
        })
        .to_string();

        let backups = decode_backups(&body).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].tag, "nightly");
        assert_eq!(backups[0].id, "b-1");
    }

    #[test]
    fn test_decode_backups_string_wrapped_params() {
        let params = serde_json::json!([{ "BackupDetails": backup_details("weekly", "") }]);
        let body = serde_json::json!({
            "ScheduledSnapshots": [{ "ID": "snap-2", "Params": params.to_string() }]
        })
        .to_string();

        let backups = decode_backups(&body).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].tag, "weekly");
        // Missing backup id falls back to the snapshot id
        assert_eq!(backups[0].id, "snap-2");
    }

    #[test]
    fn test_decode_backups_skips_garbage() {
        let body = serde_json::json!({
            "ScheduledSnapshots": [
                { "ID": "a", "Params": null },
                { "ID": "b", "Params": [{ "BackupDetails": "not json" }] },
                { "ID": "c", "Params": [{ "BackupDetails": "" }] }
            ]
        })
        .to_string();
        assert!(decode_backups(&body).unwrap().is_empty());
    }

    #[test]
    fn test_decode_backups_skips_undecodable_params() {
        let good = serde_json::json!([{ "BackupDetails": backup_details("nightly", "b-1") }]);
        let body = serde_json::json!({
            "ScheduledSnapshots": [
                { "ID": "bad-string", "Params": "not an array" },
                { "ID": "bad-shape", "Params": { "BackupDetails": 7 } },
                { "ID": "snap-1", "Params": good }
            ]
        })
        .to_string();

        let backups = decode_backups(&body).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].id, "b-1");
    }

    #[test]
    fn test_route_type_names() {
        assert_eq!(RouteType::ServiceChecks.path_segment(), "Service%20Checks");
        assert_eq!(RouteType::RollingRestart.path_segment(), "Rolling%20Restart");
        assert_eq!(RouteType::Metrics.path_segment(), "Metrics");
        assert_eq!(RouteType::ServiceChecks.api_name(), "Service Checks");
        assert_eq!("servicechecks".parse::<RouteType>().unwrap(), RouteType::ServiceChecks);
        assert!("pager".parse::<RouteType>().is_err());
        assert!(!RouteType::Global.supports_override());
    }

    #[test]
    fn test_route_type_serde_matches_config_name() {
        for route in RouteType::ALL {
            let json = serde_json::to_value(route).unwrap();
            assert_eq!(json, route.config_name());
        }
    }

    #[test]
    fn test_integrations_accept_both_casings() {
        let pascal: Integrations = serde_json::from_str(
            r#"{"Definitions":[{"ID":"i1","Type":"slack","Params":{"name":"ops"}}],
                "Routings":[{"Type":"Service Checks","Routing":[{"ID":"i1","Severity":"warning"}],"OverrideWarning":true}]}"#,
        )
        .unwrap();
        let camel: Integrations = serde_json::from_str(
            r#"{"definitions":[{"id":"i1","type":"slack","params":{"name":"ops"}}],
                "routings":[{"type":"Service Checks","routing":[{"id":"i1","severity":"warning"}],"overrideWarning":true}]}"#,
        )
        .unwrap();
        assert_eq!(pascal, camel);
        assert_eq!(pascal.definitions[0].name(), "ops");
        assert_eq!(pascal.routings[0].override_for("WARNING"), Some(true));
        assert_eq!(pascal.routings[0].override_for("info"), Some(false));
        assert_eq!(pascal.routings[0].override_for("debug"), None);
    }

    #[test]
    fn test_alert_rule_wire_names() {
        let rule = AlertRule {
            id: "r1".to_string(),
            alert: "High CPU".to_string(),
            r#for: "15m".to_string(),
            filters: vec![AlertFilter {
                name: "dc".to_string(),
                value: vec!["dc1".to_string()],
            }],
            ..AlertRule::default()
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["for"], "15m");
        assert_eq!(json["filters"][0]["Name"], "dc");
        assert!(json.get("widgetTitle").is_none());
    }
}
