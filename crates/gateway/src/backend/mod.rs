//! The [`Gateway`] trait and its implementations.
//!
//! [`http::HttpGateway`] talks to a real management host. [`MockGateway`]
//! simulates one in memory, records every call and can be told to reject the
//! next call of a given operation.
//!
//! ```
//! use gateway::backend::{Gateway, MockGateway};
//! use gateway::{CallContext, ClusterRef, TopicPayload};
//!
//! let mock = MockGateway::new();
//! let cluster = ClusterRef::kafka("prod");
//! let ctx = CallContext::background();
//!
//! mock.create_topic(&ctx, &cluster, &TopicPayload {
//!     topic_name: "orders".to_string(),
//!     partition_count: 6,
//!     replication_factor: 3,
//!     configs: vec![],
//! }).unwrap();
//!
//! assert!(mock.get_topic(&ctx, &cluster, "orders").unwrap().is_some());
//! assert_eq!(mock.calls(), vec!["create_topic kafka/prod", "get_topic kafka/prod"]);
//! ```

pub mod http;

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::types::{
    Acl, AlertRule, Backup, ClusterRef, ConfigEntry, ConnectorInfo, ConnectorPayload,
    HealthChecks, IntegrationDefinition, IntegrationRoute, IntegrationRouting, Integrations,
    LogCollector, RepairSettings, RouteType, SchemaPayload, SchemaVersion, TopicConfigUpdate,
    TopicInfo, TopicPayload,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One method per remote endpoint.
///
/// Write operations succeed on any 2xx and surface everything else as
/// [`Error::Remote`]. Read-one operations return `Ok(None)` on 404. Collection
/// reads always return the whole collection; there is no server-side filter.
/// Nothing is retried.
pub trait Gateway: Send + Sync {
    // Topics
    fn create_topic(&self, ctx: &CallContext, cluster: &ClusterRef, payload: &TopicPayload)
    -> Result<()>;
    fn get_topic(&self, ctx: &CallContext, cluster: &ClusterRef, name: &str)
    -> Result<Option<TopicInfo>>;
    /// Explicitly set configs of a topic.
    fn get_topic_configs(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &str,
    ) -> Result<Option<Vec<ConfigEntry>>>;
    fn list_topics(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<TopicInfo>>;
    fn update_topic_configs(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &str,
        updates: &[TopicConfigUpdate],
    ) -> Result<()>;
    fn delete_topic(&self, ctx: &CallContext, cluster: &ClusterRef, name: &str) -> Result<()>;

    // ACLs
    fn list_acls(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<Acl>>;
    fn create_acl(&self, ctx: &CallContext, cluster: &ClusterRef, acl: &Acl) -> Result<()>;
    /// The ACL has no id; the full tuple is sent as the request body.
    fn delete_acl(&self, ctx: &CallContext, cluster: &ClusterRef, acl: &Acl) -> Result<()>;

    // Connectors
    fn create_connector(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
        payload: &ConnectorPayload,
    ) -> Result<ConnectorInfo>;
    /// Every connector of a connect cluster; an unknown connect cluster
    /// yields an empty list.
    fn list_connectors(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
    ) -> Result<Vec<ConnectorInfo>>;
    fn update_connector_config(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
        name: &str,
        config: &BTreeMap<String, String>,
    ) -> Result<ConnectorInfo>;
    fn delete_connector(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
        name: &str,
    ) -> Result<()>;

    // Schemas
    /// Register a schema under a subject; returns the schema id.
    fn register_schema(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        subject: &str,
        payload: &SchemaPayload,
    ) -> Result<i64>;
    /// `version` is a number or `latest`.
    fn get_schema(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        subject: &str,
        version: &str,
    ) -> Result<Option<SchemaVersion>>;
    fn delete_schema(&self, ctx: &CallContext, cluster: &ClusterRef, subject: &str)
    -> Result<()>;

    // Health checks and log collectors (whole-collection replace only)
    fn get_healthchecks(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<HealthChecks>;
    fn replace_healthchecks(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        checks: &HealthChecks,
    ) -> Result<()>;
    fn get_log_collectors(&self, ctx: &CallContext, cluster: &ClusterRef)
    -> Result<Vec<LogCollector>>;
    fn replace_log_collectors(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        collectors: &[LogCollector],
    ) -> Result<()>;

    // Backups
    fn list_backups(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<Backup>>;
    fn create_backup(&self, ctx: &CallContext, cluster: &ClusterRef, backup: &Backup)
    -> Result<()>;
    fn delete_backups(&self, ctx: &CallContext, cluster: &ClusterRef, ids: &[String])
    -> Result<()>;

    // Adaptive repair
    fn get_repair_settings(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
    ) -> Result<Option<RepairSettings>>;
    fn put_repair_settings(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        settings: &RepairSettings,
    ) -> Result<()>;

    // Alert rules
    fn list_alert_rules(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<AlertRule>>;
    /// Create or update; the rule id decides which.
    fn put_alert_rule(&self, ctx: &CallContext, cluster: &ClusterRef, rule: &AlertRule)
    -> Result<()>;
    fn delete_alert_rule(&self, ctx: &CallContext, cluster: &ClusterRef, id: &str) -> Result<()>;

    // Alert routing
    fn get_integrations(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Integrations>;
    fn set_route_override(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        value: bool,
    ) -> Result<()>;
    fn add_route(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        integration_id: &str,
    ) -> Result<()>;
    fn remove_route(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        integration_id: &str,
    ) -> Result<()>;
}

// =============================================================================
// Mock
// =============================================================================

#[derive(Debug)]
struct StoredTopic {
    info: TopicInfo,
    configs: Vec<ConfigEntry>,
}

#[derive(Debug, Default)]
struct MockState {
    topics: HashMap<ClusterRef, BTreeMap<String, StoredTopic>>,
    acls: HashMap<ClusterRef, Vec<Acl>>,
    connectors: HashMap<(ClusterRef, String), BTreeMap<String, ConnectorInfo>>,
    schemas: HashMap<ClusterRef, BTreeMap<String, Vec<SchemaVersion>>>,
    healthchecks: HashMap<ClusterRef, HealthChecks>,
    log_collectors: HashMap<ClusterRef, Vec<LogCollector>>,
    backups: HashMap<ClusterRef, Vec<Backup>>,
    repair: HashMap<ClusterRef, RepairSettings>,
    alert_rules: HashMap<ClusterRef, Vec<AlertRule>>,
    integrations: HashMap<ClusterRef, Integrations>,
    calls: Vec<String>,
    failures: HashMap<String, (u16, String)>,
    next_schema_id: i64,
    regenerate_uuids: bool,
    uuid_counter: u64,
}

/// In-memory stand-in for the management API.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the reconciler owns another.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    /// Create an empty mock server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call of `operation` fail with `status` and `body`.
    pub fn fail_next(&self, operation: &str, status: u16, body: impl Into<String>) {
        self.lock()
            .failures
            .insert(operation.to_string(), (status, body.into()));
    }

    /// Regenerate every log collector uuid on replace, like the real server.
    pub fn regenerate_log_collector_uuids(&self, enabled: bool) {
        self.lock().regenerate_uuids = enabled;
    }

    /// Every call so far as `"<operation> <cluster>"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Register an alert integration (integrations are managed outside).
    pub fn add_integration(
        &self,
        cluster: &ClusterRef,
        id: &str,
        integration_type: &str,
        name: &str,
    ) {
        let mut state = self.lock();
        state
            .integrations
            .entry(cluster.clone())
            .or_default()
            .definitions
            .push(IntegrationDefinition {
                id: id.to_string(),
                integration_type: integration_type.to_string(),
                params: BTreeMap::from([("name".to_string(), name.to_string())]),
            });
    }

    /// Put an existing topic on the server, bypassing call recording.
    pub fn seed_topic(&self, cluster: &ClusterRef, info: TopicInfo, configs: Vec<ConfigEntry>) {
        self.lock()
            .topics
            .entry(cluster.clone())
            .or_default()
            .insert(info.name.clone(), StoredTopic { info, configs });
    }

    /// Replace the server's health checks, bypassing call recording.
    pub fn seed_healthchecks(&self, cluster: &ClusterRef, checks: HealthChecks) {
        self.lock().healthchecks.insert(cluster.clone(), checks);
    }

    /// Replace the server's log collectors, bypassing call recording.
    pub fn seed_log_collectors(&self, cluster: &ClusterRef, collectors: Vec<LogCollector>) {
        self.lock().log_collectors.insert(cluster.clone(), collectors);
    }

    /// Current server-side ACLs of a cluster.
    #[must_use]
    pub fn acls(&self, cluster: &ClusterRef) -> Vec<Acl> {
        self.lock().acls.get(cluster).cloned().unwrap_or_default()
    }

    /// Current server-side log collectors of a cluster.
    #[must_use]
    pub fn log_collectors(&self, cluster: &ClusterRef) -> Vec<LogCollector> {
        self.lock()
            .log_collectors
            .get(cluster)
            .cloned()
            .unwrap_or_default()
    }

    /// Current server-side health checks of a cluster.
    #[must_use]
    pub fn healthchecks(&self, cluster: &ClusterRef) -> HealthChecks {
        self.lock()
            .healthchecks
            .get(cluster)
            .cloned()
            .unwrap_or_default()
    }

    /// Record the call, honour the context and any injected failure.
    fn begin(
        &self,
        ctx: &CallContext,
        operation: &str,
        cluster: &ClusterRef,
    ) -> Result<MutexGuard<'_, MockState>> {
        ctx.check()?;
        let mut state = self.lock();
        state.calls.push(format!("{operation} {cluster}"));
        if let Some((status, body)) = state.failures.remove(operation) {
            return Err(Error::remote("MOCK", format!("mock://{operation}"), status, body));
        }
        Ok(state)
    }
}

fn not_found(operation: &str, what: &str) -> Error {
    Error::remote("MOCK", format!("mock://{operation}"), 404, format!("{what} not found"))
}

impl Gateway for MockGateway {
    fn create_topic(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        payload: &TopicPayload,
    ) -> Result<()> {
        let mut state = self.begin(ctx, "create_topic", cluster)?;
        let topics = state.topics.entry(cluster.clone()).or_default();
        if topics.contains_key(&payload.topic_name) {
            return Err(Error::remote(
                "MOCK",
                "mock://create_topic",
                409,
                format!("topic {} already exists", payload.topic_name),
            ));
        }
        topics.insert(
            payload.topic_name.clone(),
            StoredTopic {
                info: TopicInfo {
                    name: payload.topic_name.clone(),
                    partition_count: payload.partition_count,
                    replication_factor: payload.replication_factor,
                },
                configs: payload.configs.clone(),
            },
        );
        Ok(())
    }

    fn get_topic(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &str,
    ) -> Result<Option<TopicInfo>> {
        let state = self.begin(ctx, "get_topic", cluster)?;
        Ok(state
            .topics
            .get(cluster)
            .and_then(|topics| topics.get(name))
            .map(|topic| topic.info.clone()))
    }

    fn get_topic_configs(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &str,
    ) -> Result<Option<Vec<ConfigEntry>>> {
        let state = self.begin(ctx, "get_topic_configs", cluster)?;
        Ok(state
            .topics
            .get(cluster)
            .and_then(|topics| topics.get(name))
            .map(|topic| topic.configs.clone()))
    }

    fn list_topics(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<TopicInfo>> {
        let state = self.begin(ctx, "list_topics", cluster)?;
        Ok(state
            .topics
            .get(cluster)
            .map(|topics| topics.values().map(|topic| topic.info.clone()).collect())
            .unwrap_or_default())
    }

    fn update_topic_configs(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &str,
        updates: &[TopicConfigUpdate],
    ) -> Result<()> {
        let mut state = self.begin(ctx, "update_topic_configs", cluster)?;
        let topic = state
            .topics
            .get_mut(cluster)
            .and_then(|topics| topics.get_mut(name))
            .ok_or_else(|| not_found("update_topic_configs", name))?;
        for update in updates {
            match topic.configs.iter_mut().find(|entry| entry.name == update.key) {
                Some(entry) => entry.value.clone_from(&update.value),
                None => topic.configs.push(ConfigEntry {
                    name: update.key.clone(),
                    value: update.value.clone(),
                }),
            }
        }
        Ok(())
    }

    fn delete_topic(&self, ctx: &CallContext, cluster: &ClusterRef, name: &str) -> Result<()> {
        let mut state = self.begin(ctx, "delete_topic", cluster)?;
        state
            .topics
            .get_mut(cluster)
            .and_then(|topics| topics.remove(name))
            .map(|_| ())
            .ok_or_else(|| not_found("delete_topic", name))
    }

    fn list_acls(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<Acl>> {
        let state = self.begin(ctx, "list_acls", cluster)?;
        Ok(state.acls.get(cluster).cloned().unwrap_or_default())
    }

    fn create_acl(&self, ctx: &CallContext, cluster: &ClusterRef, acl: &Acl) -> Result<()> {
        let mut state = self.begin(ctx, "create_acl", cluster)?;
        let acls = state.acls.entry(cluster.clone()).or_default();
        if !acls.contains(acl) {
            acls.push(acl.clone());
        }
        Ok(())
    }

    fn delete_acl(&self, ctx: &CallContext, cluster: &ClusterRef, acl: &Acl) -> Result<()> {
        let mut state = self.begin(ctx, "delete_acl", cluster)?;
        let acls = state.acls.entry(cluster.clone()).or_default();
        let before = acls.len();
        acls.retain(|existing| existing != acl);
        if acls.len() == before {
            return Err(not_found("delete_acl", &acl.principal));
        }
        Ok(())
    }

    fn create_connector(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
        payload: &ConnectorPayload,
    ) -> Result<ConnectorInfo> {
        let mut state = self.begin(ctx, "create_connector", cluster)?;
        let mut config = payload.config.clone();
        // Kafka Connect echoes the name back inside the config.
        config.insert("name".to_string(), payload.name.clone());
        let connector_type = if config
            .get("connector.class")
            .is_some_and(|class| class.to_ascii_lowercase().contains("sink"))
        {
            "sink"
        } else {
            "source"
        };
        let info = ConnectorInfo {
            name: payload.name.clone(),
            config,
            tasks: vec![],
            connector_type: connector_type.to_string(),
        };
        state
            .connectors
            .entry((cluster.clone(), connect.to_string()))
            .or_default()
            .insert(payload.name.clone(), info.clone());
        Ok(info)
    }

    fn list_connectors(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
    ) -> Result<Vec<ConnectorInfo>> {
        let state = self.begin(ctx, "list_connectors", cluster)?;
        Ok(state
            .connectors
            .get(&(cluster.clone(), connect.to_string()))
            .map(|connectors| connectors.values().cloned().collect())
            .unwrap_or_default())
    }

    fn update_connector_config(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
        name: &str,
        config: &BTreeMap<String, String>,
    ) -> Result<ConnectorInfo> {
        let mut state = self.begin(ctx, "update_connector_config", cluster)?;
        let info = state
            .connectors
            .get_mut(&(cluster.clone(), connect.to_string()))
            .and_then(|connectors| connectors.get_mut(name))
            .ok_or_else(|| not_found("update_connector_config", name))?;
        info.config.clone_from(config);
        info.config.insert("name".to_string(), name.to_string());
        Ok(info.clone())
    }

    fn delete_connector(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
        name: &str,
    ) -> Result<()> {
        let mut state = self.begin(ctx, "delete_connector", cluster)?;
        state
            .connectors
            .get_mut(&(cluster.clone(), connect.to_string()))
            .and_then(|connectors| connectors.remove(name))
            .map(|_| ())
            .ok_or_else(|| not_found("delete_connector", name))
    }

    fn register_schema(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        subject: &str,
        payload: &SchemaPayload,
    ) -> Result<i64> {
        let mut state = self.begin(ctx, "register_schema", cluster)?;
        state.next_schema_id += 1;
        let id = state.next_schema_id;
        let versions = state
            .schemas
            .entry(cluster.clone())
            .or_default()
            .entry(subject.to_string())
            .or_default();
        let version = i64::try_from(versions.len()).unwrap_or(i64::MAX) + 1;
        versions.push(SchemaVersion {
            id,
            version,
            schema: payload.schema.clone(),
            schema_type: payload.schema_type.clone(),
            references: payload.references.clone(),
            is_soft_deleted: false,
        });
        Ok(id)
    }

    fn get_schema(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        subject: &str,
        version: &str,
    ) -> Result<Option<SchemaVersion>> {
        let state = self.begin(ctx, "get_schema", cluster)?;
        let Some(versions) = state.schemas.get(cluster).and_then(|s| s.get(subject)) else {
            return Ok(None);
        };
        if version == "latest" {
            return Ok(versions.last().cloned());
        }
        Ok(version
            .parse::<i64>()
            .ok()
            .and_then(|wanted| versions.iter().find(|v| v.version == wanted))
            .cloned())
    }

    fn delete_schema(&self, ctx: &CallContext, cluster: &ClusterRef, subject: &str) -> Result<()> {
        let mut state = self.begin(ctx, "delete_schema", cluster)?;
        state
            .schemas
            .get_mut(cluster)
            .and_then(|subjects| subjects.remove(subject))
            .map(|_| ())
            .ok_or_else(|| not_found("delete_schema", subject))
    }

    fn get_healthchecks(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<HealthChecks> {
        let state = self.begin(ctx, "get_healthchecks", cluster)?;
        Ok(state.healthchecks.get(cluster).cloned().unwrap_or_default())
    }

    fn replace_healthchecks(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        checks: &HealthChecks,
    ) -> Result<()> {
        let mut state = self.begin(ctx, "replace_healthchecks", cluster)?;
        state.healthchecks.insert(cluster.clone(), checks.clone());
        Ok(())
    }

    fn get_log_collectors(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
    ) -> Result<Vec<LogCollector>> {
        let state = self.begin(ctx, "get_log_collectors", cluster)?;
        Ok(state.log_collectors.get(cluster).cloned().unwrap_or_default())
    }

    fn replace_log_collectors(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        collectors: &[LogCollector],
    ) -> Result<()> {
        let mut state = self.begin(ctx, "replace_log_collectors", cluster)?;
        let mut stored = collectors.to_vec();
        if state.regenerate_uuids {
            for collector in &mut stored {
                state.uuid_counter += 1;
                collector.uuid = format!("server-{}", state.uuid_counter);
            }
        }
        state.log_collectors.insert(cluster.clone(), stored);
        Ok(())
    }

    fn list_backups(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<Backup>> {
        let state = self.begin(ctx, "list_backups", cluster)?;
        Ok(state.backups.get(cluster).cloned().unwrap_or_default())
    }

    fn create_backup(&self, ctx: &CallContext, cluster: &ClusterRef, backup: &Backup) -> Result<()> {
        let mut state = self.begin(ctx, "create_backup", cluster)?;
        state
            .backups
            .entry(cluster.clone())
            .or_default()
            .push(backup.clone());
        Ok(())
    }

    fn delete_backups(&self, ctx: &CallContext, cluster: &ClusterRef, ids: &[String]) -> Result<()> {
        let mut state = self.begin(ctx, "delete_backups", cluster)?;
        if let Some(backups) = state.backups.get_mut(cluster) {
            backups.retain(|backup| !ids.contains(&backup.id));
        }
        Ok(())
    }

    fn get_repair_settings(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
    ) -> Result<Option<RepairSettings>> {
        let state = self.begin(ctx, "get_repair_settings", cluster)?;
        Ok(state.repair.get(cluster).cloned())
    }

    fn put_repair_settings(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        settings: &RepairSettings,
    ) -> Result<()> {
        let mut state = self.begin(ctx, "put_repair_settings", cluster)?;
        state.repair.insert(cluster.clone(), settings.clone());
        Ok(())
    }

    fn list_alert_rules(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<AlertRule>> {
        let state = self.begin(ctx, "list_alert_rules", cluster)?;
        Ok(state.alert_rules.get(cluster).cloned().unwrap_or_default())
    }

    fn put_alert_rule(&self, ctx: &CallContext, cluster: &ClusterRef, rule: &AlertRule) -> Result<()> {
        let mut state = self.begin(ctx, "put_alert_rule", cluster)?;
        let rules = state.alert_rules.entry(cluster.clone()).or_default();
        match rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => *existing = rule.clone(),
            None => rules.push(rule.clone()),
        }
        Ok(())
    }

    fn delete_alert_rule(&self, ctx: &CallContext, cluster: &ClusterRef, id: &str) -> Result<()> {
        let mut state = self.begin(ctx, "delete_alert_rule", cluster)?;
        let rules = state.alert_rules.entry(cluster.clone()).or_default();
        let before = rules.len();
        rules.retain(|rule| rule.id != id);
        if rules.len() == before {
            return Err(not_found("delete_alert_rule", id));
        }
        Ok(())
    }

    fn get_integrations(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Integrations> {
        let state = self.begin(ctx, "get_integrations", cluster)?;
        Ok(state.integrations.get(cluster).cloned().unwrap_or_default())
    }

    fn set_route_override(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        value: bool,
    ) -> Result<()> {
        let mut state = self.begin(ctx, "set_route_override", cluster)?;
        let routing = routing_mut(state.integrations.entry(cluster.clone()).or_default(), route);
        match severity {
            "info" => routing.override_info = value,
            "warning" => routing.override_warning = value,
            "error" => routing.override_error = value,
            other => {
                return Err(Error::remote(
                    "MOCK",
                    "mock://set_route_override",
                    400,
                    format!("unknown severity {other}"),
                ));
            }
        }
        Ok(())
    }

    fn add_route(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        integration_id: &str,
    ) -> Result<()> {
        let mut state = self.begin(ctx, "add_route", cluster)?;
        let integrations = state.integrations.entry(cluster.clone()).or_default();
        if !integrations.definitions.iter().any(|d| d.id == integration_id) {
            return Err(not_found("add_route", integration_id));
        }
        let routing = routing_mut(integrations, route);
        let entry = IntegrationRoute {
            id: integration_id.to_string(),
            severity: severity.to_string(),
        };
        if !routing.routing.contains(&entry) {
            routing.routing.push(entry);
        }
        Ok(())
    }

    fn remove_route(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        integration_id: &str,
    ) -> Result<()> {
        let mut state = self.begin(ctx, "remove_route", cluster)?;
        let routing = routing_mut(state.integrations.entry(cluster.clone()).or_default(), route);
        let before = routing.routing.len();
        routing
            .routing
            .retain(|entry| !(entry.id == integration_id && entry.severity == severity));
        if routing.routing.len() == before {
            return Err(not_found("remove_route", integration_id));
        }
        Ok(())
    }
}

fn routing_mut(integrations: &mut Integrations, route: RouteType) -> &mut IntegrationRouting {
    let position = integrations
        .routings
        .iter()
        .position(|routing| routing.route_type == route.api_name());
    let index = position.unwrap_or_else(|| {
        integrations.routings.push(IntegrationRouting {
            route_type: route.api_name().to_string(),
            ..IntegrationRouting::default()
        });
        integrations.routings.len() - 1
    });
    &mut integrations.routings[index]
}
