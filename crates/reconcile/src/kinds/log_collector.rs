//! Log collectors.
//!
//! One array per cluster, replaced wholesale. The server regenerates every
//! collector's uuid on replace, so collectors are matched by name and a read
//! adopts whatever uuid the server reports.

use crate::error::{Error, Result};
use crate::identity::{Identified, MatchKey, locate};
use crate::import::ImportFormat;
use crate::merge::{merge_delete, merge_insert, merge_replace};
use crate::reconciler::{Applied, KindDescriptor, Observed};
use crate::types::{Identity, Kind};
use gateway::{CallContext, ClusterRef, Gateway, LogCollector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCollectorSpec {
    pub name: String,
    pub filename: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub info_regex: String,
    #[serde(default)]
    pub warning_regex: String,
    #[serde(default)]
    pub error_regex: String,
    #[serde(default = "super::default_agents")]
    pub supported_agent_type: Vec<String>,
    #[serde(default)]
    pub error_alert_threshold: i64,
}

fn default_date_format() -> String {
    "yyyy-MM-dd HH:mm:ss,SSS".to_string()
}

impl LogCollectorSpec {
    fn to_collector(&self, uuid: &str) -> LogCollector {
        LogCollector {
            name: self.name.clone(),
            uuid: uuid.to_string(),
            filename: self.filename.clone(),
            date_format: self.date_format.clone(),
            info_regex: self.info_regex.clone(),
            warning_regex: self.warning_regex.clone(),
            error_regex: self.error_regex.clone(),
            supported_agent_type: self.supported_agent_type.clone(),
            error_alert_threshold: self.error_alert_threshold,
        }
    }

    fn from_collector(collector: &LogCollector) -> Self {
        Self {
            name: collector.name.clone(),
            filename: collector.filename.clone(),
            date_format: collector.date_format.clone(),
            info_regex: collector.info_regex.clone(),
            warning_regex: collector.warning_regex.clone(),
            error_regex: collector.error_regex.clone(),
            supported_agent_type: collector.supported_agent_type.clone(),
            error_alert_threshold: collector.error_alert_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogCollectorKind;

impl KindDescriptor for LogCollectorKind {
    type Spec = LogCollectorSpec;
    type Computed = ();
    type Key = String;

    const KIND: Kind = Kind::LogCollector;
    const IMPORT: ImportFormat = ImportFormat::new(&["cluster", "name"]);
    const ADOPT_REMOTE_IDENTITY: bool = true;

    fn new_identity(&self, _cluster: &ClusterRef, _spec: &LogCollectorSpec) -> Identity {
        Identity::generate()
    }

    fn key(&self, spec: &LogCollectorSpec, _identity: &Identity) -> String {
        spec.name.clone()
    }

    fn validate(&self, spec: &LogCollectorSpec) -> Result<()> {
        if spec.name.is_empty() || spec.filename.is_empty() {
            return Err(Error::invalid_spec(
                Kind::LogCollector,
                "name and filename must not be empty",
            ));
        }
        Ok(())
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &LogCollectorSpec,
        identity: &Identity,
    ) -> Result<Applied<()>> {
        let collectors = gateway.get_log_collectors(ctx, cluster)?;
        let merged = merge_insert(collectors, spec.to_collector(identity.value()))?;
        gateway.replace_log_collectors(ctx, cluster, &merged)?;
        Ok(Applied::new(()))
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &String,
    ) -> Result<Option<Observed<LogCollectorSpec, ()>>> {
        let collectors = gateway.get_log_collectors(ctx, cluster)?;
        Ok(locate(&collectors, MatchKey::Name(name)).map(|collector| Observed {
            spec: LogCollectorSpec::from_collector(collector),
            computed: (),
            identity: (!collector.uuid.is_empty())
                .then(|| Identity::Server(collector.uuid.clone())),
        }))
    }

    fn update(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        _identity: &Identity,
        current: &LogCollectorSpec,
        desired: &LogCollectorSpec,
    ) -> Result<Applied<()>> {
        let collectors = gateway.get_log_collectors(ctx, cluster)?;
        let uuid = locate(&collectors, MatchKey::Name(&current.name))
            .map(|existing| existing.id_key().to_string())
            .ok_or_else(|| Error::NotFound {
                kind: Kind::LogCollector,
                cluster: cluster.clone(),
                key: current.name.clone(),
            })?;

        let merged = merge_replace(
            collectors,
            MatchKey::Name(&current.name),
            desired.to_collector(&uuid),
        )?;
        gateway.replace_log_collectors(ctx, cluster, &merged)?;
        Ok(Applied {
            computed: (),
            identity: Some(Identity::Server(uuid)),
        })
    }

    fn delete(&self, gateway: &dyn Gateway, ctx: &CallContext, cluster: &ClusterRef, name: &String) -> Result<()> {
        let collectors = gateway.get_log_collectors(ctx, cluster)?;
        if locate(&collectors, MatchKey::Name(name)).is_none() {
            log::debug!("log collector {name} not in collection on {cluster}");
            return Ok(());
        }
        let merged = merge_delete(collectors, MatchKey::Name(name));
        gateway.replace_log_collectors(ctx, cluster, &merged)?;
        Ok(())
    }

    fn parse_key(&self, segments: &[&str]) -> Result<(ClusterRef, String)> {
        Ok((
            ClusterRef::new(Self::DEFAULT_CLUSTER_TYPE, segments[0]),
            segments[1].to_string(),
        ))
    }

    fn discover(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
    ) -> Result<Option<Vec<String>>> {
        let ids = gateway
            .get_log_collectors(ctx, cluster)?
            .iter()
            .map(|collector| format!("{}/{}", cluster.name, collector.name))
            .collect();
        Ok(Some(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::Reconciler;
    use crate::types::{LifecycleState, ReadOutcome};
    use gateway::MockGateway;
    use std::sync::Arc;

    fn broker_log() -> LogCollectorSpec {
        serde_json::from_value(serde_json::json!({
            "name": "broker",
            "filename": "/var/log/kafka/server.log"
        }))
        .unwrap()
    }

    fn setup() -> (MockGateway, Reconciler<LogCollectorKind>, CallContext, ClusterRef) {
        let mock = MockGateway::new();
        let reconciler = Reconciler::new(Arc::new(mock.clone()), LogCollectorKind);
        (mock, reconciler, CallContext::background(), ClusterRef::kafka("prod"))
    }

    #[test]
    fn test_defaults() {
        let spec = broker_log();
        assert_eq!(spec.date_format, "yyyy-MM-dd HH:mm:ss,SSS");
        assert_eq!(spec.supported_agent_type, vec!["all".to_string()]);
        assert_eq!(spec.error_alert_threshold, 0);
        assert!(spec.info_regex.is_empty());
    }

    #[test]
    fn test_read_adopts_regenerated_uuid() {
        let (mock, reconciler, ctx, cluster) = setup();
        mock.regenerate_log_collector_uuids(true);

        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster, broker_log()))
            .unwrap();
        assert!(matches!(created.identity, Some(Identity::Generated(_))));

        let ReadOutcome::Present(read) = reconciler.read(&ctx, &created).unwrap() else {
            panic!("collector should exist");
        };
        assert_eq!(read.identity, Some(Identity::Server("server-1".to_string())));
        assert_eq!(read.state, LifecycleState::Present);
    }

    #[test]
    fn test_update_keeps_current_uuid() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), broker_log()))
            .unwrap();
        let uuid = mock.log_collectors(&cluster)[0].uuid.clone();

        let mut desired = broker_log();
        desired.error_regex = "ERROR".to_string();
        let updated = reconciler.update(&ctx, &created, &desired).unwrap();

        let stored = mock.log_collectors(&cluster);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].uuid, uuid);
        assert_eq!(stored[0].error_regex, "ERROR");
        assert_eq!(updated.identity, Some(Identity::Server(uuid)));
    }

    #[test]
    fn test_delete_only_removes_own_element() {
        let (mock, reconciler, ctx, cluster) = setup();
        let broker = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), broker_log()))
            .unwrap();
        let gc = LogCollectorSpec {
            name: "gc".to_string(),
            filename: "/var/log/kafka/gc.log".to_string(),
            ..broker_log()
        };
        reconciler.create(&ctx, &reconciler.plan(cluster.clone(), gc)).unwrap();

        reconciler.delete(&ctx, &broker).unwrap();
        let names: Vec<String> = mock.log_collectors(&cluster).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["gc".to_string()]);

        reconciler.delete(&ctx, &broker).unwrap();
    }

    #[test]
    fn test_import_missing_is_not_found() {
        let (_, reconciler, ctx, _) = setup();
        let err = reconciler.import(&ctx, "prod/broker").unwrap_err();
        assert!(err.is_not_found());
    }
}
