//! Kafka Connect connectors.
//!
//! Reads go through the per-connect-cluster listing, filtered by name.

use crate::error::{Error, Result};
use crate::identity::{MatchKey, locate};
use crate::import::ImportFormat;
use crate::reconciler::{Applied, KindDescriptor, Observed};
use crate::types::{Identity, Kind};
use gateway::{CallContext, ClusterRef, ConnectorInfo, ConnectorPayload, Gateway};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key Kafka Connect injects into every connector's config.
const INJECTED_NAME_KEY: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorSpec {
    pub connect_cluster: String,
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectorComputed {
    /// `source` or `sink`, as reported by Kafka Connect.
    pub connector_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorKey {
    pub connect_cluster: String,
    pub name: String,
}

fn computed(info: &ConnectorInfo) -> ConnectorComputed {
    ConnectorComputed {
        connector_type: info.connector_type.clone(),
    }
}

fn user_config(info: &ConnectorInfo) -> BTreeMap<String, String> {
    info.config
        .iter()
        .filter(|(key, _)| key.as_str() != INJECTED_NAME_KEY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectorKind;

impl KindDescriptor for ConnectorKind {
    type Spec = ConnectorSpec;
    type Computed = ConnectorComputed;
    type Key = ConnectorKey;

    const KIND: Kind = Kind::Connector;
    const IMPORT: ImportFormat = ImportFormat::new(&["cluster", "connectCluster", "name"]);

    fn new_identity(&self, _cluster: &ClusterRef, spec: &ConnectorSpec) -> Identity {
        Identity::Natural(format!("{}/{}", spec.connect_cluster, spec.name))
    }

    fn key(&self, spec: &ConnectorSpec, _identity: &Identity) -> ConnectorKey {
        ConnectorKey {
            connect_cluster: spec.connect_cluster.clone(),
            name: spec.name.clone(),
        }
    }

    fn validate(&self, spec: &ConnectorSpec) -> Result<()> {
        if spec.name.is_empty() || spec.connect_cluster.is_empty() {
            return Err(Error::invalid_spec(
                Kind::Connector,
                "name and connect_cluster must not be empty",
            ));
        }
        if spec.config.contains_key(INJECTED_NAME_KEY) {
            return Err(Error::invalid_spec(
                Kind::Connector,
                "config must not set 'name'; use the name field",
            ));
        }
        Ok(())
    }

    fn check_immutable(&self, current: &ConnectorSpec, desired: &ConnectorSpec) -> Result<()> {
        if current.name != desired.name {
            return Err(Error::ImmutableField {
                kind: Kind::Connector,
                field: "name",
                from: current.name.clone(),
                to: desired.name.clone(),
            });
        }
        if current.connect_cluster != desired.connect_cluster {
            return Err(Error::ImmutableField {
                kind: Kind::Connector,
                field: "connect_cluster",
                from: current.connect_cluster.clone(),
                to: desired.connect_cluster.clone(),
            });
        }
        Ok(())
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &ConnectorSpec,
        _identity: &Identity,
    ) -> Result<Applied<ConnectorComputed>> {
        let payload = ConnectorPayload {
            name: spec.name.clone(),
            config: spec.config.clone(),
        };
        let info = gateway.create_connector(ctx, cluster, &spec.connect_cluster, &payload)?;
        Ok(Applied::new(computed(&info)))
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        key: &ConnectorKey,
    ) -> Result<Option<Observed<ConnectorSpec, ConnectorComputed>>> {
        let connectors = gateway.list_connectors(ctx, cluster, &key.connect_cluster)?;
        let Some(info) = locate(&connectors, MatchKey::Name(&key.name)) else {
            return Ok(None);
        };
        Ok(Some(Observed {
            spec: ConnectorSpec {
                connect_cluster: key.connect_cluster.clone(),
                name: info.name.clone(),
                config: user_config(info),
            },
            computed: computed(info),
            identity: Some(Identity::Natural(format!(
                "{}/{}",
                key.connect_cluster, info.name
            ))),
        }))
    }

    fn update(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        _identity: &Identity,
        current: &ConnectorSpec,
        desired: &ConnectorSpec,
    ) -> Result<Applied<ConnectorComputed>> {
        let info = gateway.update_connector_config(
            ctx,
            cluster,
            &current.connect_cluster,
            &current.name,
            &desired.config,
        )?;
        Ok(Applied::new(computed(&info)))
    }

    fn delete(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        key: &ConnectorKey,
    ) -> Result<()> {
        gateway.delete_connector(ctx, cluster, &key.connect_cluster, &key.name)?;
        Ok(())
    }

    fn parse_key(&self, segments: &[&str]) -> Result<(ClusterRef, ConnectorKey)> {
        Ok((
            ClusterRef::new(Self::DEFAULT_CLUSTER_TYPE, segments[0]),
            ConnectorKey {
                connect_cluster: segments[1].to_string(),
                name: segments[2].to_string(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::Reconciler;
    use crate::types::{LifecycleState, ReadOutcome};
    use gateway::MockGateway;
    use std::sync::Arc;

    fn sink() -> ConnectorSpec {
        ConnectorSpec {
            connect_cluster: "connect-1".to_string(),
            name: "s3-sink".to_string(),
            config: BTreeMap::from([
                ("connector.class".to_string(), "io.confluent.connect.s3.S3SinkConnector".to_string()),
                ("tasks.max".to_string(), "2".to_string()),
            ]),
        }
    }

    fn setup() -> (MockGateway, Reconciler<ConnectorKind>, CallContext, ClusterRef) {
        let mock = MockGateway::new();
        let reconciler = Reconciler::new(Arc::new(mock.clone()), ConnectorKind);
        (mock, reconciler, CallContext::background(), ClusterRef::kafka("prod"))
    }

    #[test]
    fn test_create_populates_connector_type() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler.create(&ctx, &reconciler.plan(cluster, sink())).unwrap();
        assert_eq!(created.computed.connector_type, "sink");
    }

    #[test]
    fn test_read_drops_injected_name() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler.create(&ctx, &reconciler.plan(cluster, sink())).unwrap();

        let ReadOutcome::Present(read) = reconciler.read(&ctx, &created).unwrap() else {
            panic!("connector should exist");
        };
        assert_eq!(read.state, LifecycleState::Present);
        assert!(!read.spec.config.contains_key("name"));
        assert_eq!(read.spec, sink());
    }

    #[test]
    fn test_rename_rejected() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler.create(&ctx, &reconciler.plan(cluster, sink())).unwrap();
        mock.clear_calls();

        let renamed = ConnectorSpec {
            name: "s3-sink-v2".to_string(),
            ..sink()
        };
        let err = reconciler.update(&ctx, &created, &renamed).unwrap_err();
        assert!(matches!(err.root(), Error::ImmutableField { field: "name", .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_update_config() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler.create(&ctx, &reconciler.plan(cluster, sink())).unwrap();

        let mut desired = sink();
        desired.config.insert("tasks.max".to_string(), "4".to_string());
        let updated = reconciler.update(&ctx, &created, &desired).unwrap();
        assert_eq!(updated.computed.connector_type, "sink");

        let ReadOutcome::Present(read) = reconciler.read(&ctx, &updated).unwrap() else {
            panic!("connector should exist");
        };
        assert_eq!(read.spec.config.get("tasks.max").map(String::as_str), Some("4"));
    }

    #[test]
    fn test_import_and_delete() {
        let (_, reconciler, ctx, cluster) = setup();
        reconciler.create(&ctx, &reconciler.plan(cluster, sink())).unwrap();

        let imported = reconciler.import(&ctx, "prod/connect-1/s3-sink").unwrap();
        assert_eq!(imported.spec, sink());

        reconciler.delete(&ctx, &imported).unwrap();
        reconciler.delete(&ctx, &imported).unwrap();
        assert!(reconciler.lookup(&ctx, "prod/connect-1/s3-sink").unwrap().is_none());
    }

    #[test]
    fn test_unknown_connect_cluster_reads_absent() {
        let (_, reconciler, ctx, _) = setup();
        assert!(reconciler.lookup(&ctx, "prod/nowhere/s3-sink").unwrap().is_none());
    }
}
