//! Kafka topics.
//!
//! Config keys are written with underscores (`cleanup_policy`) and sent with
//! dots (`cleanup.policy`). Partition count and replication factor are fixed
//! at creation.

use crate::error::{Error, Result};
use crate::import::ImportFormat;
use crate::reconciler::{Applied, KindDescriptor, Observed};
use crate::types::{Identity, Kind};
use gateway::{CallContext, ClusterRef, ConfigEntry, Gateway, TopicConfigUpdate, TopicPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i32,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

fn to_remote_key(key: &str) -> String {
    key.replace('_', ".")
}

fn to_local_key(key: &str) -> String {
    key.replace('.', "_")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TopicKind;

impl KindDescriptor for TopicKind {
    type Spec = TopicSpec;
    type Computed = ();
    type Key = String;

    const KIND: Kind = Kind::Topic;
    const IMPORT: ImportFormat = ImportFormat::new(&["cluster", "topic"]);

    fn new_identity(&self, _cluster: &ClusterRef, spec: &TopicSpec) -> Identity {
        Identity::Natural(spec.name.clone())
    }

    fn key(&self, spec: &TopicSpec, _identity: &Identity) -> String {
        spec.name.clone()
    }

    fn validate(&self, spec: &TopicSpec) -> Result<()> {
        if spec.name.is_empty() {
            return Err(Error::invalid_spec(Kind::Topic, "name must not be empty"));
        }
        if spec.partitions < 1 {
            return Err(Error::invalid_spec(Kind::Topic, "partitions must be at least 1"));
        }
        if spec.replication_factor < 1 {
            return Err(Error::invalid_spec(
                Kind::Topic,
                "replication_factor must be at least 1",
            ));
        }
        Ok(())
    }

    fn check_immutable(&self, current: &TopicSpec, desired: &TopicSpec) -> Result<()> {
        let immutable = |field: &'static str, from: String, to: String| {
            if from == to {
                Ok(())
            } else {
                Err(Error::ImmutableField {
                    kind: Kind::Topic,
                    field,
                    from,
                    to,
                })
            }
        };
        immutable("name", current.name.clone(), desired.name.clone())?;
        immutable(
            "partitions",
            current.partitions.to_string(),
            desired.partitions.to_string(),
        )?;
        immutable(
            "replication_factor",
            current.replication_factor.to_string(),
            desired.replication_factor.to_string(),
        )
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &TopicSpec,
        _identity: &Identity,
    ) -> Result<Applied<()>> {
        let payload = TopicPayload {
            topic_name: spec.name.clone(),
            partition_count: spec.partitions,
            replication_factor: spec.replication_factor,
            configs: spec
                .config
                .iter()
                .map(|(key, value)| ConfigEntry {
                    name: to_remote_key(key),
                    value: value.clone(),
                })
                .collect(),
        };
        gateway.create_topic(ctx, cluster, &payload)?;
        Ok(Applied::new(()))
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &String,
    ) -> Result<Option<Observed<TopicSpec, ()>>> {
        let Some(info) = gateway.get_topic(ctx, cluster, name)? else {
            return Ok(None);
        };
        let config = gateway
            .get_topic_configs(ctx, cluster, name)?
            .unwrap_or_default()
            .into_iter()
            .map(|entry| (to_local_key(&entry.name), entry.value))
            .collect();

        Ok(Some(Observed {
            spec: TopicSpec {
                name: info.name.clone(),
                partitions: info.partition_count,
                replication_factor: info.replication_factor,
                config,
            },
            computed: (),
            identity: Some(Identity::Natural(info.name)),
        }))
    }

    fn update(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        _identity: &Identity,
        current: &TopicSpec,
        desired: &TopicSpec,
    ) -> Result<Applied<()>> {
        // Removed keys are not reset; only desired values are sent.
        let updates: Vec<TopicConfigUpdate> = desired
            .config
            .iter()
            .map(|(key, value)| TopicConfigUpdate::set(to_remote_key(key), value.clone()))
            .collect();
        if !updates.is_empty() {
            gateway.update_topic_configs(ctx, cluster, &current.name, &updates)?;
        }
        Ok(Applied::new(()))
    }

    fn delete(&self, gateway: &dyn Gateway, ctx: &CallContext, cluster: &ClusterRef, name: &String) -> Result<()> {
        gateway.delete_topic(ctx, cluster, name)?;
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
            .list_topics(ctx, cluster)?
            .into_iter()
            .map(|topic| format!("{}/{}", cluster.name, topic.name))
            .collect();
        Ok(Some(ids))
    }
}
