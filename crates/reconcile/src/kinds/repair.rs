//! Adaptive repair settings, one per Cassandra cluster.
//!
//! The settings always exist server-side, so delete resets them to the
//! defaults with repair switched off.

use crate::error::{Error, Result};
use crate::import::ImportFormat;
use crate::reconciler::{Applied, KindDescriptor, Observed};
use crate::types::{Identity, Kind};
use gateway::{CallContext, ClusterRef, Gateway, RepairSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairSpec {
    pub active: bool,
    pub gc_grace_threshold: i64,
    pub table_parallelism: i64,
    pub blacklisted_tables: Vec<String>,
    pub filter_twcs_tables: bool,
    pub segment_retries: i64,
    pub segments_per_vnode: i64,
    pub segment_target_size_mb: i64,
}

impl Default for RepairSpec {
    fn default() -> Self {
        Self::from(RepairSettings::default())
    }
}

impl From<RepairSettings> for RepairSpec {
    fn from(settings: RepairSettings) -> Self {
        Self {
            active: settings.active,
            gc_grace_threshold: settings.gc_grace_threshold,
            table_parallelism: settings.table_parallelism,
            blacklisted_tables: settings.blacklisted_tables,
            filter_twcs_tables: settings.filter_twcs_tables,
            segment_retries: settings.segment_retries,
            segments_per_vnode: settings.segments_per_vnode,
            segment_target_size_mb: settings.segment_target_size_mb,
        }
    }
}

impl From<&RepairSpec> for RepairSettings {
    fn from(spec: &RepairSpec) -> Self {
        Self {
            active: spec.active,
            gc_grace_threshold: spec.gc_grace_threshold,
            table_parallelism: spec.table_parallelism,
            blacklisted_tables: spec.blacklisted_tables.clone(),
            filter_twcs_tables: spec.filter_twcs_tables,
            segment_retries: spec.segment_retries,
            segments_per_vnode: spec.segments_per_vnode,
            segment_target_size_mb: spec.segment_target_size_mb,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RepairKind;

impl KindDescriptor for RepairKind {
    type Spec = RepairSpec;
    type Computed = ();
    type Key = ();

    const KIND: Kind = Kind::RepairPolicy;
    const IMPORT: ImportFormat = ImportFormat::new(&["clusterType", "cluster"]);
    const DEFAULT_CLUSTER_TYPE: &'static str = "cassandra";

    fn new_identity(&self, cluster: &ClusterRef, _spec: &RepairSpec) -> Identity {
        Identity::Natural(cluster.to_string())
    }

    fn key(&self, _spec: &RepairSpec, _identity: &Identity) {}

    fn validate(&self, spec: &RepairSpec) -> Result<()> {
        if spec.table_parallelism < 1 {
            return Err(Error::invalid_spec(
                Kind::RepairPolicy,
                "table_parallelism must be at least 1",
            ));
        }
        if spec.gc_grace_threshold < 0 || spec.segment_retries < 0 {
            return Err(Error::invalid_spec(
                Kind::RepairPolicy,
                "gc_grace_threshold and segment_retries must not be negative",
            ));
        }
        Ok(())
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &RepairSpec,
        _identity: &Identity,
    ) -> Result<Applied<()>> {
        gateway.put_repair_settings(ctx, cluster, &RepairSettings::from(spec))?;
        Ok(Applied::new(()))
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        _key: &(),
    ) -> Result<Option<Observed<RepairSpec, ()>>> {
        Ok(gateway
            .get_repair_settings(ctx, cluster)?
            .map(|settings| Observed {
                spec: RepairSpec::from(settings),
                computed: (),
                identity: Some(Identity::Natural(cluster.to_string())),
            }))
    }

    fn update(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        _identity: &Identity,
        _current: &RepairSpec,
        desired: &RepairSpec,
    ) -> Result<Applied<()>> {
        gateway.put_repair_settings(ctx, cluster, &RepairSettings::from(desired))?;
        Ok(Applied::new(()))
    }

    fn delete(&self, gateway: &dyn Gateway, ctx: &CallContext, cluster: &ClusterRef, _key: &()) -> Result<()> {
        let reset = RepairSettings {
            active: false,
            ..RepairSettings::default()
        };
        gateway.put_repair_settings(ctx, cluster, &reset)?;
        Ok(())
    }

    fn parse_key(&self, segments: &[&str]) -> Result<(ClusterRef, ())> {
        Ok((super::typed_cluster(segments), ()))
    }
}
