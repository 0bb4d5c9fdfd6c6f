//! Cassandra scheduled backups.
//!
//! Backups have no update endpoint: a changed backup is deleted by id and
//! recreated under a fresh uuid. The tag is the stable handle; the id is
//! whatever the server lists under that tag right now. The listing
//! double-encodes each backup, see the gateway's backup decoding.

use crate::error::{Error, Result};
use crate::identity::{MatchKey, locate};
use crate::import::ImportFormat;
use crate::reconciler::{Applied, KindDescriptor, Observed, UpdateStrategy};
use crate::types::{Identity, Kind};
use gateway::{Backup, CallContext, ClusterRef, Gateway};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSpec {
    pub tag: String,
    #[serde(default = "super::default_true")]
    pub schedule: bool,
    #[serde(default = "default_schedule_expr")]
    pub schedule_expr: String,
    #[serde(default = "default_local_retention")]
    pub local_retention: String,
    #[serde(default)]
    pub datacenters: Vec<String>,
    /// Empty means every node.
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub keyspaces: Vec<String>,
    /// Empty means every table.
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub remote_type: String,
    #[serde(default)]
    pub remote_path: String,
    #[serde(default)]
    pub remote_config: String,
    #[serde(default = "default_remote_retention")]
    pub remote_retention: String,
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(default = "default_transfers")]
    pub transfers: u32,
    #[serde(default = "default_tps_limit")]
    pub tps_limit: u32,
    #[serde(default)]
    pub bw_limit: String,
}

fn default_schedule_expr() -> String {
    "0 1 * * *".to_string()
}

fn default_local_retention() -> String {
    "10d".to_string()
}

fn default_remote_retention() -> String {
    "60d".to_string()
}

fn default_timeout() -> String {
    "10h".to_string()
}

fn default_transfers() -> u32 {
    1
}

fn default_tps_limit() -> u32 {
    50
}

impl BackupSpec {
    fn to_backup(&self, id: &str) -> Backup {
        let mut backup = Backup {
            id: id.to_string(),
            tag: self.tag.clone(),
            local_retention_duration: self.local_retention.clone(),
            remote: self.remote,
            datacenters: self.datacenters.clone(),
            nodes: self.nodes.clone(),
            tables: self.tables.clone(),
            keyspaces: self.keyspaces.clone(),
            all_tables: self.tables.is_empty(),
            all_nodes: self.nodes.is_empty(),
            schedule: self.schedule,
            schedule_expr: self.schedule_expr.clone(),
            ..Backup::default()
        };
        if self.remote {
            backup.remote_type.clone_from(&self.remote_type);
            backup.remote_path.clone_from(&self.remote_path);
            backup.remote_config.clone_from(&self.remote_config);
            backup.remote_retention_duration.clone_from(&self.remote_retention);
            backup.timeout.clone_from(&self.timeout);
            backup.transfers = self.transfers;
            backup.tps_limit = self.tps_limit;
            backup.bw_limit.clone_from(&self.bw_limit);
        }
        backup
    }

    fn from_backup(backup: &Backup) -> Self {
        let or_default = |value: &str, default: fn() -> String| {
            if value.is_empty() {
                default()
            } else {
                value.to_string()
            }
        };
        Self {
            tag: backup.tag.clone(),
            schedule: backup.schedule,
            schedule_expr: backup.schedule_expr.clone(),
            local_retention: or_default(&backup.local_retention_duration, default_local_retention),
            datacenters: backup.datacenters.clone(),
            nodes: if backup.all_nodes { Vec::new() } else { backup.nodes.clone() },
            keyspaces: backup.keyspaces.clone(),
            tables: if backup.all_tables { Vec::new() } else { backup.tables.clone() },
            remote: backup.remote,
            remote_type: backup.remote_type.clone(),
            remote_path: backup.remote_path.clone(),
            remote_config: backup.remote_config.clone(),
            remote_retention: or_default(&backup.remote_retention_duration, default_remote_retention),
            timeout: or_default(&backup.timeout, default_timeout),
            transfers: if backup.transfers == 0 { default_transfers() } else { backup.transfers },
            tps_limit: if backup.tps_limit == 0 { default_tps_limit() } else { backup.tps_limit },
            bw_limit: backup.bw_limit.clone(),
        }
    }
}

/// Backups are found by tag; the id is known once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupKey {
    pub tag: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BackupKind;

impl KindDescriptor for BackupKind {
    type Spec = BackupSpec;
    type Computed = ();
    type Key = BackupKey;

    const KIND: Kind = Kind::Backup;
    const IMPORT: ImportFormat = ImportFormat::new(&["clusterType", "cluster", "tag"]);
    const UPDATE: UpdateStrategy = UpdateStrategy::Recreate;
    const DEFAULT_CLUSTER_TYPE: &'static str = "cassandra";
    const ADOPT_REMOTE_IDENTITY: bool = true;

    fn new_identity(&self, _cluster: &ClusterRef, _spec: &BackupSpec) -> Identity {
        Identity::generate()
    }

    fn key(&self, spec: &BackupSpec, identity: &Identity) -> BackupKey {
        BackupKey {
            tag: spec.tag.clone(),
            id: Some(identity.value().to_string()),
        }
    }

    fn validate(&self, spec: &BackupSpec) -> Result<()> {
        if spec.tag.is_empty() {
            return Err(Error::invalid_spec(Kind::Backup, "tag must not be empty"));
        }
        if spec.remote && spec.remote_type.is_empty() {
            return Err(Error::invalid_spec(
                Kind::Backup,
                "remote_type is required when remote is enabled",
            ));
        }
        Ok(())
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &BackupSpec,
        identity: &Identity,
    ) -> Result<Applied<()>> {
        gateway.create_backup(ctx, cluster, &spec.to_backup(identity.value()))?;
        Ok(Applied::new(()))
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        key: &BackupKey,
    ) -> Result<Option<Observed<BackupSpec, ()>>> {
        let backups = gateway.list_backups(ctx, cluster)?;
        Ok(locate(&backups, MatchKey::Name(&key.tag)).map(|backup| Observed {
            spec: BackupSpec::from_backup(backup),
            computed: (),
            identity: (!backup.id.is_empty()).then(|| Identity::Generated(backup.id.clone())),
        }))
    }

    fn delete(&self, gateway: &dyn Gateway, ctx: &CallContext, cluster: &ClusterRef, key: &BackupKey) -> Result<()> {
        // A stored id goes stale when the tag is recreated elsewhere, so
        // always delete whatever currently carries the tag.
        let backups = gateway.list_backups(ctx, cluster)?;
        let Some(backup) = locate(&backups, MatchKey::Name(&key.tag)) else {
            return Ok(());
        };
        if key.id.as_deref().is_some_and(|id| id != backup.id) {
            log::warn!(
                "backup {} on {cluster} now has id {}; deleting that instead of the stored id",
                key.tag,
                backup.id
            );
        }
        gateway.delete_backups(ctx, cluster, &[backup.id.clone()])?;
        Ok(())
    }

    fn parse_key(&self, segments: &[&str]) -> Result<(ClusterRef, BackupKey)> {
        Ok((
            super::typed_cluster(segments),
            BackupKey {
                tag: segments[2].to_string(),
                id: None,
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

    fn nightly() -> BackupSpec {
        serde_json::from_value(serde_json::json!({ "tag": "nightly" })).unwrap()
    }

    fn setup() -> (MockGateway, Reconciler<BackupKind>, CallContext, ClusterRef) {
        let mock = MockGateway::new();
        let reconciler = Reconciler::new(Arc::new(mock.clone()), BackupKind);
        (mock, reconciler, CallContext::background(), ClusterRef::cassandra("c1"))
    }

    #[test]
    fn test_payload_derives_all_flags_and_hides_remote() {
        let backup = nightly().to_backup("b-1");
        assert!(backup.all_tables);
        assert!(backup.all_nodes);
        assert!(backup.schedule);
        assert_eq!(backup.schedule_expr, "0 1 * * *");
        assert_eq!(backup.local_retention_duration, "10d");

        let json = serde_json::to_value(&backup).unwrap();
        assert!(json.get("remoteType").is_none());
        assert!(json.get("RemoteRetentionDuration").is_none());
        assert!(json.get("transfers").is_none());
    }

    #[test]
    fn test_remote_fields_sent_when_enabled() {
        let spec = BackupSpec {
            remote: true,
            remote_type: "s3".to_string(),
            remote_path: "bucket/backups".to_string(),
            tables: vec!["ks.events".to_string()],
            ..nightly()
        };
        let backup = spec.to_backup("b-1");
        assert!(!backup.all_tables);
        assert_eq!(backup.remote_type, "s3");
        assert_eq!(backup.remote_retention_duration, "60d");
        assert_eq!(backup.timeout, "10h");
        assert_eq!(backup.transfers, 1);
        assert_eq!(backup.tps_limit, 50);
    }

    #[test]
    fn test_create_read_round_trip() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler.create(&ctx, &reconciler.plan(cluster, nightly())).unwrap();
        let ReadOutcome::Present(read) = reconciler.read(&ctx, &created).unwrap() else {
            panic!("backup should exist");
        };
        assert_eq!(read.state, LifecycleState::Present);
        assert_eq!(read.identity, created.identity);
    }

    #[test]
    fn test_update_replaces_with_new_id() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), nightly()))
            .unwrap();
        mock.clear_calls();

        let desired = BackupSpec {
            schedule_expr: "0 3 * * *".to_string(),
            ..nightly()
        };
        let updated = reconciler.update(&ctx, &created, &desired).unwrap();
        assert_ne!(updated.identity, created.identity);
        assert_eq!(
            mock.calls(),
            vec![
                "list_backups cassandra/c1".to_string(),
                "delete_backups cassandra/c1".to_string(),
                "create_backup cassandra/c1".to_string(),
            ]
        );

        let backups = mock.list_backups(&ctx, &cluster).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].schedule_expr, "0 3 * * *");
    }

    #[test]
    fn test_import_by_tag() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler.create(&ctx, &reconciler.plan(cluster, nightly())).unwrap();

        let imported = reconciler.import(&ctx, "cassandra/c1/nightly").unwrap();
        assert_eq!(imported.identity, created.identity);
        assert_eq!(imported.spec, nightly());

        reconciler.delete(&ctx, &imported).unwrap();
        assert!(reconciler.lookup(&ctx, "cassandra/c1/nightly").unwrap().is_none());
    }

    #[test]
    fn test_backup_recreated_elsewhere_is_read_and_deleted_by_tag() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), nightly()))
            .unwrap();
        let stale = created.identity.clone().unwrap();

        // Someone replaces the backup in the console; the tag survives, the id does not.
        mock.delete_backups(&ctx, &cluster, &[stale.value().to_string()]).unwrap();
        mock.create_backup(&ctx, &cluster, &nightly().to_backup("server-b")).unwrap();

        let ReadOutcome::Present(read) = reconciler.read(&ctx, &created).unwrap() else {
            panic!("backup should exist");
        };
        assert_eq!(read.identity, Some(Identity::Generated("server-b".to_string())));

        // Even the stale record deletes the live backup.
        reconciler.delete(&ctx, &created).unwrap();
        assert!(mock.list_backups(&ctx, &cluster).unwrap().is_empty());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), nightly()))
            .unwrap();
        reconciler.delete(&ctx, &created).unwrap();
        assert!(mock.list_backups(&ctx, &cluster).unwrap().is_empty());

        mock.clear_calls();
        reconciler.delete(&ctx, &created).unwrap();
        assert_eq!(mock.calls(), vec!["list_backups cassandra/c1".to_string()]);
    }
}
