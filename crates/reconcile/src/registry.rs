//! Type-erased access to every kind's reconciler.
//!
//! Hosts that keep records as JSON (state files, plugin protocols) go
//! through [`Registry`] instead of naming each descriptor type. Specs and
//! computed values cross this boundary as `serde_json::Value`.

use crate::error::{Error, Result};
use crate::kinds::{
    AclKind, AlertRouteKind, AlertRuleKind, BackupKind, ConnectorKind, HttpCheckKind,
    LogCollectorKind, RepairKind, SchemaKind, ShellCheckKind, TcpCheckKind, TopicKind,
};
use crate::reconciler::{KindDescriptor, Reconciler};
use crate::types::{Kind, ManagedResource, ReadOutcome};
use gateway::{CallContext, ClusterRef, Gateway};
use rayon::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A managed record with its spec and computed values as JSON.
pub type ErasedRecord = ManagedResource<Value, Value>;

/// Object-safe face of [`Reconciler`].
pub trait DynReconciler: Send + Sync {
    fn kind(&self) -> Kind;

    /// Import id shape, e.g. `cluster/name`.
    fn import_format(&self) -> String;

    fn default_cluster_type(&self) -> &'static str;

    /// Validate `spec` against the kind's schema and wrap it as a planned
    /// record. Defaults are filled in.
    fn plan(&self, cluster: ClusterRef, spec: Value) -> Result<ErasedRecord>;

    fn create(&self, ctx: &CallContext, record: &ErasedRecord) -> Result<ErasedRecord>;

    fn read(&self, ctx: &CallContext, record: &ErasedRecord) -> Result<ReadOutcome<Value, Value>>;

    fn update(&self, ctx: &CallContext, current: &ErasedRecord, desired: &Value) -> Result<ErasedRecord>;

    fn delete(&self, ctx: &CallContext, record: &ErasedRecord) -> Result<()>;

    fn import(&self, ctx: &CallContext, raw: &str) -> Result<ErasedRecord>;

    fn lookup(&self, ctx: &CallContext, raw: &str) -> Result<Option<ErasedRecord>>;

    fn discover(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<String>>;
}

fn decode<K: KindDescriptor, T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| Error::invalid_spec(K::KIND, e.to_string()))
}

fn encode<K: KindDescriptor, T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::invalid_spec(K::KIND, e.to_string()))
}

fn decode_record<K: KindDescriptor>(
    record: &ErasedRecord,
) -> Result<ManagedResource<K::Spec, K::Computed>> {
    Ok(ManagedResource {
        kind: record.kind,
        cluster: record.cluster.clone(),
        identity: record.identity.clone(),
        spec: decode::<K, _>(&record.spec)?,
        computed: decode::<K, _>(&record.computed)?,
        state: record.state,
    })
}

fn encode_record<K: KindDescriptor>(
    record: ManagedResource<K::Spec, K::Computed>,
) -> Result<ErasedRecord> {
    Ok(ManagedResource {
        kind: record.kind,
        spec: encode::<K, _>(&record.spec)?,
        computed: encode::<K, _>(&record.computed)?,
        cluster: record.cluster,
        identity: record.identity,
        state: record.state,
    })
}

impl<K: KindDescriptor + 'static> DynReconciler for Reconciler<K> {
    fn kind(&self) -> Kind {
        K::KIND
    }

    fn import_format(&self) -> String {
        K::IMPORT.describe()
    }

    fn default_cluster_type(&self) -> &'static str {
        K::DEFAULT_CLUSTER_TYPE
    }

    fn plan(&self, cluster: ClusterRef, spec: Value) -> Result<ErasedRecord> {
        let spec: K::Spec = decode::<K, _>(&spec)?;
        self.descriptor().validate(&spec)?;
        encode_record::<K>(Reconciler::plan(self, cluster, spec))
    }

    fn create(&self, ctx: &CallContext, record: &ErasedRecord) -> Result<ErasedRecord> {
        let created = Reconciler::create(self, ctx, &decode_record::<K>(record)?)?;
        encode_record::<K>(created)
    }

    fn read(&self, ctx: &CallContext, record: &ErasedRecord) -> Result<ReadOutcome<Value, Value>> {
        match Reconciler::read(self, ctx, &decode_record::<K>(record)?)? {
            ReadOutcome::Present(observed) => Ok(ReadOutcome::Present(encode_record::<K>(observed)?)),
            ReadOutcome::Gone => Ok(ReadOutcome::Gone),
        }
    }

    fn update(&self, ctx: &CallContext, current: &ErasedRecord, desired: &Value) -> Result<ErasedRecord> {
        let desired: K::Spec = decode::<K, _>(desired)?;
        let updated = Reconciler::update(self, ctx, &decode_record::<K>(current)?, &desired)?;
        encode_record::<K>(updated)
    }

    fn delete(&self, ctx: &CallContext, record: &ErasedRecord) -> Result<()> {
        Reconciler::delete(self, ctx, &decode_record::<K>(record)?)
    }

    fn import(&self, ctx: &CallContext, raw: &str) -> Result<ErasedRecord> {
        encode_record::<K>(Reconciler::import(self, ctx, raw)?)
    }

    fn lookup(&self, ctx: &CallContext, raw: &str) -> Result<Option<ErasedRecord>> {
        Reconciler::lookup(self, ctx, raw)?
            .map(encode_record::<K>)
            .transpose()
    }

    fn discover(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<String>> {
        Reconciler::discover(self, ctx, cluster)
    }
}

/// One reconciler per kind, sharing a gateway.
pub struct Registry {
    reconcilers: BTreeMap<Kind, Box<dyn DynReconciler>>,
}

impl Registry {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let reconcilers: Vec<Box<dyn DynReconciler>> = vec![
            Box::new(Reconciler::new(Arc::clone(&gateway), TopicKind)),
            Box::new(Reconciler::new(Arc::clone(&gateway), AclKind)),
            Box::new(Reconciler::new(Arc::clone(&gateway), ConnectorKind)),
            Box::new(Reconciler::new(Arc::clone(&gateway), SchemaKind)),
            Box::new(Reconciler::new(Arc::clone(&gateway), TcpCheckKind::new())),
            Box::new(Reconciler::new(Arc::clone(&gateway), HttpCheckKind::new())),
            Box::new(Reconciler::new(Arc::clone(&gateway), ShellCheckKind::new())),
            Box::new(Reconciler::new(Arc::clone(&gateway), LogCollectorKind)),
            Box::new(Reconciler::new(Arc::clone(&gateway), BackupKind)),
            Box::new(Reconciler::new(Arc::clone(&gateway), RepairKind)),
            Box::new(Reconciler::new(Arc::clone(&gateway), AlertRuleKind)),
            Box::new(Reconciler::new(gateway, AlertRouteKind)),
        ];
        Self {
            reconcilers: reconcilers.into_iter().map(|r| (r.kind(), r)).collect(),
        }
    }

    pub fn get(&self, kind: Kind) -> Result<&dyn DynReconciler> {
        self.reconcilers
            .get(&kind)
            .map(AsRef::as_ref)
            .ok_or_else(|| Error::config(format!("no reconciler registered for {kind}")))
    }

    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        self.reconcilers.keys().copied()
    }

    /// Read many records on a pool of `jobs` threads.
    ///
    /// Results come back in input order. With `fail_fast`, the first error
    /// cancels the context so reads that have not started yet fail with a
    /// cancellation instead of calling the server.
    pub fn read_many(
        &self,
        ctx: &CallContext,
        records: &[ErasedRecord],
        jobs: usize,
        fail_fast: bool,
    ) -> Result<Vec<Result<ReadOutcome<Value, Value>>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| Error::config(format!("failed to create read thread pool: {e}")))?;

        Ok(pool.install(|| {
            records
                .par_iter()
                .map(|record| {
                    let outcome = self.get(record.kind).and_then(|r| r.read(ctx, record));
                    if fail_fast && outcome.is_err() {
                        ctx.cancel_token().cancel();
                    }
                    outcome
                })
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LifecycleState;
    use gateway::MockGateway;
    use serde_json::json;

    fn setup() -> (MockGateway, Registry, CallContext) {
        let mock = MockGateway::new();
        let registry = Registry::new(Arc::new(mock.clone()));
        (mock, registry, CallContext::background())
    }

    #[test]
    fn test_every_kind_registered() {
        let (_, registry, _) = setup();
        let kinds: Vec<Kind> = registry.kinds().collect();
        assert_eq!(kinds.len(), Kind::ALL.len());
        for kind in Kind::ALL {
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
        }
        assert_eq!(registry.get(Kind::Backup).unwrap().default_cluster_type(), "cassandra");
        assert_eq!(registry.get(Kind::Topic).unwrap().import_format(), "cluster/topic");
    }

    #[test]
    fn test_plan_fills_defaults() {
        let (_, registry, _) = setup();
        let record = registry
            .get(Kind::HttpCheck)
            .unwrap()
            .plan(ClusterRef::kafka("prod"), json!({ "name": "ui", "url": "http://ui" }))
            .unwrap();
        assert_eq!(record.state, LifecycleState::Planned);
        assert_eq!(record.spec["method"], "GET");
        assert_eq!(record.spec["expected_status"], 200);
    }

    #[test]
    fn test_plan_rejects_malformed_spec() {
        let (mock, registry, _) = setup();
        let err = registry
            .get(Kind::Topic)
            .unwrap()
            .plan(ClusterRef::kafka("prod"), json!({ "name": "orders" }))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSpec { kind: Kind::Topic, .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_erased_lifecycle() {
        let (_, registry, ctx) = setup();
        let topics = registry.get(Kind::Topic).unwrap();
        let planned = topics
            .plan(
                ClusterRef::kafka("prod"),
                json!({ "name": "orders", "partitions": 3, "replication_factor": 1 }),
            )
            .unwrap();
        let created = topics.create(&ctx, &planned).unwrap();
        assert_eq!(created.state, LifecycleState::Present);

        let updated = topics
            .update(
                &ctx,
                &created,
                &json!({
                    "name": "orders",
                    "partitions": 3,
                    "replication_factor": 1,
                    "config": { "retention_ms": "1000" }
                }),
            )
            .unwrap();
        assert_eq!(updated.spec["config"]["retention_ms"], "1000");

        let imported = topics.import(&ctx, "prod/orders").unwrap();
        assert_eq!(imported.spec, updated.spec);

        topics.delete(&ctx, &imported).unwrap();
        assert!(topics.lookup(&ctx, "prod/orders").unwrap().is_none());
    }

    #[test]
    fn test_read_many_keeps_order() {
        let (_, registry, ctx) = setup();
        let topics = registry.get(Kind::Topic).unwrap();
        let mut records = Vec::new();
        for name in ["a", "b", "c", "d"] {
            let planned = topics
                .plan(
                    ClusterRef::kafka("prod"),
                    json!({ "name": name, "partitions": 1, "replication_factor": 1 }),
                )
                .unwrap();
            records.push(topics.create(&ctx, &planned).unwrap());
        }
        topics.delete(&ctx, &records[2]).unwrap();

        let outcomes = registry.read_many(&ctx, &records, 3, false).unwrap();
        assert_eq!(outcomes.len(), 4);
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome.unwrap() {
                ReadOutcome::Present(record) => assert_eq!(record.spec["name"], records[index].spec["name"]),
                ReadOutcome::Gone => assert_eq!(index, 2),
            }
        }
    }

    #[test]
    fn test_read_many_fail_fast_cancels() {
        let (mock, registry, ctx) = setup();
        let topics = registry.get(Kind::Topic).unwrap();
        let planned = topics
            .plan(
                ClusterRef::kafka("prod"),
                json!({ "name": "orders", "partitions": 1, "replication_factor": 1 }),
            )
            .unwrap();
        let record = topics.create(&ctx, &planned).unwrap();

        mock.fail_next("get_topic", 500, "boom");
        let records = vec![record.clone(), record.clone(), record];
        let outcomes = registry.read_many(&ctx, &records, 1, true).unwrap();

        assert!(outcomes.iter().all(Result::is_err));
        assert!(ctx.cancel_token().is_cancelled());
    }
}
