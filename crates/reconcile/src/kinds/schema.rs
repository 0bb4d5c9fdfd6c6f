//! Schema registry subjects.
//!
//! Each update registers a new version under the same subject. The registry
//! stores schema text minified, so a read keeps the stored text whenever it
//! is the same JSON document.

use crate::error::{Error, Result};
use crate::import::ImportFormat;
use crate::reconciler::{Applied, KindDescriptor, Observed};
use crate::types::{Identity, Kind};
use gateway::{CallContext, ClusterRef, Gateway, SchemaPayload, SchemaReference, SchemaVersion};
use serde::{Deserialize, Serialize};

const DEFAULT_SCHEMA_TYPE: &str = "AVRO";
const LATEST: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub subject: String,
    pub schema: String,
    #[serde(default = "default_schema_type")]
    pub schema_type: String,
    #[serde(default)]
    pub references: Vec<SchemaReference>,
}

fn default_schema_type() -> String {
    DEFAULT_SCHEMA_TYPE.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaComputed {
    pub schema_id: i64,
    pub version: i64,
}

fn same_document(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn observed(subject: &str, version: SchemaVersion) -> Observed<SchemaSpec, SchemaComputed> {
    let schema_type = if version.schema_type.is_empty() {
        default_schema_type()
    } else {
        version.schema_type
    };
    Observed {
        spec: SchemaSpec {
            subject: subject.to_string(),
            schema: version.schema,
            schema_type,
            references: version.references,
        },
        computed: SchemaComputed {
            schema_id: version.id,
            version: version.version,
        },
        identity: Some(Identity::Natural(subject.to_string())),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaKind;

impl SchemaKind {
    fn register(
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &SchemaSpec,
    ) -> Result<SchemaComputed> {
        let payload = SchemaPayload {
            schema: spec.schema.clone(),
            schema_type: spec.schema_type.clone(),
            references: spec.references.clone(),
        };
        let schema_id = gateway.register_schema(ctx, cluster, &spec.subject, &payload)?;
        let version = gateway
            .get_schema(ctx, cluster, &spec.subject, LATEST)?
            .map_or(0, |latest| latest.version);
        Ok(SchemaComputed { schema_id, version })
    }
}

impl KindDescriptor for SchemaKind {
    type Spec = SchemaSpec;
    type Computed = SchemaComputed;
    type Key = String;

    const KIND: Kind = Kind::Schema;
    const IMPORT: ImportFormat = ImportFormat::new(&["cluster", "subject"]);

    fn new_identity(&self, _cluster: &ClusterRef, spec: &SchemaSpec) -> Identity {
        Identity::Natural(spec.subject.clone())
    }

    fn key(&self, spec: &SchemaSpec, _identity: &Identity) -> String {
        spec.subject.clone()
    }

    fn validate(&self, spec: &SchemaSpec) -> Result<()> {
        if spec.subject.is_empty() {
            return Err(Error::invalid_spec(Kind::Schema, "subject must not be empty"));
        }
        if spec.schema.trim().is_empty() {
            return Err(Error::invalid_spec(Kind::Schema, "schema must not be empty"));
        }
        Ok(())
    }

    fn check_immutable(&self, current: &SchemaSpec, desired: &SchemaSpec) -> Result<()> {
        if current.subject == desired.subject {
            return Ok(());
        }
        Err(Error::ImmutableField {
            kind: Kind::Schema,
            field: "subject",
            from: current.subject.clone(),
            to: desired.subject.clone(),
        })
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &SchemaSpec,
        _identity: &Identity,
    ) -> Result<Applied<SchemaComputed>> {
        Self::register(gateway, ctx, cluster, spec).map(Applied::new)
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        subject: &String,
    ) -> Result<Option<Observed<SchemaSpec, SchemaComputed>>> {
        Ok(gateway
            .get_schema(ctx, cluster, subject, LATEST)?
            .map(|version| observed(subject, version)))
    }

    fn reconcile_observed(&self, stored: &SchemaSpec, mut observed: SchemaSpec) -> SchemaSpec {
        if same_document(&stored.schema, &observed.schema) {
            observed.schema.clone_from(&stored.schema);
        }
        observed
    }

    fn update(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        _identity: &Identity,
        _current: &SchemaSpec,
        desired: &SchemaSpec,
    ) -> Result<Applied<SchemaComputed>> {
        Self::register(gateway, ctx, cluster, desired).map(Applied::new)
    }

    fn delete(&self, gateway: &dyn Gateway, ctx: &CallContext, cluster: &ClusterRef, subject: &String) -> Result<()> {
        gateway.delete_schema(ctx, cluster, subject)?;
        Ok(())
    }

    fn parse_key(&self, segments: &[&str]) -> Result<(ClusterRef, String)> {
        Ok((
            ClusterRef::new(Self::DEFAULT_CLUSTER_TYPE, segments[0]),
            segments[1].to_string(),
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

    const FORMATTED: &str = r#"{
  "type": "record",
  "name": "Order",
  "fields": [{ "name": "id", "type": "string" }]
}"#;

    fn order_schema(schema: &str) -> SchemaSpec {
        SchemaSpec {
            subject: "orders-value".to_string(),
            schema: schema.to_string(),
            schema_type: "AVRO".to_string(),
            references: vec![],
        }
    }

    fn setup() -> (MockGateway, Reconciler<SchemaKind>, CallContext, ClusterRef) {
        let mock = MockGateway::new();
        let reconciler = Reconciler::new(Arc::new(mock.clone()), SchemaKind);
        (mock, reconciler, CallContext::background(), ClusterRef::kafka("prod"))
    }

    #[test]
    fn test_create_records_id_and_version() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster, order_schema(FORMATTED)))
            .unwrap();
        assert_eq!(created.computed, SchemaComputed { schema_id: 1, version: 1 });
    }

    #[test]
    fn test_read_keeps_formatted_text_when_equivalent() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), order_schema(FORMATTED)))
            .unwrap();

        // Simulate the registry minifying the document.
        let minified = serde_json::to_string(&serde_json::from_str::<serde_json::Value>(FORMATTED).unwrap()).unwrap();
        mock.delete_schema(&ctx, &cluster, "orders-value").unwrap();
        mock.register_schema(
            &ctx,
            &cluster,
            "orders-value",
            &SchemaPayload {
                schema: minified,
                schema_type: String::new(),
                references: vec![],
            },
        )
        .unwrap();

        let ReadOutcome::Present(read) = reconciler.read(&ctx, &created).unwrap() else {
            panic!("schema should exist");
        };
        assert_eq!(read.spec.schema, FORMATTED);
        assert_eq!(read.spec.schema_type, "AVRO");
        assert_eq!(read.state, LifecycleState::Present);
    }

    #[test]
    fn test_update_registers_new_version() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster, order_schema(FORMATTED)))
            .unwrap();

        let evolved = order_schema(
            r#"{"type":"record","name":"Order","fields":[{"name":"id","type":"string"},{"name":"total","type":["null","double"],"default":null}]}"#,
        );
        let updated = reconciler.update(&ctx, &created, &evolved).unwrap();
        assert_eq!(updated.computed.version, 2);
        assert_ne!(updated.computed.schema_id, created.computed.schema_id);
    }

    #[test]
    fn test_subject_is_immutable() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster, order_schema(FORMATTED)))
            .unwrap();
        let moved = SchemaSpec {
            subject: "payments-value".to_string(),
            ..order_schema(FORMATTED)
        };
        assert!(reconciler.update(&ctx, &created, &moved).unwrap_err().is_config());
    }

    #[test]
    fn test_same_document() {
        assert!(same_document(r#"{"a": 1}"#, r#"{"a":1}"#));
        assert!(!same_document(r#"{"a": 1}"#, r#"{"a":2}"#));
        assert!(!same_document("syntax = \"proto3\";", "syntax = \"proto2\";"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), order_schema(FORMATTED)))
            .unwrap();
        reconciler.delete(&ctx, &created).unwrap();
        assert!(mock.get_schema(&ctx, &cluster, "orders-value", LATEST).unwrap().is_none());

        // The registry answers 404 for the missing subject.
        reconciler.delete(&ctx, &created).unwrap();
        assert_eq!(reconciler.read(&ctx, &created).unwrap(), ReadOutcome::Gone);
    }
}
