//! Kafka ACLs.
//!
//! An ACL has no id; its full seven-field tuple is its identity. There is no
//! update endpoint, so a changed ACL is deleted and recreated.

use crate::error::{Error, Result};
use crate::import::ImportFormat;
use crate::reconciler::{Applied, KindDescriptor, Observed, UpdateStrategy};
use crate::types::{Identity, Kind};
use gateway::{Acl, CallContext, ClusterRef, Gateway};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclSpec {
    pub resource_type: String,
    pub resource_name: String,
    #[serde(default = "default_pattern_type")]
    pub resource_pattern_type: String,
    pub principal: String,
    #[serde(default = "default_host")]
    pub host: String,
    pub operation: String,
    pub permission_type: String,
}

fn default_pattern_type() -> String {
    "LITERAL".to_string()
}

fn default_host() -> String {
    "*".to_string()
}

impl AclSpec {
    fn to_acl(&self) -> Acl {
        Acl {
            resource_type: self.resource_type.clone(),
            resource_name: self.resource_name.clone(),
            resource_pattern_type: self.resource_pattern_type.clone(),
            principal: self.principal.clone(),
            host: self.host.clone(),
            operation: self.operation.clone(),
            permission_type: self.permission_type.clone(),
        }
    }

    fn from_acl(acl: Acl) -> Self {
        Self {
            resource_type: acl.resource_type,
            resource_name: acl.resource_name,
            resource_pattern_type: acl.resource_pattern_type,
            principal: acl.principal,
            host: acl.host,
            operation: acl.operation,
            permission_type: acl.permission_type,
        }
    }

    fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("resource_type", self.resource_type.as_str()),
            ("resource_name", self.resource_name.as_str()),
            ("resource_pattern_type", self.resource_pattern_type.as_str()),
            ("principal", self.principal.as_str()),
            ("host", self.host.as_str()),
            ("operation", self.operation.as_str()),
            ("permission_type", self.permission_type.as_str()),
        ]
    }

    /// The tuple in import-id order.
    pub fn tuple(&self) -> String {
        self.fields()
            .iter()
            .map(|(_, value)| *value)
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AclKind;

impl KindDescriptor for AclKind {
    type Spec = AclSpec;
    type Computed = ();
    type Key = Acl;

    const KIND: Kind = Kind::Acl;
    const IMPORT: ImportFormat = ImportFormat::new(&[
        "cluster",
        "resourceType",
        "resourceName",
        "patternType",
        "principal",
        "host",
        "operation",
        "permission",
    ]);
    const UPDATE: UpdateStrategy = UpdateStrategy::Recreate;

    fn new_identity(&self, _cluster: &ClusterRef, spec: &AclSpec) -> Identity {
        Identity::Natural(spec.tuple())
    }

    fn key(&self, spec: &AclSpec, _identity: &Identity) -> Acl {
        spec.to_acl()
    }

    fn validate(&self, spec: &AclSpec) -> Result<()> {
        if let Some((field, _)) = spec.fields().iter().find(|(_, value)| value.is_empty()) {
            return Err(Error::invalid_spec(Kind::Acl, format!("{field} must not be empty")));
        }
        if spec.fields().iter().any(|(_, value)| value.contains('/')) {
            return Err(Error::invalid_spec(
                Kind::Acl,
                "fields must not contain '/', it would make the import id ambiguous",
            ));
        }
        Ok(())
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &AclSpec,
        _identity: &Identity,
    ) -> Result<Applied<()>> {
        gateway.create_acl(ctx, cluster, &spec.to_acl())?;
        Ok(Applied::new(()))
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        acl: &Acl,
    ) -> Result<Option<Observed<AclSpec, ()>>> {
        let found = gateway
            .list_acls(ctx, cluster)?
            .into_iter()
            .find(|existing| existing == acl);
        Ok(found.map(|acl| {
            let spec = AclSpec::from_acl(acl);
            Observed {
                identity: Some(Identity::Natural(spec.tuple())),
                spec,
                computed: (),
            }
        }))
    }

    fn delete(&self, gateway: &dyn Gateway, ctx: &CallContext, cluster: &ClusterRef, acl: &Acl) -> Result<()> {
        // The server rejects deleting a missing ACL with a status that is not
        // always 404, so check the list first.
        if !gateway.list_acls(ctx, cluster)?.contains(acl) {
            log::debug!("ACL {} is not listed on {cluster}; nothing to delete", acl.principal);
            return Ok(());
        }
        gateway.delete_acl(ctx, cluster, acl)?;
        Ok(())
    }

    fn parse_key(&self, segments: &[&str]) -> Result<(ClusterRef, Acl)> {
        let acl = Acl {
            resource_type: segments[1].to_string(),
            resource_name: segments[2].to_string(),
            resource_pattern_type: segments[3].to_string(),
            principal: segments[4].to_string(),
            host: segments[5].to_string(),
            operation: segments[6].to_string(),
            permission_type: segments[7].to_string(),
        };
        Ok((ClusterRef::new(Self::DEFAULT_CLUSTER_TYPE, segments[0]), acl))
    }

    fn discover(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
    ) -> Result<Option<Vec<String>>> {
        let ids = gateway
            .list_acls(ctx, cluster)?
            .into_iter()
            .map(|acl| format!("{}/{}", cluster.name, AclSpec::from_acl(acl).tuple()))
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

    fn read_acl() -> AclSpec {
        AclSpec {
            resource_type: "TOPIC".to_string(),
            resource_name: "orders".to_string(),
            resource_pattern_type: "LITERAL".to_string(),
            principal: "User:a".to_string(),
            host: "*".to_string(),
            operation: "READ".to_string(),
            permission_type: "ALLOW".to_string(),
        }
    }

    fn write_acl() -> AclSpec {
        AclSpec {
            operation: "WRITE".to_string(),
            ..read_acl()
        }
    }

    fn setup() -> (MockGateway, Reconciler<AclKind>, CallContext, ClusterRef) {
        let mock = MockGateway::new();
        let reconciler = Reconciler::new(Arc::new(mock.clone()), AclKind);
        (mock, reconciler, CallContext::background(), ClusterRef::kafka("prod"))
    }

    #[test]
    fn test_defaults() {
        let spec: AclSpec = serde_json::from_value(serde_json::json!({
            "resource_type": "TOPIC",
            "resource_name": "orders",
            "principal": "User:a",
            "operation": "READ",
            "permission_type": "ALLOW"
        }))
        .unwrap();
        assert_eq!(spec, read_acl());
    }

    #[test]
    fn test_identity_is_the_tuple() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler.create(&ctx, &reconciler.plan(cluster, read_acl())).unwrap();
        assert_eq!(
            created.identity,
            Some(Identity::Natural("TOPIC/orders/LITERAL/User:a/*/READ/ALLOW".to_string()))
        );
    }

    #[test]
    fn test_update_is_delete_then_create() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), read_acl()))
            .unwrap();
        mock.clear_calls();

        let updated = reconciler.update(&ctx, &created, &write_acl()).unwrap();
        assert_eq!(
            mock.calls(),
            vec![
                "list_acls kafka/prod".to_string(),
                "delete_acl kafka/prod".to_string(),
                "create_acl kafka/prod".to_string(),
            ]
        );
        assert_eq!(mock.acls(&cluster), vec![write_acl().to_acl()]);
        assert_eq!(updated.spec, write_acl());
        assert_eq!(updated.identity, Some(Identity::Natural(write_acl().tuple())));
    }

    #[test]
    fn test_failed_recreate_does_not_roll_back() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), read_acl()))
            .unwrap();
        mock.fail_next("create_acl", 400, "invalid operation");

        let err = reconciler.update(&ctx, &created, &write_acl()).unwrap_err();
        assert!(matches!(err, Error::PartialReplace { .. }));
        assert!(err.to_string().contains("invalid operation"));
        // The old ACL is gone remotely and nothing recreated it.
        assert!(mock.acls(&cluster).is_empty());
        assert_eq!(created.spec, read_acl());

        let outcome = reconciler.read(&ctx, &created).unwrap();
        assert_eq!(outcome, ReadOutcome::Gone);
    }

    #[test]
    fn test_delete_absent_is_ok() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), read_acl()))
            .unwrap();
        reconciler.delete(&ctx, &created).unwrap();
        assert!(mock.acls(&cluster).is_empty());

        // The server refuses a missing ACL with 400; the delete never gets that far.
        mock.fail_next("delete_acl", 400, "acl does not exist");
        mock.clear_calls();
        reconciler.delete(&ctx, &created).unwrap();
        assert_eq!(mock.calls(), vec!["list_acls kafka/prod".to_string()]);
    }

    #[test]
    fn test_import_eight_segments() {
        let (_, reconciler, ctx, cluster) = setup();
        reconciler.create(&ctx, &reconciler.plan(cluster, read_acl())).unwrap();

        let record = reconciler
            .import(&ctx, "prod/TOPIC/orders/LITERAL/User:a/*/READ/ALLOW")
            .unwrap();
        assert_eq!(record.spec, read_acl());
        assert_eq!(record.state, LifecycleState::Present);

        let err = reconciler.import(&ctx, "prod/TOPIC/orders").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_discover_round_trips_through_import() {
        let (_, reconciler, ctx, cluster) = setup();
        reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), read_acl()))
            .unwrap();
        let ids = reconciler.discover(&ctx, &cluster).unwrap();
        assert_eq!(ids.len(), 1);
        let record = reconciler.import(&ctx, &ids[0]).unwrap();
        assert_eq!(record.spec, read_acl());
    }
}
