//! Alert routes: which integration receives alerts of a type and severity.
//!
//! Integrations themselves are managed outside and located by a
//! case-insensitive match on type and name. A route has no id; changing it
//! removes the old route and adds the new one.

use crate::error::{Error, Result};
use crate::import::ImportFormat;
use crate::reconciler::{Applied, KindDescriptor, Observed, UpdateStrategy};
use crate::types::{Identity, Kind};
use gateway::{
    CallContext, ClusterRef, Gateway, IntegrationDefinition, IntegrationRouting, Integrations,
    RouteType,
};
use serde::{Deserialize, Serialize};

const SEVERITIES: [&str; 3] = ["info", "warning", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRouteSpec {
    pub route_type: RouteType,
    pub severity: String,
    pub integration_type: String,
    pub integration_name: String,
    /// Set the per-severity override flag before adding the route. Ignored
    /// for global routes.
    #[serde(default = "super::default_true")]
    pub enable_override: bool,
}

impl AlertRouteSpec {
    fn key(&self) -> RouteKey {
        RouteKey {
            route_type: self.route_type,
            severity: self.severity.clone(),
            integration_type: self.integration_type.clone(),
            integration_name: self.integration_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertRouteComputed {
    pub integration_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteKey {
    pub route_type: RouteType,
    pub severity: String,
    pub integration_type: String,
    pub integration_name: String,
}

impl RouteKey {
    fn identity(&self) -> Identity {
        Identity::Natural(format!(
            "{}/{}/{}/{}",
            self.route_type, self.severity, self.integration_type, self.integration_name
        ))
    }
}

fn find_integration<'a>(
    integrations: &'a Integrations,
    integration_type: &str,
    name: &str,
) -> Option<&'a IntegrationDefinition> {
    integrations.definitions.iter().find(|definition| {
        definition.integration_type.eq_ignore_ascii_case(integration_type)
            && definition.name().eq_ignore_ascii_case(name)
    })
}

/// Routing types come back URL-encoded from some server versions.
fn routing_for(integrations: &Integrations, route: RouteType) -> Option<&IntegrationRouting> {
    integrations.routings.iter().find(|routing| {
        urlencoding::decode(&routing.route_type).is_ok_and(|decoded| decoded == route.api_name())
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertRouteKind;

impl KindDescriptor for AlertRouteKind {
    type Spec = AlertRouteSpec;
    type Computed = AlertRouteComputed;
    type Key = RouteKey;

    const KIND: Kind = Kind::AlertRoute;
    const IMPORT: ImportFormat = ImportFormat::new(&[
        "clusterType",
        "cluster",
        "routeType",
        "severity",
        "integrationType",
        "integrationName",
    ]);
    const UPDATE: UpdateStrategy = UpdateStrategy::Recreate;

    fn new_identity(&self, _cluster: &ClusterRef, spec: &AlertRouteSpec) -> Identity {
        spec.key().identity()
    }

    fn key(&self, spec: &AlertRouteSpec, _identity: &Identity) -> RouteKey {
        spec.key()
    }

    fn validate(&self, spec: &AlertRouteSpec) -> Result<()> {
        if !SEVERITIES.contains(&spec.severity.as_str()) {
            return Err(Error::invalid_spec(
                Kind::AlertRoute,
                format!("severity must be one of {}", SEVERITIES.join(", ")),
            ));
        }
        if spec.integration_type.is_empty() || spec.integration_name.is_empty() {
            return Err(Error::invalid_spec(
                Kind::AlertRoute,
                "integration_type and integration_name must not be empty",
            ));
        }
        Ok(())
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &AlertRouteSpec,
        _identity: &Identity,
    ) -> Result<Applied<AlertRouteComputed>> {
        let integrations = gateway.get_integrations(ctx, cluster)?;
        let definition = find_integration(&integrations, &spec.integration_type, &spec.integration_name)
            .ok_or_else(|| Error::NotFound {
                kind: Kind::AlertRoute,
                cluster: cluster.clone(),
                key: format!("integration {}/{}", spec.integration_type, spec.integration_name),
            })?;

        if spec.route_type.supports_override() && spec.enable_override {
            gateway.set_route_override(ctx, cluster, spec.route_type, &spec.severity, true)?;
        }
        gateway.add_route(ctx, cluster, spec.route_type, &spec.severity, &definition.id)?;

        Ok(Applied::new(AlertRouteComputed {
            integration_id: definition.id.clone(),
        }))
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        key: &RouteKey,
    ) -> Result<Option<Observed<AlertRouteSpec, AlertRouteComputed>>> {
        let integrations = gateway.get_integrations(ctx, cluster)?;
        let Some(definition) = find_integration(&integrations, &key.integration_type, &key.integration_name)
        else {
            return Ok(None);
        };
        let Some(routing) = routing_for(&integrations, key.route_type) else {
            return Ok(None);
        };
        let routed = routing.routing.iter().any(|entry| {
            entry.id == definition.id && entry.severity.eq_ignore_ascii_case(&key.severity)
        });
        if !routed {
            return Ok(None);
        }

        let enable_override = if key.route_type.supports_override() {
            routing.override_for(&key.severity).unwrap_or(false)
        } else {
            true
        };
        Ok(Some(Observed {
            spec: AlertRouteSpec {
                route_type: key.route_type,
                severity: key.severity.clone(),
                integration_type: key.integration_type.clone(),
                integration_name: key.integration_name.clone(),
                enable_override,
            },
            computed: AlertRouteComputed {
                integration_id: definition.id.clone(),
            },
            identity: Some(key.identity()),
        }))
    }

    fn reconcile_observed(&self, stored: &AlertRouteSpec, mut observed: AlertRouteSpec) -> AlertRouteSpec {
        if !observed.route_type.supports_override() {
            observed.enable_override = stored.enable_override;
        }
        observed
    }

    fn delete(&self, gateway: &dyn Gateway, ctx: &CallContext, cluster: &ClusterRef, key: &RouteKey) -> Result<()> {
        let integrations = gateway.get_integrations(ctx, cluster)?;
        let Some(definition) = find_integration(&integrations, &key.integration_type, &key.integration_name)
        else {
            log::debug!(
                "integration {}/{} is gone on {cluster}; nothing to unroute",
                key.integration_type,
                key.integration_name
            );
            return Ok(());
        };
        gateway.remove_route(ctx, cluster, key.route_type, &key.severity, &definition.id)?;
        Ok(())
    }

    fn parse_key(&self, segments: &[&str]) -> Result<(ClusterRef, RouteKey)> {
        let route_type: RouteType = segments[2]
            .parse()
            .map_err(|e: gateway::Error| Error::config(e.to_string()))?;
        Ok((
            super::typed_cluster(segments),
            RouteKey {
                route_type,
                severity: segments[3].to_ascii_lowercase(),
                integration_type: segments[4].to_string(),
                integration_name: segments[5].to_string(),
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

    fn route(route_type: RouteType, severity: &str) -> AlertRouteSpec {
        AlertRouteSpec {
            route_type,
            severity: severity.to_string(),
            integration_type: "Slack".to_string(),
            integration_name: "OPS".to_string(),
            enable_override: true,
        }
    }

    fn setup() -> (MockGateway, Reconciler<AlertRouteKind>, CallContext, ClusterRef) {
        let mock = MockGateway::new();
        let cluster = ClusterRef::kafka("prod");
        mock.add_integration(&cluster, "i-1", "slack", "ops");
        let reconciler = Reconciler::new(Arc::new(mock.clone()), AlertRouteKind);
        (mock, reconciler, CallContext::background(), cluster)
    }

    #[test]
    fn test_create_sets_override_then_routes() {
        let (mock, reconciler, ctx, cluster) = setup();
        mock.clear_calls();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), route(RouteType::ServiceChecks, "warning")))
            .unwrap();

        assert_eq!(created.computed.integration_id, "i-1");
        assert_eq!(
            mock.calls(),
            vec![
                "get_integrations kafka/prod".to_string(),
                "set_route_override kafka/prod".to_string(),
                "add_route kafka/prod".to_string(),
            ]
        );

        let ReadOutcome::Present(read) = reconciler.read(&ctx, &created).unwrap() else {
            panic!("route should exist");
        };
        assert!(read.spec.enable_override);
        assert_eq!(read.state, LifecycleState::Present);
    }

    #[test]
    fn test_global_route_skips_override() {
        let (mock, reconciler, ctx, cluster) = setup();
        let mut spec = route(RouteType::Global, "error");
        spec.enable_override = false;
        let created = reconciler.create(&ctx, &reconciler.plan(cluster, spec)).unwrap();
        assert!(!mock.calls().iter().any(|call| call.starts_with("set_route_override")));

        let ReadOutcome::Present(read) = reconciler.read(&ctx, &created).unwrap() else {
            panic!("route should exist");
        };
        assert!(!read.spec.enable_override);
        assert_eq!(read.state, LifecycleState::Present);
    }

    #[test]
    fn test_unknown_integration_fails_create() {
        let (_, reconciler, ctx, cluster) = setup();
        let mut spec = route(RouteType::Metrics, "info");
        spec.integration_name = "nobody".to_string();
        let err = reconciler.create(&ctx, &reconciler.plan(cluster, spec)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_moves_route() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), route(RouteType::Backups, "warning")))
            .unwrap();

        let updated = reconciler
            .update(&ctx, &created, &route(RouteType::Backups, "error"))
            .unwrap();
        assert_eq!(
            updated.identity,
            Some(Identity::Natural("backups/error/Slack/OPS".to_string()))
        );

        let integrations = mock.get_integrations(&ctx, &cluster).unwrap();
        let routing = routing_for(&integrations, RouteType::Backups).unwrap();
        assert_eq!(routing.routing.len(), 1);
        assert_eq!(routing.routing[0].severity, "error");
    }

    #[test]
    fn test_delete_with_missing_integration_is_ok() {
        let mock = MockGateway::new();
        let reconciler = Reconciler::new(Arc::new(mock.clone()), AlertRouteKind);
        let ctx = CallContext::background();
        let mut record = reconciler.plan(ClusterRef::kafka("prod"), route(RouteType::Nodes, "info"));
        record.state = LifecycleState::Present;
        record.identity = Some(route(RouteType::Nodes, "info").key().identity());

        reconciler.delete(&ctx, &record).unwrap();
        assert_eq!(mock.calls(), vec!["get_integrations kafka/prod".to_string()]);
    }

    #[test]
    fn test_import_six_segments() {
        let (_, reconciler, ctx, cluster) = setup();
        reconciler
            .create(&ctx, &reconciler.plan(cluster, route(RouteType::RollingRestart, "info")))
            .unwrap();

        let imported = reconciler
            .import(&ctx, "kafka/prod/rollingrestart/info/slack/ops")
            .unwrap();
        assert_eq!(imported.computed.integration_id, "i-1");
        assert!(imported.spec.enable_override);

        let err = reconciler.import(&ctx, "kafka/prod/pager/info/slack/ops").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_routing_type_url_decoded() {
        let integrations: Integrations = serde_json::from_str(
            r#"{"Routings":[{"Type":"Service%20Checks","Routing":[]}]}"#,
        )
        .unwrap();
        assert!(routing_for(&integrations, RouteType::ServiceChecks).is_some());
        assert!(routing_for(&integrations, RouteType::Nodes).is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), route(RouteType::Metrics, "error")))
            .unwrap();
        reconciler.delete(&ctx, &created).unwrap();

        // The integration is still there but the route is not.
        mock.clear_calls();
        reconciler.delete(&ctx, &created).unwrap();
        assert_eq!(
            mock.calls(),
            vec!["get_integrations kafka/prod".to_string(), "remove_route kafka/prod".to_string()]
        );
        assert_eq!(reconciler.read(&ctx, &created).unwrap(), ReadOutcome::Gone);
    }
}
