//! Metric alert rules.
//!
//! Rules carry a client-generated uuid; posting a rule with an existing id
//! updates it. The eight filter lists are sent as named filters, empty lists
//! omitted.

use crate::error::{Error, Result};
use crate::identity::{MatchKey, locate};
use crate::import::ImportFormat;
use crate::reconciler::{Applied, KindDescriptor, Observed};
use crate::types::{Identity, Kind};
use gateway::{AlertAnnotations, AlertFilter, AlertRule, CallContext, ClusterRef, Gateway};
use serde::{Deserialize, Serialize};

const OPERATORS: [&str; 5] = [">", ">=", "=", "<=", "<"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRuleSpec {
    pub name: String,
    /// Metric expression.
    pub metric: String,
    pub operator: String,
    pub warning_value: f64,
    pub critical_value: f64,
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dc: Vec<String>,
    #[serde(default)]
    pub rack: Vec<String>,
    #[serde(default)]
    pub host_id: Vec<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub keyspace: Vec<String>,
    #[serde(default)]
    pub percentile: Vec<String>,
    #[serde(default)]
    pub consistency: Vec<String>,
    #[serde(default)]
    pub group_by: Vec<String>,
}

fn default_duration() -> String {
    "15m".to_string()
}

impl AlertRuleSpec {
    fn filter_lists(&self) -> [(&'static str, &Vec<String>); 8] {
        [
            ("dc", &self.dc),
            ("rack", &self.rack),
            ("host_id", &self.host_id),
            ("scope", &self.scope),
            ("keyspace", &self.keyspace),
            ("percentile", &self.percentile),
            ("consistency", &self.consistency),
            ("groupBy", &self.group_by),
        ]
    }

    fn filter_list_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        match name {
            "dc" => Some(&mut self.dc),
            "rack" => Some(&mut self.rack),
            "host_id" => Some(&mut self.host_id),
            "scope" => Some(&mut self.scope),
            "keyspace" => Some(&mut self.keyspace),
            "percentile" => Some(&mut self.percentile),
            "consistency" => Some(&mut self.consistency),
            "groupBy" => Some(&mut self.group_by),
            _ => None,
        }
    }

    fn summary(&self) -> String {
        format!(
            "{} is {} than threshold (current value: {{{{$value}}}})",
            self.name, self.operator
        )
    }

    fn to_rule(&self, id: &str) -> AlertRule {
        let filters = self
            .filter_lists()
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| AlertFilter {
                name: name.to_string(),
                value: values.clone(),
            })
            .collect();
        AlertRule {
            id: id.to_string(),
            alert: self.name.clone(),
            r#for: self.duration.clone(),
            operator: self.operator.clone(),
            warning_value: self.warning_value,
            critical_value: self.critical_value,
            expr: self.metric.clone(),
            annotations: AlertAnnotations {
                description: self.description.clone(),
                summary: self.summary(),
                ..AlertAnnotations::default()
            },
            filters,
            ..AlertRule::default()
        }
    }

    fn from_rule(rule: &AlertRule) -> Self {
        let mut spec = Self {
            name: rule.alert.clone(),
            metric: rule.expr.clone(),
            operator: rule.operator.clone(),
            warning_value: rule.warning_value,
            critical_value: rule.critical_value,
            duration: rule.r#for.clone(),
            description: rule.annotations.description.clone(),
            dc: Vec::new(),
            rack: Vec::new(),
            host_id: Vec::new(),
            scope: Vec::new(),
            keyspace: Vec::new(),
            percentile: Vec::new(),
            consistency: Vec::new(),
            group_by: Vec::new(),
        };
        for filter in &rule.filters {
            match spec.filter_list_mut(&filter.name) {
                Some(list) => list.clone_from(&filter.value),
                None => log::warn!("ignoring unknown filter '{}' on alert rule {}", filter.name, rule.id),
            }
        }
        spec
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertRuleKind;

impl AlertRuleKind {
    fn put(
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &AlertRuleSpec,
        identity: &Identity,
    ) -> Result<Applied<()>> {
        gateway.put_alert_rule(ctx, cluster, &spec.to_rule(identity.value()))?;
        Ok(Applied::new(()))
    }
}

impl KindDescriptor for AlertRuleKind {
    type Spec = AlertRuleSpec;
    type Computed = ();
    type Key = String;

    const KIND: Kind = Kind::AlertRule;
    const IMPORT: ImportFormat = ImportFormat::new(&["clusterType", "cluster", "alertId"]);

    fn new_identity(&self, _cluster: &ClusterRef, _spec: &AlertRuleSpec) -> Identity {
        Identity::generate()
    }

    fn key(&self, _spec: &AlertRuleSpec, identity: &Identity) -> String {
        identity.value().to_string()
    }

    fn validate(&self, spec: &AlertRuleSpec) -> Result<()> {
        if spec.name.is_empty() || spec.metric.is_empty() {
            return Err(Error::invalid_spec(Kind::AlertRule, "name and metric must not be empty"));
        }
        if !OPERATORS.contains(&spec.operator.as_str()) {
            return Err(Error::invalid_spec(
                Kind::AlertRule,
                format!("operator must be one of {}", OPERATORS.join(" ")),
            ));
        }
        Ok(())
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &AlertRuleSpec,
        identity: &Identity,
    ) -> Result<Applied<()>> {
        Self::put(gateway, ctx, cluster, spec, identity)
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        id: &String,
    ) -> Result<Option<Observed<AlertRuleSpec, ()>>> {
        let rules = gateway.list_alert_rules(ctx, cluster)?;
        Ok(locate(&rules, MatchKey::Id(id)).map(|rule| Observed {
            spec: AlertRuleSpec::from_rule(rule),
            computed: (),
            identity: Some(Identity::Generated(rule.id.clone())),
        }))
    }

    fn update(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        identity: &Identity,
        _current: &AlertRuleSpec,
        desired: &AlertRuleSpec,
    ) -> Result<Applied<()>> {
        Self::put(gateway, ctx, cluster, desired, identity)
    }

    fn delete(&self, gateway: &dyn Gateway, ctx: &CallContext, cluster: &ClusterRef, id: &String) -> Result<()> {
        gateway.delete_alert_rule(ctx, cluster, id)?;
        Ok(())
    }

    fn parse_key(&self, segments: &[&str]) -> Result<(ClusterRef, String)> {
        Ok((super::typed_cluster(segments), segments[2].to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::Reconciler;
    use crate::types::{LifecycleState, ReadOutcome};
    use gateway::MockGateway;
    use std::sync::Arc;

    fn high_latency() -> AlertRuleSpec {
        serde_json::from_value(serde_json::json!({
            "name": "High read latency",
            "metric": "cas_ClientRequest_Latency{scope='Read'}",
            "operator": ">=",
            "warning_value": 50.0,
            "critical_value": 100.0,
            "dc": ["dc1"],
            "group_by": ["host_id"]
        }))
        .unwrap()
    }

    fn setup() -> (MockGateway, Reconciler<AlertRuleKind>, CallContext, ClusterRef) {
        let mock = MockGateway::new();
        let reconciler = Reconciler::new(Arc::new(mock.clone()), AlertRuleKind);
        (mock, reconciler, CallContext::background(), ClusterRef::cassandra("c1"))
    }

    #[test]
    fn test_rule_payload() {
        let rule = high_latency().to_rule("r-1");
        assert_eq!(rule.alert, "High read latency");
        assert_eq!(rule.r#for, "15m");
        assert_eq!(
            rule.annotations.summary,
            "High read latency is >= than threshold (current value: {{$value}})"
        );
        let names: Vec<&str> = rule.filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["dc", "groupBy"]);
    }

    #[test]
    fn test_read_resets_filters() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), high_latency()))
            .unwrap();

        // Filters removed server-side must read back as empty lists.
        let mut rule = high_latency().to_rule(created.identity.as_ref().map_or("", Identity::value));
        rule.filters.retain(|filter| filter.name != "dc");
        mock.put_alert_rule(&ctx, &cluster, &rule).unwrap();

        let ReadOutcome::Present(read) = reconciler.read(&ctx, &created).unwrap() else {
            panic!("rule should exist");
        };
        assert!(read.spec.dc.is_empty());
        assert_eq!(read.spec.group_by, vec!["host_id".to_string()]);
        assert_eq!(read.state, LifecycleState::Drifted);
    }

    #[test]
    fn test_update_posts_same_id() {
        let (mock, reconciler, ctx, cluster) = setup();
        let created = reconciler
            .create(&ctx, &reconciler.plan(cluster.clone(), high_latency()))
            .unwrap();

        let desired = AlertRuleSpec {
            critical_value: 200.0,
            ..high_latency()
        };
        let updated = reconciler.update(&ctx, &created, &desired).unwrap();
        assert_eq!(updated.identity, created.identity);

        let rules = mock.list_alert_rules(&ctx, &cluster).unwrap();
        assert_eq!(rules.len(), 1);
        assert!((rules[0].critical_value - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_import_and_idempotent_delete() {
        let (_, reconciler, ctx, cluster) = setup();
        let created = reconciler.create(&ctx, &reconciler.plan(cluster, high_latency())).unwrap();
        let id = created.identity.as_ref().map(Identity::value).unwrap_or_default().to_string();

        let imported = reconciler.import(&ctx, &format!("cassandra/c1/{id}")).unwrap();
        assert_eq!(imported.spec, high_latency());
        assert_eq!(imported.identity, created.identity);

        reconciler.delete(&ctx, &imported).unwrap();
        reconciler.delete(&ctx, &imported).unwrap();
    }

    #[test]
    fn test_invalid_operator() {
        let (mock, reconciler, ctx, cluster) = setup();
        let spec = AlertRuleSpec {
            operator: "~".to_string(),
            ..high_latency()
        };
        assert!(reconciler.create(&ctx, &reconciler.plan(cluster, spec)).unwrap_err().is_config());
        assert!(mock.calls().is_empty());
    }
}
