//! TCP, HTTP and shell health checks.
//!
//! All three live in one object per cluster holding three arrays, and the
//! server only accepts that object back whole. Every write fetches it, merges
//! one element into the right array and replaces the lot. Elements are
//! matched by name; the id generated at creation is kept on update.

use crate::error::{Error, Result};
use crate::identity::{Identified, MatchKey, locate};
use crate::import::ImportFormat;
use crate::merge::{merge_delete, merge_insert, merge_replace};
use crate::reconciler::{Applied, KindDescriptor, Observed};
use crate::types::{Identity, Kind};
use gateway::{
    CallContext, CheckIntegrations, ClusterRef, Gateway, HealthChecks, HttpCheck, ShellCheck,
    TcpCheck,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// One of the three check arrays.
pub trait CheckFamily: Send + Sync + 'static {
    type Check: Identified + Clone + fmt::Debug;
    type Spec: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync;

    const KIND: Kind;

    fn checks(all: &HealthChecks) -> &[Self::Check];
    fn checks_mut(all: &mut HealthChecks) -> &mut Vec<Self::Check>;
    fn name(spec: &Self::Spec) -> &str;
    fn to_check(spec: &Self::Spec, id: &str, integrations: CheckIntegrations) -> Self::Check;
    fn to_spec(check: &Self::Check) -> Self::Spec;
    fn integrations(check: &Self::Check) -> &CheckIntegrations;
}

fn one_minute() -> String {
    "1m".to_string()
}

fn get() -> String {
    "GET".to_string()
}

fn ok_status() -> u16 {
    200
}

fn default_shell() -> String {
    "/bin/bash".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpCheckSpec {
    pub name: String,
    pub tcp: String,
    #[serde(default = "one_minute")]
    pub interval: String,
    #[serde(default = "one_minute")]
    pub timeout: String,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default = "super::default_agents")]
    pub supported_agent_type: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpCheckSpec {
    pub name: String,
    pub url: String,
    #[serde(default = "get")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default = "ok_status")]
    pub expected_status: u16,
    #[serde(default = "one_minute")]
    pub interval: String,
    #[serde(default = "one_minute")]
    pub timeout: String,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default = "super::default_agents")]
    pub supported_agent_type: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellCheckSpec {
    pub name: String,
    pub script: String,
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default = "one_minute")]
    pub interval: String,
    #[serde(default = "one_minute")]
    pub timeout: String,
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tcp;

#[derive(Debug, Clone, Copy, Default)]
pub struct Http;

#[derive(Debug, Clone, Copy, Default)]
pub struct Shell;

impl CheckFamily for Tcp {
    type Check = TcpCheck;
    type Spec = TcpCheckSpec;

    const KIND: Kind = Kind::TcpCheck;

    fn checks(all: &HealthChecks) -> &[TcpCheck] {
        &all.tcpchecks
    }

    fn checks_mut(all: &mut HealthChecks) -> &mut Vec<TcpCheck> {
        &mut all.tcpchecks
    }

    fn name(spec: &TcpCheckSpec) -> &str {
        &spec.name
    }

    fn to_check(spec: &TcpCheckSpec, id: &str, integrations: CheckIntegrations) -> TcpCheck {
        TcpCheck {
            id: id.to_string(),
            name: spec.name.clone(),
            interval: spec.interval.clone(),
            timeout: spec.timeout.clone(),
            integrations,
            readonly: spec.readonly,
            supported_agent_type: spec.supported_agent_type.clone(),
            tcp: spec.tcp.clone(),
        }
    }

    fn to_spec(check: &TcpCheck) -> TcpCheckSpec {
        TcpCheckSpec {
            name: check.name.clone(),
            tcp: check.tcp.clone(),
            interval: check.interval.clone(),
            timeout: check.timeout.clone(),
            readonly: check.readonly,
            supported_agent_type: check.supported_agent_type.clone(),
        }
    }

    fn integrations(check: &TcpCheck) -> &CheckIntegrations {
        &check.integrations
    }
}

impl CheckFamily for Http {
    type Check = HttpCheck;
    type Spec = HttpCheckSpec;

    const KIND: Kind = Kind::HttpCheck;

    fn checks(all: &HealthChecks) -> &[HttpCheck] {
        &all.httpchecks
    }

    fn checks_mut(all: &mut HealthChecks) -> &mut Vec<HttpCheck> {
        &mut all.httpchecks
    }

    fn name(spec: &HttpCheckSpec) -> &str {
        &spec.name
    }

    fn to_check(spec: &HttpCheckSpec, id: &str, integrations: CheckIntegrations) -> HttpCheck {
        HttpCheck {
            id: id.to_string(),
            name: spec.name.clone(),
            interval: spec.interval.clone(),
            timeout: spec.timeout.clone(),
            integrations,
            readonly: spec.readonly,
            supported_agent_type: spec.supported_agent_type.clone(),
            url: spec.url.clone(),
            method: spec.method.clone(),
            headers: spec.headers.clone(),
            body: spec.body.clone(),
            expected_status: spec.expected_status,
        }
    }

    fn to_spec(check: &HttpCheck) -> HttpCheckSpec {
        HttpCheckSpec {
            name: check.name.clone(),
            url: check.url.clone(),
            method: if check.method.is_empty() {
                get()
            } else {
                check.method.clone()
            },
            headers: check.headers.clone(),
            body: check.body.clone(),
            expected_status: if check.expected_status == 0 {
                ok_status()
            } else {
                check.expected_status
            },
            interval: check.interval.clone(),
            timeout: check.timeout.clone(),
            readonly: check.readonly,
            supported_agent_type: check.supported_agent_type.clone(),
        }
    }

    fn integrations(check: &HttpCheck) -> &CheckIntegrations {
        &check.integrations
    }
}

impl CheckFamily for Shell {
    type Check = ShellCheck;
    type Spec = ShellCheckSpec;

    const KIND: Kind = Kind::ShellCheck;

    fn checks(all: &HealthChecks) -> &[ShellCheck] {
        &all.shellchecks
    }

    fn checks_mut(all: &mut HealthChecks) -> &mut Vec<ShellCheck> {
        &mut all.shellchecks
    }

    fn name(spec: &ShellCheckSpec) -> &str {
        &spec.name
    }

    fn to_check(spec: &ShellCheckSpec, id: &str, integrations: CheckIntegrations) -> ShellCheck {
        ShellCheck {
            id: id.to_string(),
            name: spec.name.clone(),
            interval: spec.interval.clone(),
            timeout: spec.timeout.clone(),
            integrations,
            readonly: spec.readonly,
            shell: spec.shell.clone(),
            script: spec.script.clone(),
        }
    }

    fn to_spec(check: &ShellCheck) -> ShellCheckSpec {
        ShellCheckSpec {
            name: check.name.clone(),
            script: check.script.clone(),
            shell: check.shell.clone(),
            interval: check.interval.clone(),
            timeout: check.timeout.clone(),
            readonly: check.readonly,
        }
    }

    fn integrations(check: &ShellCheck) -> &CheckIntegrations {
        &check.integrations
    }
}

/// Descriptor shared by the three check kinds.
#[derive(Debug, Clone, Copy)]
pub struct HealthCheckKind<F>(PhantomData<F>);

impl<F> HealthCheckKind<F> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<F> Default for HealthCheckKind<F> {
    fn default() -> Self {
        Self::new()
    }
}

pub type TcpCheckKind = HealthCheckKind<Tcp>;
pub type HttpCheckKind = HealthCheckKind<Http>;
pub type ShellCheckKind = HealthCheckKind<Shell>;

impl<F: CheckFamily> KindDescriptor for HealthCheckKind<F> {
    type Spec = F::Spec;
    type Computed = ();
    type Key = String;

    const KIND: Kind = F::KIND;
    const IMPORT: ImportFormat = ImportFormat::new(&["cluster", "name"]);

    fn new_identity(&self, _cluster: &ClusterRef, _spec: &F::Spec) -> Identity {
        Identity::generate()
    }

    fn key(&self, spec: &F::Spec, _identity: &Identity) -> String {
        F::name(spec).to_string()
    }

    fn validate(&self, spec: &F::Spec) -> Result<()> {
        if F::name(spec).is_empty() {
            return Err(Error::invalid_spec(F::KIND, "name must not be empty"));
        }
        Ok(())
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &F::Spec,
        identity: &Identity,
    ) -> Result<Applied<()>> {
        let mut all = gateway.get_healthchecks(ctx, cluster)?;
        let check = F::to_check(spec, identity.value(), CheckIntegrations::default());
        let merged = merge_insert(std::mem::take(F::checks_mut(&mut all)), check)?;
        *F::checks_mut(&mut all) = merged;
        gateway.replace_healthchecks(ctx, cluster, &all)?;
        Ok(Applied::new(()))
    }

    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &String,
    ) -> Result<Option<Observed<F::Spec, ()>>> {
        let all = gateway.get_healthchecks(ctx, cluster)?;
        Ok(locate(F::checks(&all), MatchKey::Name(name)).map(|check| Observed {
            spec: F::to_spec(check),
            computed: (),
            identity: (!check.id_key().is_empty())
                .then(|| Identity::Generated(check.id_key().to_string())),
        }))
    }

    fn update(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        _identity: &Identity,
        current: &F::Spec,
        desired: &F::Spec,
    ) -> Result<Applied<()>> {
        let old_name = F::name(current);
        let mut all = gateway.get_healthchecks(ctx, cluster)?;
        let existing = locate(F::checks(&all), MatchKey::Name(old_name)).ok_or_else(|| {
            Error::NotFound {
                kind: F::KIND,
                cluster: cluster.clone(),
                key: old_name.to_string(),
            }
        })?;
        // The server owns the id and the integration wiring.
        let check = F::to_check(desired, existing.id_key(), F::integrations(existing).clone());

        let merged = merge_replace(std::mem::take(F::checks_mut(&mut all)), MatchKey::Name(old_name), check)?;
        *F::checks_mut(&mut all) = merged;
        gateway.replace_healthchecks(ctx, cluster, &all)?;
        Ok(Applied::new(()))
    }

    fn delete(&self, gateway: &dyn Gateway, ctx: &CallContext, cluster: &ClusterRef, name: &String) -> Result<()> {
        let mut all = gateway.get_healthchecks(ctx, cluster)?;
        if locate(F::checks(&all), MatchKey::Name(name)).is_none() {
            log::debug!("{} {name} not in collection on {cluster}", F::KIND);
            return Ok(());
        }
        let merged = merge_delete(std::mem::take(F::checks_mut(&mut all)), MatchKey::Name(name));
        *F::checks_mut(&mut all) = merged;
        gateway.replace_healthchecks(ctx, cluster, &all)?;
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
        let all = gateway.get_healthchecks(ctx, cluster)?;
        let ids = F::checks(&all)
            .iter()
            .map(|check| format!("{}/{}", cluster.name, check.name_key()))
            .collect();
        Ok(Some(ids))
    }
}
