//! Blocking HTTP implementation of [`Gateway`].
//!
//! Every request is bounded by the configured per-request timeout, shortened
//! to whatever is left of the caller's deadline. Non-2xx statuses are turned
//! into [`Error::Remote`] by this module rather than by ureq, so that 404 can
//! be told apart on reads.

use crate::backend::Gateway;
use crate::config::{GatewayConfig, mask_secret};
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::types::{
    Acl, AclListResponse, AlertRule, AlertRulesResponse, Backup, ClusterRef, ConfigEntry,
    ConnectorConfigRequest, ConnectorInfo, ConnectorListResponse, ConnectorPayload, HealthChecks,
    Integrations, LogCollector, OverridePayload, RepairSettings, RouteType, SchemaIdResponse,
    SchemaPayload, SchemaVersion, TopicConfigResponse, TopicConfigUpdate,
    TopicConfigUpdateRequest, TopicInfo, TopicPayload, decode_backups,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use ureq::RequestBuilder;

/// Response bodies longer than this are cut in trace logs.
const MAX_LOGGED_BODY: usize = 500;

/// Form field the log collector endpoint reads its JSON from.
const LOG_COLLECTOR_FORM_FIELD: &str = "addlogs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        write!(f, "{name}")
    }
}

/// Request body.
enum Payload {
    Empty,
    Json(String),
    Form(String),
}

impl Payload {
    fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_string(value)
            .map(Self::Json)
            .map_err(|e| Error::Encode(e.to_string()))
    }

    fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::Json(_) => Some("application/json"),
            Self::Form(_) => Some("application/x-www-form-urlencoded"),
        }
    }

    fn body(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Json(body) | Self::Form(body) => Some(body),
        }
    }
}

/// A completed exchange, whatever its status.
struct Reply {
    method: Method,
    url: String,
    status: u16,
    body: String,
}

impl Reply {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn into_error(self) -> Error {
        Error::remote(self.method.to_string(), self.url, self.status, self.body)
    }

    /// Any 2xx passes; everything else, 404 included, is a remote error.
    fn expect_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            Error::InvalidResponse(format!("{} {}: {e}", self.method, self.url))
        })
    }

    /// 404 means absent; other non-2xx statuses are errors.
    fn optional_json<T: DeserializeOwned>(self) -> Result<Option<T>> {
        if self.status == 404 {
            return Ok(None);
        }
        self.expect_success()?.json().map(Some)
    }
}

/// Gateway backed by a real management host.
///
/// ```no_run
/// use gateway::backend::Gateway;
/// use gateway::backend::http::HttpGateway;
/// use gateway::{CallContext, ClusterRef, GatewayConfig};
///
/// let config = GatewayConfig::new("acme").with_api_key("secret");
/// let gateway = HttpGateway::new(config).unwrap();
/// let topics = gateway
///     .list_topics(&CallContext::background(), &ClusterRef::kafka("prod"))
///     .unwrap();
/// println!("{} topics", topics.len());
/// ```
pub struct HttpGateway {
    agent: ureq::Agent,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Validate the configuration and build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] before any request is made if the
    /// configuration is invalid.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Ok(Self {
            agent: ureq::Agent::new_with_config(agent_config),
            config,
        })
    }

    /// The configuration this gateway was built from.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // =========================================================================
    // URL builders
    // =========================================================================

    /// `{base}/{org}/{type}/{cluster}/{suffix}`, used by the Kafka families.
    fn cluster_url(&self, cluster: &ClusterRef, suffix: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.config.base_url(),
            self.config.org_id,
            cluster.cluster_type,
            segment(&cluster.name),
            suffix
        )
    }

    /// `{base}/{family}/{org}/{type}/{cluster}`, used by the other families.
    fn family_url(&self, family: &str, cluster: &ClusterRef) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.config.base_url(),
            family,
            self.config.org_id,
            cluster.cluster_type,
            segment(&cluster.name)
        )
    }

    fn topics_url(&self, cluster: &ClusterRef) -> String {
        self.cluster_url(cluster, "topics")
    }

    fn topic_url(&self, cluster: &ClusterRef, name: &str) -> String {
        self.cluster_url(cluster, &format!("topics/{}", segment(name)))
    }

    fn topic_configs_url(&self, cluster: &ClusterRef, name: &str) -> String {
        self.cluster_url(cluster, &format!("topics/{}/configs", segment(name)))
    }

    fn acls_url(&self, cluster: &ClusterRef) -> String {
        self.cluster_url(cluster, "acls")
    }

    fn connect_url(&self, cluster: &ClusterRef, connect: &str, suffix: &str) -> String {
        self.cluster_url(cluster, &format!("connect/{}/{suffix}", segment(connect)))
    }

    fn subject_url(&self, cluster: &ClusterRef, subject: &str) -> String {
        self.cluster_url(cluster, &format!("registry/subjects/{}", segment(subject)))
    }

    fn route_override_url(&self, cluster: &ClusterRef, route: RouteType, severity: &str) -> String {
        format!(
            "{}/{}/{}",
            self.family_url("integrations-override", cluster),
            route.path_segment(),
            segment(severity)
        )
    }

    fn route_url(
        &self,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        integration_id: &str,
    ) -> String {
        format!(
            "{}/{}/{}/{}",
            self.family_url("integrations-routing", cluster),
            route.path_segment(),
            segment(severity),
            segment(integration_id)
        )
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn prepare<B>(&self, builder: RequestBuilder<B>, timeout: Duration) -> RequestBuilder<B> {
        let mut builder = builder
            .config()
            .timeout_global(Some(timeout))
            .build()
            .header("Accept", "application/json");
        if let Some(authorization) = self.config.authorization() {
            builder = builder.header("Authorization", authorization);
        }
        builder
    }

    /// Send one request and read the full response, whatever its status.
    fn execute(&self, ctx: &CallContext, method: Method, url: String, payload: Payload) -> Result<Reply> {
        let timeout = ctx.request_timeout(self.config.timeout)?;

        log::debug!("{method} {url}");
        if let Some(authorization) = self.config.authorization() {
            log::trace!("Authorization: {}", mask_secret(&authorization));
        }
        if let Some(body) = payload.body() {
            log::trace!("request body: {}", truncate(body, MAX_LOGGED_BODY));
        }

        let sent = match (method, payload.content_type(), payload.body()) {
            (Method::Get, _, _) => self.prepare(self.agent.get(&url), timeout).call(),
            (Method::Delete, None, _) => self.prepare(self.agent.delete(&url), timeout).call(),
            (Method::Delete, Some(content_type), Some(body)) => self
                .prepare(self.agent.delete(&url).force_send_body(), timeout)
                .header("Content-Type", content_type)
                .send(body),
            (Method::Post, Some(content_type), Some(body)) => self
                .prepare(self.agent.post(&url), timeout)
                .header("Content-Type", content_type)
                .send(body),
            (Method::Put, Some(content_type), Some(body)) => self
                .prepare(self.agent.put(&url), timeout)
                .header("Content-Type", content_type)
                .send(body),
            (Method::Post, _, _) => self.prepare(self.agent.post(&url), timeout).send_empty(),
            (Method::Put, _, _) => self.prepare(self.agent.put(&url), timeout).send_empty(),
            (Method::Delete, Some(_), None) => self.prepare(self.agent.delete(&url), timeout).call(),
        };

        let mut response = sent.map_err(|e| transport_error(&url, e))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| transport_error(&url, e))?;

        log::debug!("{method} {url} -> {status}");
        log::trace!("response body: {}", truncate(&body, MAX_LOGGED_BODY));

        Ok(Reply {
            method,
            url,
            status,
            body,
        })
    }

    fn get(&self, ctx: &CallContext, url: String) -> Result<Reply> {
        self.execute(ctx, Method::Get, url, Payload::Empty)
    }

    fn send_json<T: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        method: Method,
        url: String,
        value: &T,
    ) -> Result<Reply> {
        self.execute(ctx, method, url, Payload::json(value)?)?
            .expect_success()
    }

    fn send_empty(&self, ctx: &CallContext, method: Method, url: String) -> Result<()> {
        self.execute(ctx, method, url, Payload::Empty)?
            .expect_success()
            .map(|_| ())
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn truncate(body: &str, max: usize) -> String {
    if body.chars().count() <= max {
        return body.to_string();
    }
    let cut: String = body.chars().take(max).collect();
    format!("{cut}... (truncated)")
}

fn transport_error(url: &str, err: ureq::Error) -> Error {
    match err {
        ureq::Error::Timeout(_) => Error::Timeout {
            url: url.to_string(),
        },
        other => Error::Transport {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

impl Gateway for HttpGateway {
    fn create_topic(&self, ctx: &CallContext, cluster: &ClusterRef, payload: &TopicPayload) -> Result<()> {
        self.send_json(ctx, Method::Post, self.topics_url(cluster), payload)
            .map(|_| ())
    }

    fn get_topic(&self, ctx: &CallContext, cluster: &ClusterRef, name: &str) -> Result<Option<TopicInfo>> {
        self.get(ctx, self.topic_url(cluster, name))?.optional_json()
    }

    fn get_topic_configs(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &str,
    ) -> Result<Option<Vec<ConfigEntry>>> {
        let response: Option<TopicConfigResponse> = self
            .get(ctx, self.topic_configs_url(cluster, name))?
            .optional_json()?;
        Ok(response.map(TopicConfigResponse::explicit_entries))
    }

    fn list_topics(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<TopicInfo>> {
        self.get(ctx, self.topics_url(cluster))?.expect_success()?.json()
    }

    fn update_topic_configs(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        name: &str,
        updates: &[TopicConfigUpdate],
    ) -> Result<()> {
        let request = TopicConfigUpdateRequest {
            configs: updates.to_vec(),
        };
        self.send_json(ctx, Method::Put, self.topic_configs_url(cluster, name), &request)
            .map(|_| ())
    }

    fn delete_topic(&self, ctx: &CallContext, cluster: &ClusterRef, name: &str) -> Result<()> {
        self.send_empty(ctx, Method::Delete, self.topic_url(cluster, name))
    }

    fn list_acls(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<Acl>> {
        let response: AclListResponse = self.get(ctx, self.acls_url(cluster))?.expect_success()?.json()?;
        Ok(response.flatten())
    }

    fn create_acl(&self, ctx: &CallContext, cluster: &ClusterRef, acl: &Acl) -> Result<()> {
        self.send_json(ctx, Method::Post, self.acls_url(cluster), acl)
            .map(|_| ())
    }

    fn delete_acl(&self, ctx: &CallContext, cluster: &ClusterRef, acl: &Acl) -> Result<()> {
        self.send_json(ctx, Method::Delete, self.acls_url(cluster), acl)
            .map(|_| ())
    }

    fn create_connector(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
        payload: &ConnectorPayload,
    ) -> Result<ConnectorInfo> {
        self.send_json(ctx, Method::Post, self.connect_url(cluster, connect, "connector"), payload)?
            .json()
    }

    fn list_connectors(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
    ) -> Result<Vec<ConnectorInfo>> {
        let response: Option<ConnectorListResponse> = self
            .get(ctx, self.connect_url(cluster, connect, "connectors"))?
            .optional_json()?;
        Ok(response
            .map(|list| list.connectors.into_values().map(|entry| entry.info).collect())
            .unwrap_or_default())
    }

    fn update_connector_config(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
        name: &str,
        config: &BTreeMap<String, String>,
    ) -> Result<ConnectorInfo> {
        let url = self.connect_url(cluster, connect, &format!("{}/config", segment(name)));
        self.send_json(ctx, Method::Put, url, &ConnectorConfigRequest { config })?
            .json()
    }

    fn delete_connector(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        connect: &str,
        name: &str,
    ) -> Result<()> {
        self.send_empty(ctx, Method::Delete, self.connect_url(cluster, connect, &segment(name)))
    }

    fn register_schema(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        subject: &str,
        payload: &SchemaPayload,
    ) -> Result<i64> {
        let response: SchemaIdResponse = self
            .send_json(ctx, Method::Post, self.subject_url(cluster, subject), payload)?
            .json()?;
        Ok(response.id)
    }

    fn get_schema(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        subject: &str,
        version: &str,
    ) -> Result<Option<SchemaVersion>> {
        let url = format!("{}/{}", self.subject_url(cluster, subject), segment(version));
        self.get(ctx, url)?.optional_json()
    }

    fn delete_schema(&self, ctx: &CallContext, cluster: &ClusterRef, subject: &str) -> Result<()> {
        self.send_empty(ctx, Method::Delete, self.subject_url(cluster, subject))
    }

    fn get_healthchecks(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<HealthChecks> {
        self.get(ctx, self.family_url("healthchecks", cluster))?
            .expect_success()?
            .json()
    }

    fn replace_healthchecks(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        checks: &HealthChecks,
    ) -> Result<()> {
        self.send_json(ctx, Method::Put, self.family_url("healthchecks", cluster), checks)
            .map(|_| ())
    }

    fn get_log_collectors(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<LogCollector>> {
        let reply = self
            .get(ctx, self.family_url("logcollectors", cluster))?
            .expect_success()?;
        // An unconfigured cluster answers with `null`.
        let collectors: Option<Vec<LogCollector>> = reply.json()?;
        Ok(collectors.unwrap_or_default())
    }

    fn replace_log_collectors(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        collectors: &[LogCollector],
    ) -> Result<()> {
        let json = serde_json::to_string(collectors).map_err(|e| Error::Encode(e.to_string()))?;
        let form = format!("{LOG_COLLECTOR_FORM_FIELD}={}", urlencoding::encode(&json));
        self.execute(
            ctx,
            Method::Put,
            self.family_url("logcollectors", cluster),
            Payload::Form(form),
        )?
        .expect_success()
        .map(|_| ())
    }

    fn list_backups(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<Backup>> {
        let reply = self
            .get(ctx, self.family_url("cassandraScheduleSnapshot", cluster))?
            .expect_success()?;
        decode_backups(&reply.body)
    }

    fn create_backup(&self, ctx: &CallContext, cluster: &ClusterRef, backup: &Backup) -> Result<()> {
        self.send_json(ctx, Method::Post, self.family_url("cassandraSnapshot", cluster), backup)
            .map(|_| ())
    }

    fn delete_backups(&self, ctx: &CallContext, cluster: &ClusterRef, ids: &[String]) -> Result<()> {
        self.send_json(
            ctx,
            Method::Delete,
            self.family_url("cassandraScheduleSnapshot", cluster),
            ids,
        )
        .map(|_| ())
    }

    fn get_repair_settings(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
    ) -> Result<Option<RepairSettings>> {
        self.get(ctx, self.family_url("adaptiveRepair", cluster))?
            .optional_json()
    }

    fn put_repair_settings(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        settings: &RepairSettings,
    ) -> Result<()> {
        self.send_json(ctx, Method::Post, self.family_url("adaptiveRepair", cluster), settings)
            .map(|_| ())
    }

    fn list_alert_rules(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<AlertRule>> {
        let response: AlertRulesResponse = self
            .get(ctx, self.family_url("alert-rules", cluster))?
            .expect_success()?
            .json()?;
        Ok(response.metricrules)
    }

    fn put_alert_rule(&self, ctx: &CallContext, cluster: &ClusterRef, rule: &AlertRule) -> Result<()> {
        self.send_json(ctx, Method::Post, self.family_url("alert-rules", cluster), rule)
            .map(|_| ())
    }

    fn delete_alert_rule(&self, ctx: &CallContext, cluster: &ClusterRef, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.family_url("alert-rules", cluster), segment(id));
        self.send_empty(ctx, Method::Delete, url)
    }

    fn get_integrations(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Integrations> {
        self.get(ctx, self.family_url("integrations", cluster))?
            .expect_success()?
            .json()
    }

    fn set_route_override(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        value: bool,
    ) -> Result<()> {
        let url = self.route_override_url(cluster, route, severity);
        self.send_json(ctx, Method::Put, url, &OverridePayload { value })
            .map(|_| ())
    }

    fn add_route(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        integration_id: &str,
    ) -> Result<()> {
        let url = self.route_url(cluster, route, severity, integration_id);
        self.send_empty(ctx, Method::Post, url)
    }

    fn remove_route(
        &self,
        ctx: &CallContext,
        cluster: &ClusterRef,
        route: RouteType,
        severity: &str,
        integration_id: &str,
    ) -> Result<()> {
        let url = self.route_url(cluster, route, severity, integration_id);
        self.send_empty(ctx, Method::Delete, url)
    }
}
