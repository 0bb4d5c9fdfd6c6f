//! # gateway
//!
//! Typed blocking client for the cluster management API.
//!
//! The crate exposes one method per remote endpoint through the
//! [`Gateway`] trait:
//! - Kafka topics, ACLs, connectors and schema subjects
//! - health checks and log collectors, which the server only replaces
//!   wholesale
//! - Cassandra backup schedules and adaptive repair settings
//! - metric alert rules and alert routing
//!
//! [`HttpGateway`] is the real implementation; [`MockGateway`] keeps a
//! simulated server in memory for tests.
//!
//! ## Example
//!
//! ```no_run
//! use gateway::{CallContext, ClusterRef, Gateway, GatewayConfig, HttpGateway, TokenType};
//! use std::time::Duration;
//!
//! let config = GatewayConfig::new("acme")
//!     .with_api_key("secret")
//!     .with_token_type(TokenType::Bearer);
//! let gateway = HttpGateway::new(config).expect("valid configuration");
//!
//! let ctx = CallContext::with_timeout(Duration::from_secs(30));
//! match gateway.get_topic(&ctx, &ClusterRef::kafka("prod"), "orders") {
//!     Ok(Some(topic)) => println!("{} partitions", topic.partition_count),
//!     Ok(None) => println!("no such topic"),
//!     Err(e) => eprintln!("{e} ({})", e.category().advice()),
//! }
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod types;

pub use backend::http::HttpGateway;
pub use backend::{Gateway, MockGateway};
pub use config::{GatewayConfig, Protocol, TokenType, mask_secret};
pub use context::{CallContext, CancelToken};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    Acl, AlertAnnotations, AlertFilter, AlertRule, Backup, CheckIntegrations, ClusterRef,
    ConfigEntry, ConnectorInfo, ConnectorPayload, ConnectorTask, HealthChecks, HttpCheck,
    IntegrationDefinition, IntegrationRoute, IntegrationRouting, Integrations, LogCollector,
    RepairSettings, RouteType, SchemaPayload, SchemaReference, SchemaVersion, ShellCheck,
    TcpCheck, TopicConfigUpdate, TopicInfo, TopicPayload,
};
