//! Core types for managed resources

use gateway::ClusterRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource kinds under declarative control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    Topic,
    Acl,
    Connector,
    Schema,
    TcpCheck,
    HttpCheck,
    ShellCheck,
    LogCollector,
    Backup,
    RepairPolicy,
    AlertRule,
    AlertRoute,
}

impl Kind {
    pub const ALL: [Kind; 12] = [
        Self::Topic,
        Self::Acl,
        Self::Connector,
        Self::Schema,
        Self::TcpCheck,
        Self::HttpCheck,
        Self::ShellCheck,
        Self::LogCollector,
        Self::Backup,
        Self::RepairPolicy,
        Self::AlertRule,
        Self::AlertRoute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Acl => "acl",
            Self::Connector => "connector",
            Self::Schema => "schema",
            Self::TcpCheck => "tcp-check",
            Self::HttpCheck => "http-check",
            Self::ShellCheck => "shell-check",
            Self::LogCollector => "log-collector",
            Self::Backup => "backup",
            Self::RepairPolicy => "repair-policy",
            Self::AlertRule => "alert-rule",
            Self::AlertRoute => "alert-route",
        }
    }

    /// Whether the remote representation is one shared array per cluster
    pub fn is_array_backed(&self) -> bool {
        matches!(
            self,
            Self::TcpCheck | Self::HttpCheck | Self::ShellCheck | Self::LogCollector
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown resource kind: {s}"))
    }
}

/// How a managed resource is identified on the remote system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "kebab-case")]
pub enum Identity {
    /// UUID generated by this client before the create call
    Generated(String),
    /// Id assigned (or reassigned) by the server
    Server(String),
    /// The resource's own attributes are its identity
    Natural(String),
}

impl Identity {
    /// Fresh client-side UUID
    pub fn generate() -> Self {
        Self::Generated(uuid::Uuid::new_v4().to_string())
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Generated(v) | Self::Server(v) | Self::Natural(v) => v,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Lifecycle state of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Desired record exists locally; no remote counterpart confirmed
    Planned,
    /// Exists locally and remotely, fields in sync
    Present,
    /// Exists remotely but differs from the last applied record
    Drifted,
    /// Deleted, or found missing remotely
    Absent,
}

impl LifecycleState {
    /// States from which read, update and delete are allowed
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Present | Self::Drifted)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Planned => "planned",
            Self::Present => "present",
            Self::Drifted => "drifted",
            Self::Absent => "absent",
        };
        write!(f, "{name}")
    }
}

/// One remote object under declarative control
///
/// `spec` holds the desired (or last observed) fields; `computed` holds
/// values only the remote system populates and is never sent on writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedResource<S, C> {
    pub kind: Kind,
    pub cluster: ClusterRef,
    pub identity: Option<Identity>,
    pub spec: S,
    pub computed: C,
    pub state: LifecycleState,
}

impl<S, C: Default> ManagedResource<S, C> {
    /// A desired-state record with no remote counterpart yet
    pub fn planned(kind: Kind, cluster: ClusterRef, spec: S) -> Self {
        Self {
            kind,
            cluster,
            identity: None,
            spec,
            computed: C::default(),
            state: LifecycleState::Planned,
        }
    }
}

impl<S, C> ManagedResource<S, C> {
    /// Identity for messages; `-` until one is assigned
    pub fn label(&self) -> String {
        self.identity
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string)
    }
}

/// Result of a read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReadOutcome<S, C> {
    /// Still exists; the record carries the remote-observed values
    Present(ManagedResource<S, C>),
    /// Deleted outside our control; drop the local record
    Gone,
}

/// Lifecycle operations, for error context and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
    Import,
    Lookup,
    Discover,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
            Self::Lookup => "lookup",
            Self::Discover => "discover",
        };
        write!(f, "{name}")
    }
}
