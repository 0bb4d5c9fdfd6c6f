//! Error types for reconciliation.

use crate::merge::MergeError;
use crate::types::{Kind, LifecycleState, Verb};
use gateway::ClusterRef;

/// Result type alias for reconciliation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reconciling a resource.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The import id has the wrong number of segments.
    #[error(
        "invalid import id '{id}' for {kind}: expected {expected} segments ({format}), got {found}"
    )]
    InvalidImportId {
        kind: Kind,
        id: String,
        /// The kind's import format, e.g. `cluster/topic`.
        format: String,
        expected: usize,
        found: usize,
    },

    /// One import id segment is empty.
    #[error("invalid import id '{id}' for {kind}: segment '{segment}' is empty")]
    EmptyImportSegment {
        kind: Kind,
        id: String,
        segment: &'static str,
    },

    /// Invalid configuration, detected before any remote call.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A spec that does not describe a valid resource.
    #[error("invalid {kind} spec: {message}")]
    InvalidSpec { kind: Kind, message: String },

    /// Import or lookup target does not exist remotely.
    #[error("{kind} '{key}' not found on cluster {cluster}")]
    NotFound {
        kind: Kind,
        cluster: ClusterRef,
        key: String,
    },

    /// Update attempted to change an immutable field.
    #[error("{kind} field '{field}' cannot be changed ({from} -> {to})")]
    ImmutableField {
        kind: Kind,
        field: &'static str,
        from: String,
        to: String,
    },

    /// Lifecycle verb not allowed from the record's current state.
    #[error("cannot {verb} {kind} in state {state}")]
    InvalidState {
        verb: Verb,
        kind: Kind,
        state: LifecycleState,
    },

    /// Collection merge rejected the change.
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Remote call failed.
    #[error(transparent)]
    Gateway(#[from] gateway::Error),

    /// A failure localized to one resource and operation.
    #[error("{verb} {kind} {identity} on {cluster}: {source}")]
    Operation {
        verb: Verb,
        kind: Kind,
        cluster: ClusterRef,
        identity: String,
        source: Box<Error>,
    },

    /// Delete-then-create update removed the old object but could not
    /// create the new one. The old object is gone remotely.
    #[error(
        "update {kind} {identity} on {cluster}: old object deleted but replacement failed: {source}"
    )]
    PartialReplace {
        kind: Kind,
        cluster: ClusterRef,
        identity: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid-spec error.
    pub fn invalid_spec(kind: Kind, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            kind,
            message: message.into(),
        }
    }

    /// The innermost error, past any operation context.
    pub fn root(&self) -> &Self {
        match self {
            Self::Operation { source, .. } | Self::PartialReplace { source, .. } => source.root(),
            other => other,
        }
    }

    /// The gateway error underneath, if the failure came from a remote call.
    pub fn gateway_error(&self) -> Option<&gateway::Error> {
        match self.root() {
            Self::Gateway(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the target is missing, locally or remotely.
    pub fn is_not_found(&self) -> bool {
        match self.root() {
            Self::NotFound { .. } => true,
            Self::Gateway(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Whether an update left the remote object deleted.
    pub fn is_partial_replace(&self) -> bool {
        match self {
            Self::PartialReplace { .. } => true,
            Self::Operation { source, .. } => source.is_partial_replace(),
            _ => false,
        }
    }

    /// Whether the error was raised before any remote call.
    pub fn is_config(&self) -> bool {
        matches!(
            self.root(),
            Self::InvalidImportId { .. }
                | Self::EmptyImportSegment { .. }
                | Self::Config(_)
                | Self::InvalidSpec { .. }
                | Self::ImmutableField { .. }
                | Self::InvalidState { .. }
        )
    }

    pub(crate) fn in_operation(
        self,
        verb: Verb,
        kind: Kind,
        cluster: &ClusterRef,
        identity: &str,
    ) -> Self {
        Self::Operation {
            verb,
            kind,
            cluster: cluster.clone(),
            identity: identity.to_string(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_keeps_remote_status_and_body() {
        let remote = gateway::Error::remote("POST", "https://h/api/v1/acme/kafka/prod/acls", 400, "bad principal");
        let err = Error::from(remote).in_operation(
            Verb::Create,
            Kind::Acl,
            &ClusterRef::kafka("prod"),
            "TOPIC/orders",
        );

        let display = err.to_string();
        assert!(display.starts_with("create acl TOPIC/orders on kafka/prod"));
        assert!(display.contains("400"));
        assert!(display.contains("bad principal"));
        assert_eq!(err.gateway_error().and_then(gateway::Error::status), Some(400));
    }

    #[test]
    fn test_not_found_through_context() {
        let remote = gateway::Error::remote("DELETE", "https://h/x", 404, "");
        let err = Error::from(remote).in_operation(
            Verb::Delete,
            Kind::Topic,
            &ClusterRef::kafka("prod"),
            "orders",
        );
        assert!(err.is_not_found());
        assert!(!err.is_config());
    }

    #[test]
    fn test_config_classification() {
        let err = Error::InvalidImportId {
            kind: Kind::Topic,
            id: "prod".to_string(),
            format: "cluster/topic".to_string(),
            expected: 2,
            found: 1,
        };
        assert!(err.is_config());
        assert!(err.to_string().contains("expected 2 segments"));
    }
}
