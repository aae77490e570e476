//! Error types for the redis-fleet operator
//!
//! Errors carry the resource they concern so that a failed reconcile can be
//! traced back to a fleet or pod from the logs alone. The store layer maps
//! Kubernetes API responses onto the `NotFound`, `AlreadyExists` and
//! `Conflict` variants; the reconciler decides which of those are benign.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for redis-fleet operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error that does not map onto a more specific variant
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The addressed object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Resource kind (RedisFleet, Pod)
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
    },

    /// A create raced with another actor that created the same object
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        /// Resource kind (RedisFleet, Pod)
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
    },

    /// An update was rejected because the object changed since it was read
    #[error("conflict updating {kind} {namespace}/{name}: {message}")]
    Conflict {
        /// Resource kind (RedisFleet, Pod)
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// Invalid RedisFleet spec
    #[error("validation error for {fleet}: {message}")]
    Validation {
        /// Name of the fleet with invalid configuration
        fleet: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.replicas")
        field: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Where the error occurred (e.g., "reconciler", "startup")
        context: String,
    },
}

impl Error {
    /// Create a not-found error for the given object
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create an already-exists error for the given object
    pub fn already_exists(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a conflict error for the given object
    pub fn conflict(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            fleet: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with fleet context and field path
    pub fn validation_for_field(
        fleet: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            fleet: fleet.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Conflicts and transient API failures are retried by redelivering the
    /// trigger. Validation errors need a spec change; NotFound and
    /// AlreadyExists are normally absorbed by the reconciler and only reach
    /// this point when they are genuinely unexpected.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) => {
                    !(400..500).contains(&ae.code) || ae.code == 408 || ae.code == 429
                }
                _ => true,
            },
            Error::NotFound { .. } => false,
            Error::AlreadyExists { .. } => false,
            Error::Conflict { .. } => true,
            Error::Validation { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Label for metrics and logs
    pub fn kind_label(&self) -> &'static str {
        if self.is_retryable() {
            "transient"
        } else {
            "permanent"
        }
    }
}
