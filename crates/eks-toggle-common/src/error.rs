//! Error types for eks-toggle
//!
//! Errors carry structured context (cluster name, provider, field) so the
//! server-side log has everything needed to debug a failed toggle. What the
//! caller sees is a separate, sanitized message built by
//! [`Error::public_message`].

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for toggle operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing request input
    #[error("validation error for {field}: {message}")]
    Validation {
        /// Request field that failed validation (e.g. "cpu-limit")
        field: String,
        /// Description of what's invalid
        message: String,
    },

    /// Static configuration does not cover the request, or a descriptor is unusable
    #[error("configuration error for {cluster}: {message}")]
    Configuration {
        /// Cluster the configuration problem concerns
        cluster: String,
        /// Description of what's missing or malformed
        message: String,
    },

    /// Token minting or control-plane client construction failed
    #[error("authentication error for {cluster}: {message}")]
    Authentication {
        /// Cluster the credential was minted for
        cluster: String,
        /// Description of what failed
        message: String,
    },

    /// A remote provider call failed (EKS or Kubernetes)
    #[error("provider error [{provider}] for {cluster}: {message}")]
    Provider {
        /// Cluster the call targeted
        cluster: String,
        /// Provider label ("eks", "kubernetes")
        provider: String,
        /// Description of what failed
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The document kind being processed (if known)
        kind: Option<String>,
    },
}

/// Coarse classification used to pick status codes and public messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request input
    Validation,
    /// Configuration does not cover the request
    Configuration,
    /// Credential could not be produced or used
    Authentication,
    /// Remote API call failed
    Provider,
    /// Anything else
    Internal,
}

impl Error {
    /// Create a validation error for a request field
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error without cluster context
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            cluster: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
        }
    }

    /// Create a configuration error with cluster context
    pub fn configuration_for(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Configuration {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create an authentication error with cluster context
    pub fn authentication_for(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Authentication {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create a provider error with full context
    pub fn provider_for(
        cluster: impl Into<String>,
        provider: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Provider {
            cluster: cluster.into(),
            provider: provider.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with document kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Provider { .. } => ErrorKind::Provider,
            Error::Serialization { .. } => ErrorKind::Internal,
        }
    }

    /// Get the cluster name if this error is associated with a specific cluster
    pub fn cluster(&self) -> Option<&str> {
        match self {
            Error::Configuration { cluster, .. }
            | Error::Authentication { cluster, .. }
            | Error::Provider { cluster, .. } => Some(cluster),
            _ => None,
        }
    }

    /// Get the provider label if this is a provider error
    pub fn provider(&self) -> Option<&str> {
        match self {
            Error::Provider { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Validation and configuration messages are returned verbatim; they only
    /// echo request input and configuration keys. Everything else collapses to
    /// a fixed phrase so provider and credential details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Error::Validation { message, .. } => message.clone(),
            Error::Configuration { message, .. } => message.clone(),
            Error::Authentication { cluster, .. } => {
                format!("could not authenticate to cluster '{}'", cluster)
            }
            Error::Provider {
                cluster, provider, ..
            } => format!("{} request for cluster '{}' failed", provider, cluster),
            Error::Serialization { .. } => "unexpected internal error".to_string(),
        }
    }
}
