//! Common types for eks-toggle: errors, configuration, audit log, telemetry

#![deny(missing_docs)]

pub mod audit;
pub mod cluster;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod yaml;

pub use cluster::ClusterDescriptor;
pub use config::{NodeGroupTargets, NodePoolRef, ToggleConfig};
pub use error::{Error, ErrorKind};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Region used when a request does not name one
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// Provider label for EKS API errors
pub const PROVIDER_EKS: &str = "eks";

/// Provider label for Kubernetes control-plane errors
pub const PROVIDER_KUBERNETES: &str = "kubernetes";
