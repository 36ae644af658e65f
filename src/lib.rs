//! eks-toggle - pause and resume Karpenter on EKS clusters
//!
//! A single HTTP invocation sets the CPU limit of a cluster's Karpenter
//! NodePool and resizes the managed node group Karpenter runs on. A limit of
//! zero pauses Karpenter, any positive limit resumes it.
//!
//! # Crates
//!
//! - `eks-toggle-common` - errors, configuration, audit log, telemetry
//! - `eks-toggle-auth` - EKS token minting and in-memory kubeconfig
//! - `eks-toggle-scaler` - policy patch, node-group resize, orchestration
//!
//! # Modules
//!
//! - [`server`] - axum router for the local listener
//! - [`lambda`] - direct Lambda invocation handler
//! - [`error`] - front-door error type

#![deny(missing_docs)]

pub mod error;
pub mod lambda;
pub mod server;

#[cfg(test)]
mod testing;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Environment variable the Lambda runtime sets
pub const LAMBDA_RUNTIME_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// Default configuration file inside the Lambda package
pub const DEFAULT_CONFIG_PATH: &str = "/var/task/clusters.yaml";

/// Default local listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
