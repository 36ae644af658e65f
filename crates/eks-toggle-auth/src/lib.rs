//! Control-plane authentication for EKS clusters
//!
//! - [`token`] - mints the short-lived `k8s-aws-v1.` bearer token
//! - [`kubeconfig`] - turns a cluster descriptor and token into a kube client
//!
//! Both produce per-invocation values only. Nothing here caches a token or a
//! client, and nothing is written to disk.

#![deny(missing_docs)]

pub mod kubeconfig;
pub mod token;

pub use kubeconfig::{client_for_cluster, materialize};
pub use token::{mint_token, EphemeralCredential, TokenMinter, TOKEN_PREFIX, TOKEN_TTL};
