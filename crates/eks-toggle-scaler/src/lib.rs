//! Cluster scale toggle
//!
//! Pauses or resumes Karpenter on an EKS cluster in two independent steps:
//!
//! - [`policy`] - merge-patches the NodePool CPU limit through the control plane
//! - [`capacity`] - resizes the managed node group hosting Karpenter
//!
//! [`orchestrator`] sequences both and maps the outcome to a [`ToggleResult`].
//! [`eks`] and [`backend`] hold the provider seams.

#![deny(missing_docs)]

pub mod backend;
pub mod capacity;
pub mod eks;
pub mod orchestrator;
pub mod policy;

pub use backend::{AwsRegionBackend, RegionBackend, RegionClients};
pub use eks::{ClusterApi, EksClusterApi, NodeGroupScaling};
pub use orchestrator::{
    ClusterListing, Outcome, ScaleIntent, ScaleOrchestrator, ToggleRequest, ToggleResult,
};
pub use policy::{ControlPlaneConnector, EksControlPlaneConnector, KubeNodePoolApi, NodePoolApi};
