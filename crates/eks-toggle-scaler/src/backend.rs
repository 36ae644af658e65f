//! Per-region provider clients
//!
//! Nothing is cached between invocations: every toggle loads a fresh SDK
//! config for its region and drops the clients when it finishes.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use eks_toggle_auth::TokenMinter;
use eks_toggle_common::{Error, NodePoolRef};

use crate::eks::{ClusterApi, EksClusterApi};
use crate::policy::{ControlPlaneConnector, EksControlPlaneConnector};

/// Clients for one region, owned by a single invocation
pub struct RegionClients {
    /// EKS API
    pub clusters: Box<dyn ClusterApi>,
    /// Control-plane access for NodePool patches
    pub control_plane: Box<dyn ControlPlaneConnector>,
}

/// Factory for [`RegionClients`]
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegionBackend: Send + Sync {
    /// Build clients for `region`
    async fn connect(&self, region: &str) -> Result<RegionClients, Error>;
}

/// AWS-backed [`RegionBackend`] using the ambient credential chain
pub struct AwsRegionBackend {
    node_pool: NodePoolRef,
}

impl AwsRegionBackend {
    /// Create a backend patching the NodePool resource `node_pool`
    pub fn new(node_pool: NodePoolRef) -> Self {
        Self { node_pool }
    }
}

#[async_trait]
impl RegionBackend for AwsRegionBackend {
    async fn connect(&self, region: &str) -> Result<RegionClients, Error> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let credentials = sdk_config.credentials_provider().ok_or_else(|| {
            Error::authentication_for(region, "no AWS credentials provider configured")
        })?;

        debug!(region = %region, "Loaded AWS config");

        Ok(RegionClients {
            clusters: Box::new(EksClusterApi::new(&sdk_config, region)),
            control_plane: Box::new(EksControlPlaneConnector::new(
                TokenMinter::new(credentials),
                self.node_pool.clone(),
            )),
        })
    }
}
