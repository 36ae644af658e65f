//! EKS provider seam
//!
//! [`ClusterApi`] is the narrow slice of the EKS API the toggle needs.
//! [`EksClusterApi`] backs it with the AWS SDK; tests mock it.

use async_trait::async_trait;
use aws_sdk_eks::error::DisplayErrorContext;
use aws_sdk_eks::types::NodegroupScalingConfig;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use eks_toggle_common::{ClusterDescriptor, Error, PROVIDER_EKS};

/// Min/max/desired sizes for a managed node group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeGroupScaling {
    /// Minimum node count
    pub min_size: i32,
    /// Maximum node count
    pub max_size: i32,
    /// Desired node count
    pub desired_size: i32,
}

/// Trait abstracting the EKS operations used by the toggle
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Describe a cluster by name
    async fn describe_cluster(&self, name: &str) -> Result<ClusterDescriptor, Error>;

    /// Set the scaling config of a managed node group
    ///
    /// # Returns
    ///
    /// The provider's update id, when it reports one
    async fn update_nodegroup_scaling(
        &self,
        cluster: &str,
        node_group: &str,
        scaling: NodeGroupScaling,
    ) -> Result<Option<String>, Error>;

    /// List the names of all clusters in the region
    async fn list_clusters(&self) -> Result<Vec<String>, Error>;
}

/// AWS SDK implementation of [`ClusterApi`] for one region
pub struct EksClusterApi {
    client: aws_sdk_eks::Client,
    region: String,
}

impl EksClusterApi {
    /// Create a client from a region-scoped SDK config
    pub fn new(config: &aws_config::SdkConfig, region: &str) -> Self {
        Self {
            client: aws_sdk_eks::Client::new(config),
            region: region.to_string(),
        }
    }
}

#[async_trait]
impl ClusterApi for EksClusterApi {
    async fn describe_cluster(&self, name: &str) -> Result<ClusterDescriptor, Error> {
        let output = self
            .client
            .describe_cluster()
            .name(name)
            .send()
            .await
            .map_err(|e| {
                Error::provider_for(
                    name,
                    PROVIDER_EKS,
                    format!("describe cluster failed: {}", DisplayErrorContext(&e)),
                )
            })?;

        let cluster = output.cluster().ok_or_else(|| {
            Error::provider_for(name, PROVIDER_EKS, "describe cluster returned no cluster")
        })?;

        debug!(cluster = %name, status = ?cluster.status(), "Described cluster");

        Ok(ClusterDescriptor {
            name: cluster.name().unwrap_or(name).to_string(),
            region: self.region.clone(),
            endpoint: cluster.endpoint().map(String::from),
            certificate_authority: cluster
                .certificate_authority()
                .and_then(|ca| ca.data())
                .map(String::from),
            arn: cluster.arn().unwrap_or_default().to_string(),
        })
    }

    async fn update_nodegroup_scaling(
        &self,
        cluster: &str,
        node_group: &str,
        scaling: NodeGroupScaling,
    ) -> Result<Option<String>, Error> {
        let scaling_config = NodegroupScalingConfig::builder()
            .min_size(scaling.min_size)
            .max_size(scaling.max_size)
            .desired_size(scaling.desired_size)
            .build();

        let output = self
            .client
            .update_nodegroup_config()
            .cluster_name(cluster)
            .nodegroup_name(node_group)
            .scaling_config(scaling_config)
            .send()
            .await
            .map_err(|e| {
                Error::provider_for(
                    cluster,
                    PROVIDER_EKS,
                    format!(
                        "update node group {} failed: {}",
                        node_group,
                        DisplayErrorContext(&e)
                    ),
                )
            })?;

        Ok(output.update().and_then(|u| u.id()).map(String::from))
    }

    async fn list_clusters(&self) -> Result<Vec<String>, Error> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_clusters()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    Error::provider_for(
                        &self.region,
                        PROVIDER_EKS,
                        format!("list clusters failed: {}", DisplayErrorContext(&e)),
                    )
                })?;

            names.extend(output.clusters().iter().cloned());

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(names)
    }
}
