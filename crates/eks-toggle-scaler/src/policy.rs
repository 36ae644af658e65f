//! Karpenter NodePool CPU-limit patching
//!
//! The limit lives at `spec.limits.cpu` of a cluster-scoped custom object.
//! One merge patch per invocation, then the value the API server returns is
//! checked against the request. Every failure is logged here and reported to
//! the caller as `false`; nothing propagates past [`apply_cpu_limit`].

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info};

#[cfg(test)]
use mockall::automock;

use eks_toggle_auth::{client_for_cluster, TokenMinter};
use eks_toggle_common::{ClusterDescriptor, Error, NodePoolRef, PROVIDER_KUBERNETES};

/// JSON pointer to the CPU limit inside a NodePool
const CPU_LIMIT_POINTER: &str = "/spec/limits/cpu";

/// Trait abstracting NodePool writes on one cluster's control plane
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodePoolApi: Send + Sync {
    /// Merge-patch the CPU limit of NodePool `name`.
    ///
    /// # Returns
    ///
    /// The CPU limit carried by the object the API server returned, if it
    /// could be read as an integer
    async fn patch_cpu_limit(&self, name: &str, cpu_limit: u64) -> Result<Option<u64>, Error>;
}

/// Trait abstracting how a control-plane client is obtained for a cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ControlPlaneConnector: Send + Sync {
    /// Authenticate to `cluster` and return a NodePool API bound to it
    async fn connect(&self, cluster: &ClusterDescriptor) -> Result<Box<dyn NodePoolApi>, Error>;
}

/// Merge patch setting `spec.limits.cpu`
pub fn cpu_limit_patch(cpu_limit: u64) -> Value {
    json!({ "spec": { "limits": { "cpu": cpu_limit } } })
}

/// Read `spec.limits.cpu` from a NodePool body.
///
/// The API server may hand the limit back as a number or as a quantity
/// string; only plain integers are understood.
pub fn read_cpu_limit(object: &Value) -> Option<u64> {
    match object.pointer(CPU_LIMIT_POINTER)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// kube-rs implementation of [`NodePoolApi`]
pub struct KubeNodePoolApi {
    api: Api<DynamicObject>,
    cluster: String,
}

impl KubeNodePoolApi {
    /// Bind to the NodePool resource described by `node_pool` on `client`
    pub fn new(client: Client, cluster: &str, node_pool: &NodePoolRef) -> Self {
        let gvk = GroupVersionKind::gvk(&node_pool.group, &node_pool.version, &node_pool.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &node_pool.plural);
        Self {
            api: Api::all_with(client, &resource),
            cluster: cluster.to_string(),
        }
    }
}

#[async_trait]
impl NodePoolApi for KubeNodePoolApi {
    async fn patch_cpu_limit(&self, name: &str, cpu_limit: u64) -> Result<Option<u64>, Error> {
        let patch = cpu_limit_patch(cpu_limit);
        let patched = self
            .api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| {
                Error::provider_for(
                    &self.cluster,
                    PROVIDER_KUBERNETES,
                    format!("patch of NodePool {} failed: {}", name, e),
                )
            })?;
        Ok(read_cpu_limit(&patched.data))
    }
}

/// Connects to EKS control planes with a freshly minted token
pub struct EksControlPlaneConnector {
    minter: TokenMinter,
    node_pool: NodePoolRef,
}

impl EksControlPlaneConnector {
    /// Create a connector minting tokens with `minter`
    pub fn new(minter: TokenMinter, node_pool: NodePoolRef) -> Self {
        Self { minter, node_pool }
    }
}

#[async_trait]
impl ControlPlaneConnector for EksControlPlaneConnector {
    async fn connect(&self, cluster: &ClusterDescriptor) -> Result<Box<dyn NodePoolApi>, Error> {
        let client = client_for_cluster(&self.minter, cluster).await?;
        Ok(Box::new(KubeNodePoolApi::new(
            client,
            &cluster.name,
            &self.node_pool,
        )))
    }
}

async fn patch_and_verify(
    connector: &dyn ControlPlaneConnector,
    cluster: &ClusterDescriptor,
    node_pool: &str,
    cpu_limit: u64,
) -> Result<(), Error> {
    let api = connector.connect(cluster).await?;
    let observed = api.patch_cpu_limit(node_pool, cpu_limit).await?;
    debug!(cluster = %cluster.name, node_pool = %node_pool, ?observed, "NodePool patched");

    match observed {
        Some(value) if value == cpu_limit => Ok(()),
        Some(value) => Err(Error::provider_for(
            &cluster.name,
            PROVIDER_KUBERNETES,
            format!(
                "NodePool {} reports cpu limit {} after patch, expected {}",
                node_pool, value, cpu_limit
            ),
        )),
        None => Err(Error::provider_for(
            &cluster.name,
            PROVIDER_KUBERNETES,
            format!("NodePool {} has no readable cpu limit after patch", node_pool),
        )),
    }
}

/// Set the CPU limit of NodePool `node_pool` on `cluster`.
///
/// Returns whether the limit is now in place.
pub async fn apply_cpu_limit(
    connector: &dyn ControlPlaneConnector,
    cluster: &ClusterDescriptor,
    node_pool: &str,
    cpu_limit: u64,
) -> bool {
    match patch_and_verify(connector, cluster, node_pool, cpu_limit).await {
        Ok(()) => {
            info!(
                cluster = %cluster.name,
                node_pool = %node_pool,
                cpu_limit,
                "NodePool cpu limit applied"
            );
            true
        }
        Err(e) => {
            error!(
                cluster = %cluster.name,
                node_pool = %node_pool,
                cpu_limit,
                kind = ?e.kind(),
                provider = e.provider().unwrap_or("-"),
                error = %e,
                "Failed to apply NodePool cpu limit"
            );
            false
        }
    }
}
