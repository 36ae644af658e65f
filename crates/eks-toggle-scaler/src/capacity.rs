//! Managed node-group resizing
//!
//! Karpenter runs on a small managed node group. Pausing drains it to zero;
//! resuming brings it back to two nodes. The bounds never change.

use tracing::{error, info};

use crate::eks::{ClusterApi, NodeGroupScaling};

/// Minimum size of the Karpenter node group
pub const MIN_SIZE: i32 = 0;
/// Maximum size of the Karpenter node group
pub const MAX_SIZE: i32 = 10;
/// Desired size when Karpenter is resumed
pub const RESUME_DESIRED_SIZE: i32 = 2;
/// Desired size when Karpenter is paused
pub const PAUSE_DESIRED_SIZE: i32 = 0;

/// Scaling config for a resume (`scale_up`) or pause
pub fn scaling_for(scale_up: bool) -> NodeGroupScaling {
    NodeGroupScaling {
        min_size: MIN_SIZE,
        max_size: MAX_SIZE,
        desired_size: if scale_up {
            RESUME_DESIRED_SIZE
        } else {
            PAUSE_DESIRED_SIZE
        },
    }
}

/// Resize `node_group` of `cluster`. Returns whether the provider accepted it.
pub async fn reconcile_capacity(
    api: &dyn ClusterApi,
    cluster: &str,
    node_group: &str,
    scale_up: bool,
) -> bool {
    let scaling = scaling_for(scale_up);
    match api
        .update_nodegroup_scaling(cluster, node_group, scaling)
        .await
    {
        Ok(update_id) => {
            info!(
                cluster = %cluster,
                node_group = %node_group,
                desired_size = scaling.desired_size,
                update_id = update_id.as_deref().unwrap_or("-"),
                "Node group resize requested"
            );
            true
        }
        Err(e) => {
            error!(
                cluster = %cluster,
                node_group = %node_group,
                desired_size = scaling.desired_size,
                error = %e,
                "Failed to resize node group"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use eks_toggle_common::{Error, PROVIDER_EKS};

    use super::*;
    use crate::eks::MockClusterApi;

    type Calls = Arc<Mutex<Vec<(String, String, NodeGroupScaling)>>>;

    fn capturing_api(result: Result<Option<String>, Error>) -> (MockClusterApi, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let captured = calls.clone();
        let mut api = MockClusterApi::new();
        api.expect_update_nodegroup_scaling()
            .times(1)
            .return_once(move |cluster, node_group, scaling| {
                captured.lock().unwrap().push((
                    cluster.to_string(),
                    node_group.to_string(),
                    scaling,
                ));
                result
            });
        (api, calls)
    }

    // ==========================================================================
    // Story: only the sign of the cpu limit picks the desired size
    // ==========================================================================

    #[test]
    fn resume_wants_two_nodes_within_static_bounds() {
        assert_eq!(
            scaling_for(true),
            NodeGroupScaling {
                min_size: 0,
                max_size: 10,
                desired_size: 2
            }
        );
    }

    #[test]
    fn pause_wants_zero_nodes_within_static_bounds() {
        assert_eq!(
            scaling_for(false),
            NodeGroupScaling {
                min_size: 0,
                max_size: 10,
                desired_size: 0
            }
        );
    }

    #[tokio::test]
    async fn resize_targets_mapped_node_group() {
        let (api, calls) = capturing_api(Ok(Some("update-1".to_string())));

        assert!(reconcile_capacity(&api, "eks-simulation-hpa", "ng-hpa", true).await);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "eks-simulation-hpa");
        assert_eq!(calls[0].1, "ng-hpa");
        assert_eq!(calls[0].2.desired_size, 2);
    }

    #[tokio::test]
    async fn resize_without_update_id_still_succeeds() {
        let (api, _) = capturing_api(Ok(None));
        assert!(reconcile_capacity(&api, "c", "ng", false).await);
    }

    // ==========================================================================
    // Story: provider errors are reported, never retried
    // ==========================================================================

    #[tokio::test]
    async fn provider_error_fails_step_after_one_attempt() {
        let (api, calls) = capturing_api(Err(Error::provider_for(
            "c",
            PROVIDER_EKS,
            "ResourceInUseException",
        )));

        assert!(!reconcile_capacity(&api, "c", "ng", false).await);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }
}
