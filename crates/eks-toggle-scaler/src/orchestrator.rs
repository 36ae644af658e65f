//! Toggle orchestration
//!
//! Validates a request, resolves its node group, describes the cluster and
//! then runs the policy patch and the node-group resize. Both steps are
//! always attempted; the result reports which of them landed.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use eks_toggle_common::audit::{IntentRecord, IntentRecorder, IntentStage};
use eks_toggle_common::{Error, ToggleConfig};

use crate::backend::RegionBackend;
use crate::capacity::{reconcile_capacity, scaling_for};
use crate::policy::apply_cpu_limit;

/// Raw toggle request as received from the trigger
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ToggleRequest {
    /// Target cluster
    #[serde(rename = "cluster-name")]
    pub cluster_name: Option<String>,
    /// Requested CPU limit, as sent
    #[serde(rename = "cpu-limit")]
    pub cpu_limit: Option<String>,
    /// Target region
    pub region: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Validated toggle request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaleIntent {
    /// Target cluster
    pub cluster_name: String,
    /// Target region
    pub region: String,
    /// CPU limit; zero pauses Karpenter
    pub cpu_limit: u64,
}

impl ScaleIntent {
    /// Validate `request`, falling back to `default_region`.
    ///
    /// `cpu-limit` is checked before `cluster-name`. Blank values count as
    /// missing.
    pub fn from_request(request: &ToggleRequest, default_region: &str) -> Result<Self, Error> {
        let cpu_limit = present(&request.cpu_limit)
            .ok_or_else(|| Error::validation("cpu-limit", "cpu-limit is required"))?;
        let cluster_name = present(&request.cluster_name)
            .ok_or_else(|| Error::validation("cluster-name", "cluster-name is required"))?;
        let cpu_limit = cpu_limit.parse::<u64>().map_err(|_| {
            Error::validation("cpu-limit", "cpu-limit must be a non-negative integer")
        })?;

        Ok(Self {
            cluster_name: cluster_name.to_string(),
            region: present(&request.region)
                .unwrap_or(default_region)
                .to_string(),
            cpu_limit,
        })
    }

    /// Whether this intent resumes Karpenter
    pub fn scale_up(&self) -> bool {
        self.cpu_limit > 0
    }

    fn state(&self) -> &'static str {
        if self.scale_up() {
            "resumed"
        } else {
            "paused"
        }
    }
}

/// Outcome class of a toggle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Both steps applied
    Success,
    /// Exactly one step applied
    PartialFailure,
    /// Nothing applied
    Failure,
    /// Request rejected before any side effect
    InvalidRequest,
}

/// Caller-facing result of a toggle
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToggleResult {
    /// Whether both steps applied
    pub success: bool,
    /// Outcome class
    pub outcome: Outcome,
    /// Sanitized human-readable message
    pub message: String,
    /// HTTP status code
    pub status: u16,
}

impl ToggleResult {
    fn invalid(error: &Error) -> Self {
        Self {
            success: false,
            outcome: Outcome::InvalidRequest,
            message: error.public_message(),
            status: 400,
        }
    }

    fn failed(intent: &ScaleIntent, error: &Error) -> Self {
        Self {
            success: false,
            outcome: Outcome::Failure,
            message: format!(
                "Failed to scale cluster '{}' to cpu limit {}: {}",
                intent.cluster_name,
                intent.cpu_limit,
                error.public_message()
            ),
            status: 500,
        }
    }

    fn from_steps(intent: &ScaleIntent, policy_applied: bool, capacity_applied: bool) -> Self {
        match (policy_applied, capacity_applied) {
            (true, true) => Self {
                success: true,
                outcome: Outcome::Success,
                message: format!(
                    "Karpenter NodePool '{}' cpu set to {}. Karpenter {}.",
                    intent.cluster_name,
                    intent.cpu_limit,
                    intent.state()
                ),
                status: 200,
            },
            (false, false) => Self {
                success: false,
                outcome: Outcome::Failure,
                message: format!(
                    "Failed to scale cluster '{}' to cpu limit {}: neither the cpu limit nor the node group was updated",
                    intent.cluster_name, intent.cpu_limit
                ),
                status: 500,
            },
            (policy, capacity) => Self {
                success: false,
                outcome: Outcome::PartialFailure,
                message: format!(
                    "Partial failure for cluster '{}': cpu limit {} {}, node group {}. Karpenter not fully {}.",
                    intent.cluster_name,
                    intent.cpu_limit,
                    if policy { "applied" } else { "not applied" },
                    if capacity { "resized" } else { "not resized" },
                    intent.state()
                ),
                status: 500,
            },
        }
    }
}

/// One cluster of a region listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterListing {
    /// Cluster name
    pub name: String,
    /// Whether a node group is configured for it
    pub toggleable: bool,
    /// Configured node group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_group: Option<String>,
}

/// Composes the policy patch and the node-group resize into a toggle
pub struct ScaleOrchestrator {
    config: Arc<ToggleConfig>,
    backend: Arc<dyn RegionBackend>,
    recorder: Arc<dyn IntentRecorder>,
}

impl ScaleOrchestrator {
    /// Create an orchestrator
    pub fn new(
        config: Arc<ToggleConfig>,
        backend: Arc<dyn RegionBackend>,
        recorder: Arc<dyn IntentRecorder>,
    ) -> Self {
        Self {
            config,
            backend,
            recorder,
        }
    }

    /// Loaded configuration
    pub fn config(&self) -> &ToggleConfig {
        &self.config
    }

    /// Run one toggle. Never fails; every problem is folded into the result.
    #[instrument(skip(self))]
    pub async fn toggle(&self, request: &ToggleRequest) -> ToggleResult {
        let intent = match ScaleIntent::from_request(request, &self.config.default_region) {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "Rejected toggle request");
                return ToggleResult::invalid(&e);
            }
        };

        match self.run(&intent).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    cluster = %intent.cluster_name,
                    region = %intent.region,
                    kind = ?e.kind(),
                    provider = e.provider().unwrap_or("-"),
                    error = %e,
                    "Toggle failed before any change"
                );
                ToggleResult::failed(&intent, &e)
            }
        }
    }

    async fn run(&self, intent: &ScaleIntent) -> Result<ToggleResult, Error> {
        let node_group = self.config.clusters.resolve(&intent.cluster_name)?;

        let clients = self.backend.connect(&intent.region).await?;
        let descriptor = clients
            .clusters
            .describe_cluster(&intent.cluster_name)
            .await?;

        let record = IntentRecord {
            invocation_id: Uuid::new_v4(),
            stage: IntentStage::Intent,
            recorded_at: Utc::now(),
            cluster: intent.cluster_name.clone(),
            region: intent.region.clone(),
            node_group: node_group.to_string(),
            cpu_limit: intent.cpu_limit,
            desired_size: scaling_for(intent.scale_up()).desired_size,
            policy_applied: None,
            capacity_applied: None,
        };
        self.recorder.record(&record).await;

        let policy_applied = apply_cpu_limit(
            clients.control_plane.as_ref(),
            &descriptor,
            &self.config.node_pool.name,
            intent.cpu_limit,
        )
        .await;
        let capacity_applied = reconcile_capacity(
            clients.clusters.as_ref(),
            &intent.cluster_name,
            node_group,
            intent.scale_up(),
        )
        .await;

        self.recorder
            .record(&record.completed(policy_applied, capacity_applied))
            .await;

        let result = ToggleResult::from_steps(intent, policy_applied, capacity_applied);
        info!(
            cluster = %intent.cluster_name,
            cpu_limit = intent.cpu_limit,
            policy_applied,
            capacity_applied,
            outcome = ?result.outcome,
            "Toggle finished"
        );
        Ok(result)
    }

    /// List clusters in `region` (default region when `None`) and mark the
    /// ones with a configured node group.
    #[instrument(skip(self))]
    pub async fn list_clusters(&self, region: Option<&str>) -> Result<Vec<ClusterListing>, Error> {
        let region = region
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.config.default_region);
        let clients = self.backend.connect(region).await?;
        let mut names = clients.clusters.list_clusters().await?;
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| {
                let node_group = self.config.clusters.resolve(&name).ok().map(String::from);
                ClusterListing {
                    toggleable: node_group.is_some(),
                    node_group,
                    name,
                }
            })
            .collect())
    }
}
