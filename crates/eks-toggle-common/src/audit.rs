//! Intent log for toggle operations.
//!
//! The policy patch and the node-group resize cannot be applied atomically,
//! so every toggle records what it is about to do before touching anything,
//! and what actually happened afterwards. An operator reconciling a partial
//! failure reads these records to see which half landed.
//!
//! Recording is **fire-and-forget**: a recorder that fails logs a warning and
//! never fails the toggle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Tracing target used for audit records
pub const AUDIT_TARGET: &str = "audit";

/// Which point of the toggle a record describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStage {
    /// Written before any mutation
    Intent,
    /// Written after both steps were attempted
    Completed,
}

/// One audit record
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRecord {
    /// Correlates the intent and completion records of one invocation
    pub invocation_id: Uuid,
    /// Stage of the toggle
    pub stage: IntentStage,
    /// When the record was produced
    pub recorded_at: DateTime<Utc>,
    /// Target cluster
    pub cluster: String,
    /// Target region
    pub region: String,
    /// Managed node group being resized
    pub node_group: String,
    /// Requested CPU limit
    pub cpu_limit: u64,
    /// Requested desired node-group size
    pub desired_size: i32,
    /// Policy patch result (completion only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_applied: Option<bool>,
    /// Node-group resize result (completion only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_applied: Option<bool>,
}

impl IntentRecord {
    /// Derive the completion record from this intent
    pub fn completed(&self, policy_applied: bool, capacity_applied: bool) -> Self {
        Self {
            stage: IntentStage::Completed,
            recorded_at: Utc::now(),
            policy_applied: Some(policy_applied),
            capacity_applied: Some(capacity_applied),
            ..self.clone()
        }
    }
}

/// Sink for audit records.
#[async_trait]
pub trait IntentRecorder: Send + Sync {
    /// Persist one record. Never fails.
    async fn record(&self, record: &IntentRecord);
}

/// Writes records as structured log events under the `audit` target
pub struct TracingIntentRecorder;

#[async_trait]
impl IntentRecorder for TracingIntentRecorder {
    async fn record(&self, record: &IntentRecord) {
        match serde_json::to_string(record) {
            Ok(json) => info!(
                target: AUDIT_TARGET,
                invocation_id = %record.invocation_id,
                stage = ?record.stage,
                cluster = %record.cluster,
                record = %json,
                "toggle audit record"
            ),
            Err(e) => warn!(
                invocation_id = %record.invocation_id,
                error = %e,
                "Failed to serialize audit record"
            ),
        }
    }
}

/// No-op recorder for tests.
pub struct NoopIntentRecorder;

#[async_trait]
impl IntentRecorder for NoopIntentRecorder {
    async fn record(&self, _record: &IntentRecord) {}
}
