//! HTTP front door
//!
//! axum router for local use and for callers that speak HTTP. Direct Lambda
//! invocations go through [`crate::lambda`] and share the response types.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use eks_toggle_scaler::{ClusterListing, Outcome, ScaleOrchestrator, ToggleRequest, ToggleResult};

use crate::error::{Error, Result};

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    /// Toggle orchestrator
    pub orchestrator: Arc<ScaleOrchestrator>,
}

/// JSON body of a toggle response
#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    /// Visibility hint for chat clients; always "ephemeral"
    pub response_type: String,
    /// Human-readable result
    pub text: String,
    /// Outcome class
    pub outcome: String,
}

impl From<&ToggleResult> for ToggleResponse {
    fn from(result: &ToggleResult) -> Self {
        let outcome = match result.outcome {
            Outcome::Success => "success",
            Outcome::PartialFailure => "partial_failure",
            Outcome::Failure => "failure",
            Outcome::InvalidRequest => "invalid_request",
        };
        Self {
            response_type: "ephemeral".to_string(),
            text: result.message.clone(),
            outcome: outcome.to_string(),
        }
    }
}

/// Query of the cluster listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Region to list; defaults from configuration
    pub region: Option<String>,
}

/// JSON body of the cluster listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ClustersResponse {
    /// Region that was listed
    pub region: String,
    /// Clusters in the region
    pub clusters: Vec<ClusterEntry>,
}

/// One cluster of the listing
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEntry {
    /// Cluster name
    pub name: String,
    /// Whether the cluster can be toggled
    pub toggleable: bool,
    /// Node group resized on toggle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_group: Option<String>,
}

impl From<ClusterListing> for ClusterEntry {
    fn from(listing: ClusterListing) -> Self {
        Self {
            name: listing.name,
            toggleable: listing.toggleable,
            node_group: listing.node_group,
        }
    }
}

/// Build the router
///
/// Unmatched paths toggle, so stage-prefixed paths such as `/prod/toggle`
/// behave like `/toggle`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(toggle_handler))
        .route("/toggle", get(toggle_handler))
        .route("/clusters", get(clusters_handler))
        .route("/healthz", get(|| async { "ok" }))
        .fallback(toggle_handler)
        .with_state(state)
}

async fn toggle_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<ToggleRequest>, QueryRejection>,
) -> Response {
    let request = match query {
        Ok(Query(request)) => request,
        Err(rejection) => {
            return Error::from(eks_toggle_common::Error::validation(
                "query",
                rejection.body_text(),
            ))
            .into_response();
        }
    };

    let result = state.orchestrator.toggle(&request).await;
    let status =
        StatusCode::from_u16(result.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ToggleResponse::from(&result))).into_response()
}

async fn clusters_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ClustersResponse>> {
    list_clusters(&state, query.region).await.map(Json)
}

/// List the clusters of `region`, or of the default region when unset
pub async fn list_clusters(state: &AppState, region: Option<String>) -> Result<ClustersResponse> {
    let region = region
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| state.orchestrator.config().default_region.clone());

    let clusters = state.orchestrator.list_clusters(Some(&region)).await?;

    Ok(ClustersResponse {
        region,
        clusters: clusters.into_iter().map(ClusterEntry::from).collect(),
    })
}

/// Serve the router on `addr` until the process exits
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("failed to bind {}: {}", addr, e)))?;

    info!(addr = %addr, "Starting eks-toggle server");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| Error::Server(e.to_string()))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::testing::{test_state, Calls};

    use super::*;

    fn test_router(resize_fails: bool) -> (Router, Calls) {
        let (state, calls) = test_state(resize_fails);
        (router(state), calls)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        router: Router,
        uri: &str,
    ) -> (StatusCode, T) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    // ==========================================================================
    // Story: a chat slash command toggles a cluster
    // ==========================================================================

    #[tokio::test]
    async fn toggle_resumes_mapped_cluster() {
        let (router, calls) = test_router(false);

        let (status, body): (_, ToggleResponse) =
            get_json(router, "/toggle?cluster-name=eks-simulation-hpa&cpu-limit=5").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.response_type, "ephemeral");
        assert_eq!(body.outcome, "success");
        assert!(body.text.contains("5"));
        assert!(body.text.contains("resumed"));
        assert_eq!(
            calls.all(),
            vec![
                "connect ap-northeast-1".to_string(),
                "describe eks-simulation-hpa".to_string(),
                "patch default 5".to_string(),
                "resize eks-simulation-hpa eks-node-group-hpa-1-2024082300130146580000000f 2"
                    .to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn root_path_also_toggles() {
        let (router, _) = test_router(false);

        let (status, body): (_, ToggleResponse) = get_json(
            router,
            "/?cluster-name=eks-simulation-hpa&cpu-limit=0&region=ap-northeast-1",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.text.contains("paused"));
    }

    #[tokio::test]
    async fn missing_cluster_name_is_bad_request_without_calls() {
        let (router, calls) = test_router(false);

        let (status, body): (_, ToggleResponse) = get_json(router, "/toggle?cpu-limit=5").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.text, "cluster-name is required");
        assert_eq!(body.outcome, "invalid_request");
        assert!(calls.all().is_empty());
    }

    #[tokio::test]
    async fn missing_cpu_limit_is_bad_request_without_calls() {
        let (router, calls) = test_router(false);

        let (status, body): (_, ToggleResponse) =
            get_json(router, "/toggle?cluster-name=eks-simulation-hpa").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.text, "cpu-limit is required");
        assert!(calls.all().is_empty());
    }

    #[tokio::test]
    async fn unmapped_cluster_is_server_error() {
        let (router, calls) = test_router(false);

        let (status, body): (_, ToggleResponse) =
            get_json(router, "/toggle?cluster-name=scratch&cpu-limit=5").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.outcome, "failure");
        assert!(body.text.contains("scratch"));
        assert!(calls.all().is_empty());
    }

    #[tokio::test]
    async fn failed_resize_is_partial_failure() {
        let (router, _) = test_router(true);

        let (status, body): (_, ToggleResponse) =
            get_json(router, "/toggle?cluster-name=eks-simulation-hpa&cpu-limit=5").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.outcome, "partial_failure");
        assert!(!body.text.contains("throttled"));
    }

    #[tokio::test]
    async fn stage_prefixed_path_toggles() {
        let (router, calls) = test_router(false);

        let (status, body): (_, ToggleResponse) = get_json(
            router,
            "/prod/toggle?cluster-name=eks-simulation-hpa&cpu-limit=5",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.outcome, "success");
        assert!(body.text.contains("resumed"));
        assert_eq!(calls.all().len(), 4);
    }

    #[tokio::test]
    async fn malformed_query_is_json_bad_request_without_calls() {
        let (router, calls) = test_router(false);

        let (status, body): (_, ToggleResponse) = get_json(
            router,
            "/toggle?cluster-name=eks-simulation-hpa&cpu-limit=5&cpu-limit=6",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.response_type, "ephemeral");
        assert_eq!(body.outcome, "invalid_request");
        assert!(body.text.contains("cpu-limit"));
        assert!(calls.all().is_empty());
    }

    // ==========================================================================
    // Story: operators list what can be toggled
    // ==========================================================================

    #[tokio::test]
    async fn clusters_lists_default_region() {
        let (router, calls) = test_router(false);

        let (status, body): (_, ClustersResponse) = get_json(router, "/clusters").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.region, "ap-northeast-1");
        assert_eq!(body.clusters.len(), 2);
        assert!(body.clusters[0].toggleable);
        assert!(!body.clusters[1].toggleable);
        assert_eq!(calls.all()[0], "connect ap-northeast-1");
    }

    #[tokio::test]
    async fn clusters_honours_region_query() {
        let (router, calls) = test_router(false);

        let (_, body): (_, ClustersResponse) = get_json(router, "/clusters?region=us-west-2").await;

        assert_eq!(body.region, "us-west-2");
        assert_eq!(calls.all()[0], "connect us-west-2");
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (router, _) = test_router(false);
        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
