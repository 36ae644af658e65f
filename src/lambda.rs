//! Lambda runtime entry point
//!
//! Callers invoke the function directly with `{"queryStringParameters": {...}}`,
//! or route API Gateway and Function URL events to it, which carry the same
//! field. The reply is a proxy-style `{statusCode, headers, body}` object with
//! the JSON envelope serialized into `body`.

use std::collections::BTreeMap;

use lambda_http::lambda_runtime::{self, service_fn, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use eks_toggle_scaler::ToggleRequest;

use crate::error::{Error, Result};
use crate::server::{self, AppState, ToggleResponse};

const CLUSTERS_PATH: &str = "/clusters";
const HEALTHZ_PATH: &str = "/healthz";

/// Proxy-style invocation result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// JSON body, serialized
    pub body: String,
}

impl LambdaResponse {
    fn json<T: Serialize>(status_code: u16, body: &T) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            status_code,
            headers,
            body: serde_json::to_string(body).unwrap_or_default(),
        }
    }

    fn from_error(error: &Error) -> Self {
        Self::json(error.status().as_u16(), &error.envelope())
    }
}

/// Query parameters of an event; null or absent means none
///
/// Non-string scalars are accepted as their JSON text so `"cpu-limit": 5`
/// reads like `"cpu-limit": "5"`.
fn query_parameters(event: &Value) -> BTreeMap<String, String> {
    let Some(Value::Object(params)) = event.get("queryStringParameters") else {
        return BTreeMap::new();
    };

    params
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// Request path; HTTP API events carry `rawPath`, REST API events `path`
fn event_path(event: &Value) -> &str {
    event
        .get("rawPath")
        .or_else(|| event.get("path"))
        .and_then(Value::as_str)
        .unwrap_or("/")
}

/// Handle one invocation
pub async fn handle_event(state: &AppState, event: &Value) -> LambdaResponse {
    let mut params = query_parameters(event);
    let path = event_path(event).trim_end_matches('/');

    if path.ends_with(HEALTHZ_PATH) {
        return LambdaResponse::json(200, &"ok");
    }

    if path.ends_with(CLUSTERS_PATH) {
        return match server::list_clusters(state, params.remove("region")).await {
            Ok(listing) => LambdaResponse::json(200, &listing),
            Err(e) => LambdaResponse::from_error(&e),
        };
    }

    let request = ToggleRequest {
        cluster_name: params.remove("cluster-name"),
        cpu_limit: params.remove("cpu-limit"),
        region: params.remove("region"),
    };

    let result = state.orchestrator.toggle(&request).await;
    LambdaResponse::json(result.status, &ToggleResponse::from(&result))
}

/// Run under the Lambda runtime until it shuts the process down
pub async fn run(state: AppState) -> Result<()> {
    info!("Starting eks-toggle Lambda handler");

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let state = state.clone();
        async move { Ok::<_, lambda_runtime::Error>(handle_event(&state, &event.payload).await) }
    }))
    .await
    .map_err(|e| Error::Server(e.to_string()))
}
