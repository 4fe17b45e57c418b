//! REST API handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::backend::validate_prompt;
use crate::error::GatewayError;
use crate::warmup::ReadinessSnapshot;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// HTTP status for each failure kind
pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
        GatewayError::Resolution(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::BackendFailure { .. } | GatewayError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn api_error(err: GatewayError) -> ApiError {
    (status_for(&err), Json(ErrorResponse::new(err.to_string())))
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Readiness of the backend. 500 only when warm-up failed.
pub async fn status(State(state): State<AppState>) -> (StatusCode, Json<ReadinessSnapshot>) {
    let snapshot = state.supervisor.snapshot();
    let code = if snapshot.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (code, Json(snapshot))
}

#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub response: String,
}

/// Send a prompt to the backend.
///
/// Runs regardless of warm-up progress; a success also marks the backend
/// ready. A missing or unreadable body counts as an empty prompt.
pub async fn send(
    State(state): State<AppState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let raw = request.prompt.unwrap_or_default();
    let prompt = validate_prompt(&raw).map_err(api_error)?;

    match state.backend.run(prompt, state.request_timeout).await {
        Ok(response) => {
            state.supervisor.mark_ready();
            Ok(Json(SendResponse { response }))
        }
        Err(e) => {
            match &e {
                GatewayError::Timeout(_) => tracing::warn!("Backend request timed out: {}", e),
                _ => tracing::error!("Backend request failed: {}", e),
            }
            Err(api_error(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&GatewayError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GatewayError::Resolution("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&GatewayError::Timeout(Duration::from_secs(1))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&GatewayError::BackendFailure {
                exit_code: Some(1),
                message: "x".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
