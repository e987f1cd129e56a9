//! HTTP handlers.

use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use orb_observer::{MetricsSnapshot, Publisher};
use orb_resolver::ResolutionResult;
use orb_types::{hashlink, AnchorInfo, OrbError, DID_DELIMITER};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AppState;

/// API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<OrbError> for ApiError {
    fn from(err: OrbError) -> Self {
        match err {
            OrbError::Transient(msg) => ApiError::Unavailable(msg),
            OrbError::NotFound(msg) => ApiError::NotFound(msg),
            OrbError::Invalid(msg) => ApiError::BadRequest(msg),
            OrbError::Other(msg) => ApiError::InternalServerError(msg),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub status: String,
}

impl AcceptedResponse {
    fn accepted() -> (StatusCode, Json<Self>) {
        (
            StatusCode::ACCEPTED,
            Json(Self {
                status: "accepted".to_string(),
            }),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitDidRequest {
    pub did: String,
}

/// Handler for `POST /anchors`: queues an anchor for observation.
pub async fn submit_anchor_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(info): Json<AnchorInfo>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    hashlink::resource_hash(&info.hashlink)?;

    state.publisher.publish_anchor(&info).await?;

    tracing::debug!(hashlink = %info.hashlink, "anchor queued");

    Ok(AcceptedResponse::accepted())
}

/// Handler for `POST /dids`: queues a DID for out-of-system processing.
pub async fn submit_did_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<SubmitDidRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let valid = req
        .did
        .rsplit_once(DID_DELIMITER)
        .is_some_and(|(cid, suffix)| !cid.is_empty() && !suffix.is_empty());
    if !valid {
        return Err(ApiError::BadRequest(format!("invalid DID [{}]", req.did)));
    }

    state.publisher.publish_did(&req.did).await?;

    tracing::debug!(did = %req.did, "DID queued");

    Ok(AcceptedResponse::accepted())
}

/// Handler for `GET /identifiers/{id}`.
pub async fn resolve_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ResolutionResult>, ApiError> {
    Ok(Json(state.resolver.resolve_document(&id).await?))
}

/// Handler for `GET /metrics`.
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
