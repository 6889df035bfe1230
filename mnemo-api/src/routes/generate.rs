//! Generation Route Handlers
//!
//! `POST /<facet>/<subject_id>` runs the ensure operation.
//! `OPTIONS` answers the browser preflight.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use mnemo_core::{Facet, SubjectId};
use mnemo_llm::SynthesisCredential;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::{EnsureStatus, GenerationService};

// ============================================================================
// TYPES
// ============================================================================

/// Optional request body carrying the caller's own credential.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

/// Successful ensure response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub message: String,
    pub url: String,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /<facet>/<subject_id>
///
/// 201 when the artifact was synthesized by this call, 200 when it already
/// existed.
pub async fn generate(
    State(service): State<Arc<GenerationService>>,
    Path((facet, subject_id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    let facet: Facet = facet.parse()?;
    let subject: SubjectId = subject_id.parse()?;
    let credential = request_credential(&body)?;

    let outcome = service.ensure(subject, facet, credential).await?;

    let (status, message) = match outcome.status {
        EnsureStatus::Created => (
            StatusCode::CREATED,
            format!("Image {} generated and stored.", outcome.key),
        ),
        EnsureStatus::AlreadyPresent => (
            StatusCode::OK,
            format!("Image {} already exists.", outcome.key),
        ),
    };

    Ok((
        status,
        Json(GenerateResponse {
            message,
            url: outcome.url,
        }),
    ))
}

/// OPTIONS preflight.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

/// Requests that match no route.
pub async fn fallback(method: Method) -> Response {
    match method {
        Method::OPTIONS => preflight().await.into_response(),
        Method::POST => {
            ApiError::invalid_input("Expected POST /<facet>/<subject_id>").into_response()
        }
        _ => ApiError::method_not_allowed().into_response(),
    }
}

/// An empty body means "no credential"; a body must otherwise be valid JSON.
fn request_credential(body: &[u8]) -> ApiResult<Option<SynthesisCredential>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let request: GenerateRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::invalid_input(format!("Invalid request body: {}", e)))?;
    Ok(request.openai_api_key.and_then(SynthesisCredential::new))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the generation router.
pub fn create_router(service: Arc<GenerationService>) -> Router {
    Router::new()
        .route(
            "/:facet/:subject_id",
            post(generate).options(preflight).fallback(fallback),
        )
        .with_state(service)
}
