//! HTTP download route for toolkit bundles.
//!
//! `GET /download-zip` reads the manifest, flattens the enabled components
//! and answers with the archive as an attachment.

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::bundle::{self, BundleError, Manifest};
use crate::error::ZipError;
use crate::zip::ArchiveBuilder;

pub struct ServerState {
    pub manifest_path: PathBuf,
}

/// API error response
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl From<BundleError> for ApiError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::EmptySelection => ApiError::bad_request(err.to_string()),
            BundleError::Read { .. } | BundleError::Parse(_) => {
                tracing::error!(error = %err, "failed to load toolkit");
                ApiError::internal_error("Failed to fetch toolkit")
            }
        }
    }
}

impl From<ZipError> for ApiError {
    fn from(err: ZipError) -> Self {
        tracing::error!(error = %err, "failed to build archive");
        ApiError::internal_error("Failed to build archive")
    }
}

pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/download-zip", get(download_zip))
        .with_state(state)
}

/// GET /download-zip
pub async fn download_zip(State(state): State<Arc<ServerState>>) -> Result<Response, ApiError> {
    let manifest = Manifest::load(&state.manifest_path).await?;

    let generated_at = Utc::now();
    let entries = bundle::build_entries(&manifest, &generated_at)?;
    let zip = ArchiveBuilder::new().build(&entries)?;

    tracing::info!(
        entries = entries.len(),
        bytes = zip.len(),
        "serving toolkit archive"
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                bundle::archive_file_name(&generated_at)
            ),
        )
        .header(header::CONTENT_LENGTH, zip.len().to_string())
        .body(Body::from(zip))
        .map_err(|e| ApiError::internal_error(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
