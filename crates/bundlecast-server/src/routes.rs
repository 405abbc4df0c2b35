// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Bundlecast.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! HTTP surface for the OTA update API
//!
//! Routes, request/response bodies and the error-to-status mapping. All
//! decisions are delegated to the core components; this module only parses
//! requests, streams uploads to disk and shapes JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State};
use axum::http::header::{CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, warn};
use uuid::Uuid;

use bundlecast_core::{
    CoreError, PublishRequest, Release, ReleasePublisher, ReleaseResolver, ReleaseRollbackManager,
    UpdateDecision,
};

use crate::config::ServerConfig;

/// Shared state for API handlers. Components are constructed once at
/// startup and injected here.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ReleaseResolver>,
    pub publisher: Arc<ReleasePublisher>,
    pub rollback: Arc<ReleaseRollbackManager>,
    pub config: Arc<ServerConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

pub fn router(state: AppState) -> Router {
    let uploads_dir = state.config.uploads.dir.clone();
    let max_upload_bytes = state.config.uploads.max_upload_bytes;

    Router::new()
        .route("/api/check-update", get(check_update_handler))
        .route(
            "/api/publish",
            post(publish_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/rollback", post(rollback_handler))
        .route("/health", get(health_handler))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error envelope rendered as `{"message": ...}` JSON, the format clients
/// already parse.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 5xx with a route-level public message; the detail only goes to the
    /// log.
    fn internal(error: &CoreError, message: &str) -> Self {
        error!(error = %error, "{message}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

fn map_core_error(error: CoreError, internal_message: &str) -> ApiError {
    match error {
        CoreError::MissingField(_)
        | CoreError::InvalidVersion(_)
        | CoreError::MissingArtifact
        | CoreError::UnsupportedArtifact(_) => ApiError::bad_request(error.to_string()),
        CoreError::ReleaseNotFound(_) => {
            ApiError::new(StatusCode::NOT_FOUND, "Version not found")
        }
        CoreError::Digest(_) | CoreError::Io(_) | CoreError::Store(_) => {
            ApiError::internal(&error, internal_message)
        }
    }
}

/// Accepts either a JSON or a urlencoded form body.
#[derive(Debug)]
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with("application/json") {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::bad_request(rejection.to_string()))?;
            return Ok(Self(value));
        }

        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.to_string()))?;
        Ok(Self(value))
    }
}

// --- check-update ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUpdateParams {
    current_app_version: Option<String>,
    current_bundle_version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAvailableBody {
    update_available: bool,
    bundle_version: String,
    download_url: String,
    file_hash: String,
    force_update: bool,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NoUpdateBody {
    update_available: bool,
    message: String,
}

fn no_update(message: &str) -> Response {
    Json(NoUpdateBody {
        update_available: false,
        message: message.to_owned(),
    })
    .into_response()
}

/// Base URL for download links: configured value if set, request Host
/// header otherwise.
fn public_base(config: &ServerConfig, headers: &HeaderMap) -> String {
    if let Some(base) = &config.server.public_base_url {
        return base.trim_end_matches('/').to_owned();
    }

    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
async fn check_update_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CheckUpdateParams>,
) -> Result<Response, ApiError> {
    let (Some(app_version), Some(current_bundle_version)) =
        (params.current_app_version, params.current_bundle_version)
    else {
        return Err(ApiError::bad_request("Missing version information"));
    };

    let decision = state
        .resolver
        .resolve_update(&app_version, &current_bundle_version)
        .map_err(|e| map_core_error(e, "Server error"))?;

    match decision {
        UpdateDecision::Available(release) => {
            let download_url = format!(
                "{}/uploads/{}",
                public_base(&state.config, &headers),
                release.file_name
            );
            Ok(Json(UpdateAvailableBody {
                update_available: true,
                bundle_version: release.bundle_version,
                download_url,
                file_hash: release.file_hash,
                force_update: release.force_update,
                description: release.description,
            })
            .into_response())
        }
        UpdateDecision::AlreadyCurrent => Ok(no_update("Already up to date")),
        UpdateDecision::NoCompatibleRelease => Ok(no_update("No compatible releases")),
    }
}

// --- publish ---

#[derive(Debug, Serialize)]
struct PublishResponseBody {
    success: bool,
    message: String,
    data: Release,
}

struct StoredArtifact {
    path: PathBuf,
    file_name: String,
}

fn parse_force_update(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// A bundle upload must carry a zip MIME type or a `.zip` file extension.
fn is_zip_upload(file_name: &str, content_type: Option<&str>) -> bool {
    matches!(
        content_type,
        Some("application/zip" | "application/x-zip-compressed")
    ) || Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))
}

/// Stream the upload to the uploads directory under a unique name and make
/// it durable before anything references it.
async fn store_artifact(
    mut field: Field<'_>,
    uploads_dir: &str,
) -> Result<StoredArtifact, ApiError> {
    let declared_name = field.file_name().unwrap_or("bundle.zip").to_owned();
    let content_type = field.content_type().map(ToOwned::to_owned);

    if !is_zip_upload(&declared_name, content_type.as_deref()) {
        return Err(map_core_error(
            CoreError::UnsupportedArtifact(declared_name),
            "Error publishing release",
        ));
    }

    let file_name = format!("{}-{}.zip", Utc::now().timestamp_millis(), Uuid::new_v4());
    let path = Path::new(uploads_dir).join(&file_name);

    let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
        error!(error = %e, "Failed to create upload file");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Error publishing release")
    })?;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                remove_partial_upload(&path).await;
                return Err(ApiError::bad_request(format!(
                    "Invalid multipart body: {e}"
                )));
            }
        };
        if let Err(e) = file.write_all(&chunk).await {
            remove_partial_upload(&path).await;
            error!(error = %e, "Failed to write upload to disk");
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error publishing release",
            ));
        }
    }

    if let Err(e) = file.sync_all().await {
        remove_partial_upload(&path).await;
        error!(error = %e, "Failed to sync upload to disk");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error publishing release",
        ));
    }

    Ok(StoredArtifact { path, file_name })
}

async fn remove_partial_upload(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
    }
}

async fn publish_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PublishResponseBody>, ApiError> {
    let mut app_version = String::new();
    let mut bundle_version = String::new();
    let mut force_update = false;
    let mut description = None;
    let mut stored: Option<StoredArtifact> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };
        match name.as_str() {
            "appVersion" => app_version = read_text(field).await?,
            "bundleVersion" => bundle_version = read_text(field).await?,
            "forceUpdate" => force_update = parse_force_update(&read_text(field).await?),
            "description" => {
                let text = read_text(field).await?;
                if !text.is_empty() {
                    description = Some(text);
                }
            }
            "bundle" if stored.is_none() => {
                stored = Some(store_artifact(field, &state.config.uploads.dir).await?);
            }
            _ => {}
        }
    }

    let Some(artifact) = stored else {
        return Err(map_core_error(
            CoreError::MissingArtifact,
            "Error publishing release",
        ));
    };

    let release = state
        .publisher
        .publish(
            PublishRequest {
                app_version,
                bundle_version,
                force_update,
                description,
            },
            &artifact.path,
            &artifact.file_name,
        )
        .await
        .map_err(|e| map_core_error(e, "Error publishing release"))?;

    Ok(Json(PublishResponseBody {
        success: true,
        message: "Published successfully".to_owned(),
        data: release,
    }))
}

// --- rollback ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackBody {
    bundle_version_to_disable: Option<String>,
}

#[derive(Debug, Serialize)]
struct RollbackResponseBody {
    success: bool,
    message: String,
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
async fn rollback_handler(
    State(state): State<AppState>,
    JsonOrForm(body): JsonOrForm<RollbackBody>,
) -> Result<Json<RollbackResponseBody>, ApiError> {
    let bundle_version = body.bundle_version_to_disable.unwrap_or_default();

    let release = state
        .rollback
        .rollback(&bundle_version)
        .map_err(|e| map_core_error(e, "Rollback failed"))?;

    Ok(Json(RollbackResponseBody {
        success: true,
        message: format!(
            "Version {} disabled. Users will fallback to previous version.",
            release.bundle_version
        ),
    }))
}

// --- health ---

#[expect(clippy::unused_async, reason = "axum handler must be async")]
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
