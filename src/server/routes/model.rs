// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model lifecycle routes

use std::collections::BTreeMap;
use std::path::PathBuf;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::ModelQuery;
use crate::manager::ModelStatus;
use crate::models::ModelDescriptor;
use crate::server::error::ApiError;
use crate::server::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/model/list", get(list_models))
        .route("/model/list/status", get(list_statuses))
        .route("/model/status", get(model_status))
        .route("/model/verify", get(verify_model))
        .route("/model/download", post(download_model))
        .route("/model/remove", post(remove_model))
}

#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub models: &'static [ModelDescriptor],
    pub default_model_id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusListResponse {
    pub models: Vec<ModelStatus>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub model_id: String,
    pub model_path: PathBuf,
    pub all_files_present: bool,
    pub files: BTreeMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    pub success: bool,
    pub message: String,
    pub model_id: String,
    pub model_path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub model_id: Option<String>,
    #[serde(default)]
    pub force: bool,
}

async fn list_models(State(state): State<AppState>) -> Json<ModelListResponse> {
    Json(ModelListResponse {
        models: state.manager.available_models(),
        default_model_id: state.manager.default_model().to_string(),
    })
}

async fn list_statuses(State(state): State<AppState>) -> Result<Json<StatusListResponse>, ApiError> {
    Ok(Json(StatusListResponse {
        models: state.manager.all_statuses()?,
    }))
}

async fn model_status(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Result<Json<ModelStatus>, ApiError> {
    Ok(Json(state.manager.model_status(query.model_id.as_deref())?))
}

async fn verify_model(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let backend = state.manager.get_backend(query.model_id.as_deref())?;
    let model_path = backend.model_path();
    if !model_path.exists() {
        return Err(ApiError::not_found(
            "Model directory does not exist. Run download first.",
        ));
    }

    let files = backend.verify_model_files();
    Ok(Json(VerifyResponse {
        model_id: backend.model_id().to_string(),
        model_path,
        all_files_present: files.values().all(|present| *present),
        files,
    }))
}

async fn download_model(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    let backend = state.manager.get_backend(query.model_id.as_deref())?;
    let model_id = backend.model_id().to_string();

    if backend.is_downloaded() && !query.force {
        return Ok(Json(LifecycleResponse {
            success: true,
            message: "Model already downloaded. Use force=true to re-download.".to_string(),
            model_id,
            model_path: backend.model_path(),
        }));
    }

    let model_path = backend.download_model(query.force).await.map_err(|e| {
        tracing::error!("Download of {} failed: {}", model_id, e);
        ApiError::internal(format!("Download failed: {}", e))
    })?;

    Ok(Json(LifecycleResponse {
        success: true,
        message: "Model downloaded successfully.".to_string(),
        model_id,
        model_path,
    }))
}

async fn remove_model(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    let backend = state.manager.get_backend(query.model_id.as_deref())?;
    let model_id = backend.model_id().to_string();
    let model_path = backend.model_path();

    // Partial downloads lack the markers but still occupy the directory.
    if !model_path.exists() {
        return Ok(Json(LifecycleResponse {
            success: true,
            message: "Model not downloaded, nothing to remove.".to_string(),
            model_id,
            model_path,
        }));
    }

    backend.delete_model().await.map_err(|e| {
        tracing::error!("Removal of {} failed: {}", model_id, e);
        ApiError::internal(format!("Removal failed: {}", e))
    })?;

    Ok(Json(LifecycleResponse {
        success: true,
        message: "Model removed successfully.".to_string(),
        model_id,
        model_path,
    }))
}
