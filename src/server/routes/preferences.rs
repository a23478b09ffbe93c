// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::DeleteResponse;
use crate::server::error::ApiError;
use crate::server::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/preferences/:key",
        get(get_preference)
            .put(set_preference)
            .delete(delete_preference),
    )
}

#[derive(Debug, Serialize)]
pub struct PreferenceResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PreferenceUpdate {
    pub value: String,
}

async fn get_preference(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<PreferenceResponse>, ApiError> {
    let lookup = key.clone();
    let value = state
        .with_preferences(move |prefs| prefs.get(&lookup))
        .await?
        .ok_or_else(|| ApiError::not_found("Preference not found"))?;
    Ok(Json(PreferenceResponse { key, value }))
}

async fn set_preference(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<PreferenceUpdate>,
) -> Result<Json<PreferenceResponse>, ApiError> {
    let (k, v) = (key.clone(), body.value.clone());
    state
        .with_preferences(move |prefs| prefs.set(&k, &v))
        .await?;
    Ok(Json(PreferenceResponse {
        key,
        value: body.value,
    }))
}

async fn delete_preference(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state
        .with_preferences(move |prefs| prefs.delete(&key))
        .await?
    {
        return Err(ApiError::not_found("Preference not found"));
    }
    Ok(Json(DeleteResponse::ok("Preference deleted")))
}
