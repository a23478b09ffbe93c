// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::ModelQuery;
use crate::server::error::ApiError;
use crate::server::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/languages", get(list_languages))
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub model_id: String,
    /// Display name to code, sorted by name
    pub languages: BTreeMap<String, String>,
}

async fn list_languages(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Result<Json<LanguagesResponse>, ApiError> {
    let model_id = query
        .model_id
        .unwrap_or_else(|| state.manager.default_model().to_string());
    let table = state.manager.get_language_codes(Some(&model_id))?;
    Ok(Json(LanguagesResponse {
        model_id,
        languages: table.to_map(),
    }))
}
