// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Translation route

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::BabError;
use crate::models::get_language_codes;
use crate::server::error::ApiError;
use crate::server::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/translate", post(translate))
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub source_language_code: String,
    pub target_language_code: String,
    #[serde(default)]
    pub model_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub original_text: String,
    pub translated_text: String,
    pub source_language_code: String,
    pub target_language_code: String,
    pub model_id: String,
}

async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let backend = state.manager.get_backend(request.model_id.as_deref())?;
    let model_id = backend.model_id();

    if !backend.is_downloaded() {
        return Err(BabError::NotDownloaded(model_id.to_string()).into());
    }

    let table = get_language_codes(model_id)?;
    for (role, code) in [
        ("source", &request.source_language_code),
        ("target", &request.target_language_code),
    ] {
        if !table.contains_code(code) {
            return Err(ApiError::bad_request(format!(
                "Unsupported {role} language code for {model_id}: '{code}'. \
                 Use GET /languages?model_id={model_id} to see supported language codes."
            )));
        }
    }

    let translated_text = backend
        .translate(
            &request.text,
            &request.source_language_code,
            &request.target_language_code,
        )
        .await?;

    Ok(Json(TranslateResponse {
        original_text: request.text,
        translated_text,
        source_language_code: request.source_language_code,
        target_language_code: request.target_language_code,
        model_id: model_id.to_string(),
    }))
}
