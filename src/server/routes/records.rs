// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Saved translation and history routes
//!
//! `/saved` and `/history` expose the same operations over different stores;
//! only `/saved` has the `check` lookup.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::DeleteResponse;
use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::storage::{RecordKind, TranslationRecord};

pub fn saved_router() -> Router<AppState> {
    const KIND: RecordKind = RecordKind::Saved;
    Router::new()
        .route(
            "/saved",
            get(|State(state): State<AppState>| list(state, KIND))
                .post(|State(state): State<AppState>, Json(body): Json<RecordCreate>| {
                    create(state, KIND, body)
                })
                .delete(|State(state): State<AppState>| clear(state, KIND)),
        )
        .route("/saved/check", get(check_saved))
        .route(
            "/saved/:id",
            delete(|State(state): State<AppState>, Path(id): Path<String>| {
                remove(state, KIND, id)
            }),
        )
}

pub fn history_router() -> Router<AppState> {
    const KIND: RecordKind = RecordKind::History;
    Router::new()
        .route(
            "/history",
            get(|State(state): State<AppState>| list(state, KIND))
                .post(|State(state): State<AppState>, Json(body): Json<RecordCreate>| {
                    create(state, KIND, body)
                })
                .delete(|State(state): State<AppState>| clear(state, KIND)),
        )
        .route(
            "/history/:id",
            delete(|State(state): State<AppState>, Path(id): Path<String>| {
                remove(state, KIND, id)
            }),
        )
}

#[derive(Debug, Deserialize)]
pub struct RecordCreate {
    pub source_text: String,
    pub translated_text: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    pub items: Vec<TranslationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub source_text: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub exists: bool,
    pub id: Option<String>,
}

/// Singular and plural nouns used in response messages.
fn labels(kind: RecordKind) -> (&'static str, &'static str) {
    match kind {
        RecordKind::Saved => ("Saved translation", "saved translations"),
        RecordKind::History => ("History item", "history items"),
    }
}

async fn list(state: AppState, kind: RecordKind) -> Result<Json<RecordListResponse>, ApiError> {
    let items = state.with_records(kind, |store| store.list_all()).await?;
    Ok(Json(RecordListResponse { items }))
}

/// Returns the existing record instead of creating a duplicate.
async fn create(
    state: AppState,
    kind: RecordKind,
    body: RecordCreate,
) -> Result<Json<TranslationRecord>, ApiError> {
    let record = state
        .with_records(kind, move |store| {
            store.find_or_create(
                &body.source_text,
                &body.translated_text,
                &body.source_lang,
                &body.target_lang,
            )
        })
        .await?;
    Ok(Json(record))
}

async fn remove(
    state: AppState,
    kind: RecordKind,
    id: String,
) -> Result<Json<DeleteResponse>, ApiError> {
    let (noun, _) = labels(kind);
    if !state.with_records(kind, move |store| store.delete(&id)).await? {
        return Err(ApiError::not_found(format!("{noun} not found")));
    }
    Ok(Json(DeleteResponse::ok(format!("{noun} deleted"))))
}

async fn clear(state: AppState, kind: RecordKind) -> Result<Json<DeleteResponse>, ApiError> {
    let (_, plural) = labels(kind);
    let count = state.with_records(kind, |store| store.clear_all()).await?;
    Ok(Json(DeleteResponse::ok(format!("Deleted {count} {plural}"))))
}

async fn check_saved(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckResponse>, ApiError> {
    let existing = state
        .with_records(RecordKind::Saved, move |store| {
            store.find_by_content(&query.source_text, &query.source_lang, &query.target_lang)
        })
        .await?;
    Ok(Json(CheckResponse {
        exists: existing.is_some(),
        id: existing.map(|r| r.id),
    }))
}
