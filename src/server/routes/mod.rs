// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

pub mod languages;
pub mod model;
pub mod preferences;
pub mod records;
pub mod translate;

use serde::{Deserialize, Serialize};

/// `?model_id=` query shared by most routes
#[derive(Debug, Default, Deserialize)]
pub struct ModelQuery {
    pub model_id: Option<String>,
}

/// Body of every delete/clear response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

impl DeleteResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
