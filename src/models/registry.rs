// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Static registry of supported translation models
//!
//! The table is fixed at compile time. Every entry point validates a model id
//! here before asking the manager for a backend.

use serde::Serialize;

use crate::error::{BabError, Result};

/// Model id used when a caller does not name one
pub const DEFAULT_MODEL_ID: &str = "nllb";

/// Invocation protocol family of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Encoder-decoder translation (tokenizer + forced-BOS generate)
    Seq2Seq,
    /// Chat-templated text generation
    ChatGeneration,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Seq2Seq => "seq2seq",
            ModelFamily::ChatGeneration => "chat_generation",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about a translation model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    pub model_id: &'static str,
    pub repo_id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    #[serde(rename = "model_type")]
    pub family: ModelFamily,
    pub size_estimate: &'static str,
    pub requires_auth: bool,
}

impl ModelDescriptor {
    /// Directory name under the cache root (`org/name` becomes `org--name`).
    pub fn cache_dir_name(&self) -> String {
        self.repo_id.replace('/', "--")
    }
}

static MODEL_REGISTRY: &[ModelDescriptor] = &[
    ModelDescriptor {
        model_id: "nllb",
        repo_id: "facebook/nllb-200-distilled-600M",
        display_name: "NLLB-200",
        description: "Meta's No Language Left Behind model supporting 200+ languages",
        family: ModelFamily::Seq2Seq,
        size_estimate: "~2.5GB",
        requires_auth: false,
    },
    ModelDescriptor {
        model_id: "translategemma",
        repo_id: "google/translategemma-4b-it",
        display_name: "TranslateGemma",
        description: "Google's lightweight translation model based on Gemma 3",
        family: ModelFamily::ChatGeneration,
        size_estimate: "~8GB",
        requires_auth: true,
    },
];

/// All registered models, in registry order.
pub fn available_models() -> &'static [ModelDescriptor] {
    MODEL_REGISTRY
}

/// Registered model ids, in registry order.
pub fn model_ids() -> impl Iterator<Item = &'static str> {
    MODEL_REGISTRY.iter().map(|m| m.model_id)
}

pub fn is_known_model(model_id: &str) -> bool {
    MODEL_REGISTRY.iter().any(|m| m.model_id == model_id)
}

/// Look up a model's descriptor.
pub fn get_model_info(model_id: &str) -> Result<&'static ModelDescriptor> {
    MODEL_REGISTRY
        .iter()
        .find(|m| m.model_id == model_id)
        .ok_or_else(|| BabError::unknown_model(model_id))
}
