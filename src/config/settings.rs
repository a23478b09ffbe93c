// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for bab
//!
//! Handles loading and saving settings from ~/.cache/bab/settings.json

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::registry::DEFAULT_MODEL_ID;

mod io;

/// Main settings structure, stored in ~/.cache/bab/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Model cache and lifecycle
    #[serde(default)]
    pub models: ModelsConfig,

    /// Remote hub access
    #[serde(default)]
    pub hub: HubSettings,

    /// Inference runtime options
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// HTTP API server
    #[serde(default)]
    pub server: ServerConfig,
}

/// Model cache and lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsConfig {
    /// Cache root for model artifacts (defaults to <bab_home>/models)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Model used when none is named
    #[serde(default = "default_model_id")]
    pub default_model: String,

    /// Download missing artifacts transparently when a model is loaded
    #[serde(default = "default_true")]
    pub auto_download: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            default_model: default_model_id(),
            auto_download: true,
        }
    }
}

/// Hugging Face hub settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubSettings {
    /// Hub base URL
    #[serde(default = "default_hub_endpoint")]
    pub endpoint: String,

    /// Repository revision to fetch
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Environment variable holding the access token for gated models
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            endpoint: default_hub_endpoint(),
            revision: default_revision(),
            token_env: default_token_env(),
        }
    }
}

/// Inference runtime settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Weight dtype: "f32", "f16" or "bf16"
    #[serde(default = "default_dtype")]
    pub dtype: String,

    /// Use a CUDA device when the build supports it
    #[serde(default)]
    pub use_gpu: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dtype: default_dtype(),
            use_gpu: false,
        }
    }
}

/// HTTP API server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_hub_endpoint() -> String {
    "https://huggingface.co".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_token_env() -> String {
    "HF_TOKEN".to_string()
}

fn default_dtype() -> String {
    "f32".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}
