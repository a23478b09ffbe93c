// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for bab
//!
//! Every failure is wrapped once at the backend boundary with the operation,
//! model and path it concerns. Entry points (CLI, REPL, HTTP) map these to
//! exit codes and status codes; nothing in between inspects them.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for bab operations
#[derive(Error, Debug)]
pub enum BabError {
    /// Model id absent from the registry
    #[error("Unknown model_id: {model_id}. Available models: {available:?}")]
    UnknownModel {
        model_id: String,
        available: Vec<String>,
    },

    /// Gated repository refused the request (HTTP 401/403)
    #[error(
        "Access denied for {repo_id}. This model requires accepting the license on \
         Hugging Face and setting the {token_env} environment variable. \
         Visit: https://huggingface.co/{repo_id}"
    )]
    AccessDenied { repo_id: String, token_env: String },

    /// Any other remote fetch failure
    #[error("Failed to download model {repo_id}: {message}")]
    Download { repo_id: String, message: String },

    /// On-disk files could not be turned into inference handles
    #[error("Failed to load model from {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    /// Encode, generate or decode failed
    #[error("Translation failed with {model_id}: {message}")]
    Translation { model_id: String, message: String },

    /// Removing the model directory failed
    #[error("Failed to delete model at {}: {message}", path.display())]
    Deletion { path: PathBuf, message: String },

    /// Language code not present in the model's table
    #[error("Unsupported language code for {model_id}: '{code}'")]
    UnsupportedLanguage { model_id: String, code: String },

    /// Model artifacts are not on disk
    #[error("Model '{0}' not downloaded")]
    NotDownloaded(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local record store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Tokenizer or tensor runtime failures
    #[error("Inference runtime error: {0}")]
    Runtime(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite errors
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl BabError {
    /// Build an `UnknownModel` error listing the registered ids.
    pub fn unknown_model(model_id: impl Into<String>) -> Self {
        BabError::UnknownModel {
            model_id: model_id.into(),
            available: crate::models::registry::model_ids()
                .map(str::to_string)
                .collect(),
        }
    }

    /// True for both download error kinds.
    pub fn is_download_error(&self) -> bool {
        matches!(
            self,
            BabError::AccessDenied { .. } | BabError::Download { .. }
        )
    }

    /// True for errors caused by the caller's request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BabError::UnknownModel { .. }
                | BabError::UnsupportedLanguage { .. }
                | BabError::NotDownloaded(_)
                | BabError::InvalidInput(_)
        )
    }
}

/// Result type alias for bab operations
pub type Result<T> = std::result::Result<T, BabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_lists_available_ids() {
        let err = BabError::unknown_model("bogus");
        let msg = err.to_string();
        assert!(msg.contains("Unknown model_id: bogus"));
        assert!(msg.contains("nllb"));
        assert!(msg.contains("translategemma"));
    }

    #[test]
    fn test_access_denied_names_license_url_and_token() {
        let err = BabError::AccessDenied {
            repo_id: "google/translategemma-4b-it".to_string(),
            token_env: "HF_TOKEN".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Access denied for google/translategemma-4b-it"));
        assert!(msg.contains("https://huggingface.co/google/translategemma-4b-it"));
        assert!(msg.contains("HF_TOKEN"));
        assert!(err.is_download_error());
    }

    #[test]
    fn test_download_error() {
        let err = BabError::Download {
            repo_id: "facebook/nllb-200-distilled-600M".to_string(),
            message: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to download model facebook/nllb-200-distilled-600M: connection reset"
        );
        assert!(err.is_download_error());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_load_error_includes_path() {
        let err = BabError::Load {
            path: PathBuf::from("/tmp/models/x"),
            message: "bad header".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load model from /tmp/models/x: bad header"
        );
    }

    #[test]
    fn test_translation_error() {
        let err = BabError::Translation {
            model_id: "nllb".to_string(),
            message: "decode failed".to_string(),
        };
        assert!(err.to_string().contains("Translation failed with nllb"));
    }

    #[test]
    fn test_deletion_error() {
        let err = BabError::Deletion {
            path: PathBuf::from("/ro/model"),
            message: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("Failed to delete model at /ro/model"));
    }

    #[test]
    fn test_unsupported_language_is_client_error() {
        let err = BabError::UnsupportedLanguage {
            model_id: "nllb".to_string(),
            code: "xx_Fake".to_string(),
        };
        assert!(err.to_string().contains("'xx_Fake'"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_not_downloaded() {
        let err = BabError::NotDownloaded("translategemma".to_string());
        assert_eq!(err.to_string(), "Model 'translategemma' not downloaded");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_runtime_error() {
        let err = BabError::Runtime("shape mismatch".to_string());
        assert_eq!(err.to_string(), "Inference runtime error: shape mismatch");
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BabError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BabError = json_err.into();
        assert!(err.to_string().starts_with("JSON error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn test_fn() -> Result<i32> {
            Err(BabError::InvalidInput("test".to_string()))
        }

        assert!(test_fn().is_err());
    }
}
