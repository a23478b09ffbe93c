// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! `tokenizer.json` backed tokenizer

use std::path::Path;

use tokenizers::Tokenizer;

use super::TextTokenizer;
use crate::error::{BabError, Result};

/// Hugging Face `tokenizers` wrapper
pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = Tokenizer::from_file(path).map_err(|e| {
            BabError::Runtime(format!(
                "Failed to load tokenizer {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { inner })
    }

    /// Load `tokenizer.json` from a model directory.
    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        Self::from_file(&model_dir.join("tokenizer.json"))
    }

    /// Vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl TextTokenizer for HfTokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, add_special_tokens)
            .map_err(|e| BabError::Runtime(format!("Tokenization failed: {}", e)))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        self.inner
            .decode(ids, skip_special_tokens)
            .map_err(|e| BabError::Runtime(format!("Detokenization failed: {}", e)))
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }
}
