// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Encoder-decoder translation (NLLB)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{BackendCore, ModelHandles, MAX_GENERATED_TOKENS};
use crate::error::{BabError, Result};
use crate::models::download::ArtifactFetcher;
use crate::models::registry::ModelDescriptor;
use crate::runtime::{InferenceRuntime, Seq2SeqHandles};

impl ModelHandles for Seq2SeqHandles {
    const REQUIRED_FILES: &'static [&'static str] = &[
        "config.json",
        "generation_config.json",
        "sentencepiece.bpe.model",
        "special_tokens_map.json",
        "tokenizer_config.json",
        "tokenizer.json",
    ];

    const WEIGHTS_CHECK: &'static str = "model weights (safetensors or pytorch)";

    fn weights_present(model_path: &Path) -> bool {
        model_path.join("model.safetensors").exists()
            || model_path.join("pytorch_model.bin").exists()
    }

    fn load(runtime: &dyn InferenceRuntime, model_path: &Path) -> Result<Self> {
        runtime.load_seq2seq(model_path)
    }
}

/// Tokenize with a source-language prefix, force the target-language token,
/// decode without special tokens.
pub fn translate_with(
    handles: &Seq2SeqHandles,
    text: &str,
    source_lang: &str,
    target_lang: &str,
) -> Result<String> {
    let tokenizer = handles.tokenizer.as_ref();
    let model = handles.model.as_ref();

    let lang_token = |code: &str| {
        tokenizer
            .token_to_id(code)
            .ok_or_else(|| BabError::Runtime(format!("tokenizer has no language token '{}'", code)))
    };
    let source_id = lang_token(source_lang)?;
    let target_id = lang_token(target_lang)?;

    // [src_lang] tokens... </s>
    let body = tokenizer.encode(text, false)?;
    let budget = model.max_source_positions().saturating_sub(2);
    let mut input_ids = Vec::with_capacity(body.len().min(budget) + 2);
    input_ids.push(source_id);
    input_ids.extend(body.into_iter().take(budget));
    input_ids.push(model.eos_token_id());

    let output = model.generate(&input_ids, target_id, MAX_GENERATED_TOKENS)?;
    let decoded = tokenizer.decode(&output, true)?;
    Ok(decoded.trim().to_string())
}

/// Seq2seq family backend
pub struct Seq2SeqBackend {
    core: BackendCore<Seq2SeqHandles>,
}

impl Seq2SeqBackend {
    pub fn new(
        descriptor: &'static ModelDescriptor,
        cache_dir: PathBuf,
        fetcher: Arc<dyn ArtifactFetcher>,
        runtime: Arc<dyn InferenceRuntime>,
        auto_download: bool,
    ) -> Self {
        Self {
            core: BackendCore::new(descriptor, cache_dir, fetcher, runtime, auto_download),
        }
    }

    pub fn core(&self) -> &BackendCore<Seq2SeqHandles> {
        &self.core
    }

    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        let text = text.to_string();
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();
        self.core
            .run_translation(move |handles| {
                translate_with(handles, &text, &source_lang, &target_lang)
            })
            .await
    }
}
