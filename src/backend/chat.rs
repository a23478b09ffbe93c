// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat-templated translation (TranslateGemma)
//!
//! The request is a single user turn whose content carries the source text
//! and the two language codes as structured fields. The template renders it
//! into Gemma's turn format; generation is greedy and the prompt is sliced
//! off the output before decoding.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{has_file_with_extension, BackendCore, ModelHandles, MAX_GENERATED_TOKENS};
use crate::error::Result;
use crate::models::download::ArtifactFetcher;
use crate::models::languages::language_name;
use crate::models::registry::ModelDescriptor;
use crate::runtime::{ChatHandles, InferenceRuntime};

impl ModelHandles for ChatHandles {
    const REQUIRED_FILES: &'static [&'static str] = &[
        "config.json",
        "generation_config.json",
        "preprocessor_config.json",
        "tokenizer_config.json",
        "tokenizer.json",
    ];

    const WEIGHTS_CHECK: &'static str = "model weights (safetensors)";

    fn weights_present(model_path: &Path) -> bool {
        has_file_with_extension(model_path, "safetensors")
    }

    fn load(runtime: &dyn InferenceRuntime, model_path: &Path) -> Result<Self> {
        runtime.load_chat(model_path)
    }
}

/// Content of the single user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest<'a> {
    pub source_lang_code: &'a str,
    pub target_lang_code: &'a str,
    pub text: &'a str,
}

/// TranslateGemma prompt format
#[derive(Debug, Clone)]
pub struct TranslateGemmaTemplate {
    model_id: &'static str,
}

impl TranslateGemmaTemplate {
    pub fn new(model_id: &'static str) -> Self {
        Self { model_id }
    }

    fn instruction(&self, request: &TranslationRequest<'_>) -> String {
        let source = language_name(self.model_id, request.source_lang_code);
        let target = language_name(self.model_id, request.target_lang_code);
        format!(
            "You are a professional {source} ({source_code}) to {target} ({target_code}) \
             translator. Your goal is to accurately convey the meaning and nuances of the \
             original {source} text while adhering to {target} grammar, vocabulary, and \
             cultural sensitivities.\n\
             Produce only the {target} translation, without any additional explanations or \
             commentary. Please translate the following {source} text into {target}:\n\n\n{text}",
            source_code = request.source_lang_code,
            target_code = request.target_lang_code,
            text = request.text.trim(),
        )
    }

    /// Render the prompt, ending with an open model turn.
    pub fn apply(&self, request: &TranslationRequest<'_>) -> String {
        format!(
            "<bos><start_of_turn>user\n{}<end_of_turn>\n<start_of_turn>model\n",
            self.instruction(request)
        )
    }
}

/// Render, generate, strip the prompt, decode.
pub fn translate_with(
    handles: &ChatHandles,
    template: &TranslateGemmaTemplate,
    request: &TranslationRequest<'_>,
) -> Result<String> {
    let prompt = template.apply(request);
    let prompt_ids = handles.tokenizer.encode(&prompt, false)?;
    let prompt_len = prompt_ids.len();

    let output = handles.model.generate(&prompt_ids, MAX_GENERATED_TOKENS)?;
    let completion = output.get(prompt_len..).unwrap_or_default();
    let decoded = handles.tokenizer.decode(completion, true)?;
    Ok(decoded.trim().to_string())
}

/// Chat-generation family backend
pub struct ChatBackend {
    core: BackendCore<ChatHandles>,
    template: TranslateGemmaTemplate,
}

impl ChatBackend {
    pub fn new(
        descriptor: &'static ModelDescriptor,
        cache_dir: PathBuf,
        fetcher: Arc<dyn ArtifactFetcher>,
        runtime: Arc<dyn InferenceRuntime>,
        auto_download: bool,
    ) -> Self {
        Self {
            core: BackendCore::new(descriptor, cache_dir, fetcher, runtime, auto_download),
            template: TranslateGemmaTemplate::new(descriptor.model_id),
        }
    }

    pub fn core(&self) -> &BackendCore<ChatHandles> {
        &self.core
    }

    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        let template = self.template.clone();
        let text = text.to_string();
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();
        self.core
            .run_translation(move |handles| {
                let request = TranslationRequest {
                    source_lang_code: &source_lang,
                    target_lang_code: &target_lang,
                    text: &text,
                };
                translate_with(handles, &template, &request)
            })
            .await
    }
}
