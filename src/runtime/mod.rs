// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model-loading and inference runtime
//!
//! Backends own the translation protocols (language tags, chat template,
//! prompt slicing). The runtime only turns a directory of artifacts into a
//! tokenizer and a greedy generator, which is all the protocols need.
//!
//! The default runtime is built on candle (cargo feature `candle`). Builds
//! without it get a runtime that refuses every load.

use std::path::Path;
use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::error::Result;

#[cfg(feature = "candle")]
pub mod candle;
pub mod tokenizer;

#[cfg(feature = "candle")]
pub use self::candle::CandleRuntime;
pub use tokenizer::HfTokenizer;

/// Text ⇄ token id conversion
pub trait TextTokenizer: Send + Sync {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>>;
    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String>;
    fn token_to_id(&self, token: &str) -> Option<u32>;
}

/// Encoder-decoder generation
pub trait Seq2SeqGenerator: Send + Sync {
    /// Greedy decode. The returned sequence starts with the decoder start
    /// token, continues with `forced_bos_token_id`, and is at most
    /// `max_length` tokens long.
    fn generate(
        &self,
        input_ids: &[u32],
        forced_bos_token_id: u32,
        max_length: usize,
    ) -> Result<Vec<u32>>;

    fn eos_token_id(&self) -> u32;

    /// Longest encoder input the model accepts.
    fn max_source_positions(&self) -> usize;
}

/// Decoder-only generation
pub trait ChatGenerator: Send + Sync {
    /// Greedy decode. Returns the prompt followed by up to `max_new_tokens`
    /// generated tokens.
    fn generate(&self, prompt_ids: &[u32], max_new_tokens: usize) -> Result<Vec<u32>>;
}

/// Loaded seq2seq model and its tokenizer
pub struct Seq2SeqHandles {
    pub model: Box<dyn Seq2SeqGenerator>,
    pub tokenizer: Box<dyn TextTokenizer>,
}

/// Loaded chat model and its tokenizer
pub struct ChatHandles {
    pub model: Box<dyn ChatGenerator>,
    pub tokenizer: Box<dyn TextTokenizer>,
}

/// Turns model directories into in-memory handles. Calls block; backends run
/// them on the blocking thread pool.
pub trait InferenceRuntime: Send + Sync {
    fn name(&self) -> &'static str;
    fn load_seq2seq(&self, model_dir: &Path) -> Result<Seq2SeqHandles>;
    fn load_chat(&self, model_dir: &Path) -> Result<ChatHandles>;
}

/// Runtime selected by the build features.
#[cfg(feature = "candle")]
pub fn default_runtime(config: &RuntimeConfig) -> Result<Arc<dyn InferenceRuntime>> {
    Ok(Arc::new(CandleRuntime::new(config)?))
}

/// Runtime selected by the build features.
#[cfg(not(feature = "candle"))]
pub fn default_runtime(_config: &RuntimeConfig) -> Result<Arc<dyn InferenceRuntime>> {
    Ok(Arc::new(UnavailableRuntime))
}

/// Placeholder for builds without an inference backend
#[cfg(not(feature = "candle"))]
pub struct UnavailableRuntime;

#[cfg(not(feature = "candle"))]
impl InferenceRuntime for UnavailableRuntime {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn load_seq2seq(&self, _model_dir: &Path) -> Result<Seq2SeqHandles> {
        Err(crate::error::BabError::Runtime(
            "bab was built without the `candle` feature".to_string(),
        ))
    }

    fn load_chat(&self, _model_dir: &Path) -> Result<ChatHandles> {
        Err(crate::error::BabError::Runtime(
            "bab was built without the `candle` feature".to_string(),
        ))
    }
}
