// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Candle inference runtime
//!
//! Native encoder-decoder (M2M100/NLLB) and Gemma 3 generators running on
//! CPU, CUDA or Metal.

use std::path::Path;

use candle_core::{DType, Device};

use super::{ChatHandles, HfTokenizer, InferenceRuntime, Seq2SeqHandles};
use crate::config::RuntimeConfig;
use crate::error::{BabError, Result};

mod gemma;
mod m2m100;

pub use gemma::GemmaGenerator;
pub use m2m100::{M2M100Config, M2M100Generator};

type CandleResult<T> = std::result::Result<T, candle_core::Error>;

fn runtime_error(e: candle_core::Error) -> BabError {
    BabError::Runtime(format!("Candle error: {}", e))
}

/// Parse a dtype name from settings.
pub fn parse_dtype(name: &str) -> Result<DType> {
    match name.to_ascii_lowercase().as_str() {
        "f32" | "float32" => Ok(DType::F32),
        "f16" | "float16" => Ok(DType::F16),
        "bf16" | "bfloat16" => Ok(DType::BF16),
        other => Err(BabError::Config(format!(
            "Unsupported runtime dtype '{}' (expected f32, f16 or bf16)",
            other
        ))),
    }
}

fn select_device(use_gpu: bool) -> Result<Device> {
    if !use_gpu {
        return Ok(Device::Cpu);
    }

    #[cfg(feature = "metal")]
    {
        Device::new_metal(0).map_err(runtime_error)
    }

    #[cfg(not(feature = "metal"))]
    {
        Device::cuda_if_available(0).map_err(runtime_error)
    }
}

/// Runtime backed by candle
pub struct CandleRuntime {
    device: Device,
    dtype: DType,
}

impl CandleRuntime {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let dtype = parse_dtype(&config.dtype)?;
        let device = select_device(config.use_gpu)?;
        tracing::debug!("Candle runtime on {:?} with {:?}", device, dtype);
        Ok(Self { device, dtype })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }
}

impl InferenceRuntime for CandleRuntime {
    fn name(&self) -> &'static str {
        "candle"
    }

    fn load_seq2seq(&self, model_dir: &Path) -> Result<Seq2SeqHandles> {
        let tokenizer = HfTokenizer::from_dir(model_dir)?;
        let model = M2M100Generator::load(model_dir, self.dtype, &self.device)?;
        Ok(Seq2SeqHandles {
            model: Box::new(model),
            tokenizer: Box::new(tokenizer),
        })
    }

    fn load_chat(&self, model_dir: &Path) -> Result<ChatHandles> {
        let tokenizer = HfTokenizer::from_dir(model_dir)?;
        let model = GemmaGenerator::load(model_dir, &tokenizer, self.dtype, &self.device)?;
        Ok(ChatHandles {
            model: Box::new(model),
            tokenizer: Box::new(tokenizer),
        })
    }
}
