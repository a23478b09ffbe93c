// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Gemma 3 text generator

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::gemma3::{Config as Gemma3Config, Model as Gemma3Model};
use serde_json::Value;

use super::runtime_error;
use crate::error::{BabError, Result};
use crate::runtime::{ChatGenerator, HfTokenizer, TextTokenizer};

const DEFAULT_VOCAB_SIZE: u64 = 262_208;

/// Where the text decoder's tensors live inside the checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeightLayout {
    /// `model.layers.*`
    Plain,
    /// `language_model.model.layers.*`
    LanguageModelOuter,
    /// `model.language_model.layers.*`
    LanguageModelInner,
}

fn detect_layout<'a>(mut tensor_names: impl Iterator<Item = &'a str>) -> WeightLayout {
    let mut layout = WeightLayout::Plain;
    for name in tensor_names.by_ref() {
        if name.starts_with("model.language_model.") {
            return WeightLayout::LanguageModelInner;
        }
        if name.starts_with("language_model.") {
            layout = WeightLayout::LanguageModelOuter;
        }
    }
    layout
}

/// Build the text config from `config.json`, filling gaps with Gemma 3 4B values.
fn parse_config(config_str: &str) -> Result<Gemma3Config> {
    let root: Value = serde_json::from_str(config_str)?;
    let source = root.get("text_config").cloned().unwrap_or(root);

    let mut object: BTreeMap<String, Value> = source
        .as_object()
        .ok_or_else(|| BabError::Runtime("Invalid Gemma config.json format".to_string()))?
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut set_default = |key: &str, value: Value| {
        object.entry(key.to_string()).or_insert(value);
    };

    set_default("attention_bias", Value::Bool(false));
    set_default(
        "hidden_activation",
        Value::String("gelu_pytorch_tanh".to_string()),
    );
    set_default("hidden_size", Value::from(2560u64));
    set_default("intermediate_size", Value::from(10240u64));
    set_default("num_attention_heads", Value::from(8u64));
    set_default("num_hidden_layers", Value::from(34u64));
    set_default("num_key_value_heads", Value::from(4u64));
    set_default("head_dim", Value::from(256u64));
    set_default("rms_norm_eps", Value::from(1e-6f64));
    set_default("rope_theta", Value::from(1_000_000f64));
    set_default("rope_local_base_freq", Value::from(10_000f64));
    set_default("query_pre_attn_scalar", Value::from(256u64));
    set_default("sliding_window", Value::from(1024u64));
    set_default("sliding_window_pattern", Value::from(6u64));
    set_default("max_position_embeddings", Value::from(131_072u64));
    set_default("vocab_size", Value::from(DEFAULT_VOCAB_SIZE));

    let config = serde_json::from_value::<Gemma3Config>(Value::Object(
        object.into_iter().collect(),
    ))?;
    Ok(config)
}

/// Weight files plus the tensor names they hold.
fn weight_files(model_dir: &Path) -> Result<(Vec<PathBuf>, Vec<String>)> {
    let index_path = model_dir.join("model.safetensors.index.json");
    if index_path.exists() {
        let index: Value = serde_json::from_str(&std::fs::read_to_string(&index_path)?)?;
        let weight_map = index
            .get("weight_map")
            .and_then(|m| m.as_object())
            .ok_or_else(|| {
                BabError::Runtime("Invalid model.safetensors.index.json format".to_string())
            })?;

        let mut shards: Vec<String> = weight_map
            .values()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        shards.sort();
        shards.dedup();

        let names = weight_map.keys().cloned().collect();
        return Ok((shards.iter().map(|f| model_dir.join(f)).collect(), names));
    }

    let single = model_dir.join("model.safetensors");
    if single.exists() {
        let tensors = unsafe { candle_core::safetensors::MmapedSafetensors::new(&single) }
            .map_err(runtime_error)?;
        let names = tensors.tensors().into_iter().map(|(name, _)| name).collect();
        return Ok((vec![single], names));
    }

    Err(BabError::Runtime(format!(
        "No safetensors weights in {}",
        model_dir.display()
    )))
}

fn argmax(logits: &Tensor) -> Result<u32> {
    let values = logits
        .to_dtype(DType::F32)
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(runtime_error)?;
    let (idx, _) = values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or_else(|| BabError::Runtime("Empty logits".to_string()))?;
    Ok(idx as u32)
}

/// Greedy pick from `[vocab]`, `[seq, vocab]` or `[batch, seq, vocab]` logits.
fn select_next_token(logits: &Tensor) -> Result<u32> {
    match logits.rank() {
        1 => argmax(logits),
        2 => {
            let seq_len = logits.dim(0).map_err(runtime_error)?;
            argmax(&logits.i(seq_len.saturating_sub(1)).map_err(runtime_error)?)
        }
        3 => {
            let seq_len = logits.dim(1).map_err(runtime_error)?;
            argmax(
                &logits
                    .i((0, seq_len.saturating_sub(1)))
                    .map_err(runtime_error)?,
            )
        }
        rank => Err(BabError::Runtime(format!(
            "Unexpected Gemma logits rank: {} with dims {:?}",
            rank,
            logits.dims()
        ))),
    }
}

/// Gemma 3 decoder with greedy sampling
pub struct GemmaGenerator {
    model: Mutex<Gemma3Model>,
    device: Device,
    stop_tokens: Vec<u32>,
}

impl GemmaGenerator {
    pub fn load(
        model_dir: &Path,
        tokenizer: &HfTokenizer,
        dtype: DType,
        device: &Device,
    ) -> Result<Self> {
        let config_str = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config = parse_config(&config_str)?;

        let (files, names) = weight_files(model_dir)?;
        let layout = detect_layout(names.iter().map(String::as_str));
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&files, dtype, device) }
            .map_err(runtime_error)?;
        let vb = match layout {
            WeightLayout::Plain => vb,
            WeightLayout::LanguageModelOuter => vb.pp("language_model"),
            WeightLayout::LanguageModelInner => vb.rename_f(|name: &str| {
                match name.strip_prefix("model.") {
                    Some(rest) => format!("model.language_model.{}", rest),
                    None => name.to_string(),
                }
            }),
        };

        let model = Gemma3Model::new(false, &config, vb).map_err(runtime_error)?;

        let stop_tokens: Vec<u32> = ["<end_of_turn>", "<eos>"]
            .iter()
            .filter_map(|t| tokenizer.token_to_id(t))
            .collect();
        if stop_tokens.is_empty() {
            return Err(BabError::Runtime(
                "Tokenizer defines neither <end_of_turn> nor <eos>".to_string(),
            ));
        }

        tracing::info!(
            "Loaded Gemma 3 model ({} layers, {:?} weights) from {}",
            config.num_hidden_layers,
            layout,
            model_dir.display()
        );

        Ok(Self {
            model: Mutex::new(model),
            device: device.clone(),
            stop_tokens,
        })
    }
}

impl ChatGenerator for GemmaGenerator {
    fn generate(&self, prompt_ids: &[u32], max_new_tokens: usize) -> Result<Vec<u32>> {
        if prompt_ids.is_empty() {
            return Err(BabError::InvalidInput(
                "Prompt produced no tokens".to_string(),
            ));
        }

        let mut model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
        model.clear_kv_cache();

        let prompt = Tensor::new(prompt_ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(runtime_error)?;
        let logits = model.forward(&prompt, 0).map_err(runtime_error)?;
        let mut next = select_next_token(&logits)?;

        let mut output = prompt_ids.to_vec();
        let mut offset = prompt_ids.len();
        for _ in 0..max_new_tokens {
            if self.stop_tokens.contains(&next) {
                break;
            }
            output.push(next);

            let input = Tensor::new(&[next], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(runtime_error)?;
            let logits = model.forward(&input, offset).map_err(runtime_error)?;
            offset += 1;
            next = select_next_token(&logits)?;
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_prefers_text_config() {
        let config = parse_config(
            r#"{
                "architectures": ["Gemma3ForConditionalGeneration"],
                "text_config": {"hidden_size": 1152, "num_hidden_layers": 26, "vocab_size": 1000}
            }"#,
        )
        .unwrap();
        assert_eq!(config.hidden_size, 1152);
        assert_eq!(config.num_hidden_layers, 26);
        assert_eq!(config.vocab_size, 1000);
        assert_eq!(config.head_dim, 256);
    }

    #[test]
    fn test_parse_config_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.hidden_size, 2560);
        assert_eq!(config.num_key_value_heads, 4);
        assert_eq!(config.vocab_size, DEFAULT_VOCAB_SIZE as usize);
    }

    #[test]
    fn test_parse_config_rejects_non_object() {
        assert!(parse_config("[1, 2]").is_err());
    }

    #[test]
    fn test_detect_layout() {
        assert_eq!(
            detect_layout(["model.embed_tokens.weight", "model.norm.weight"].into_iter()),
            WeightLayout::Plain
        );
        assert_eq!(
            detect_layout(["language_model.model.embed_tokens.weight"].into_iter()),
            WeightLayout::LanguageModelOuter
        );
        assert_eq!(
            detect_layout(
                [
                    "model.vision_tower.x.weight",
                    "model.language_model.embed_tokens.weight"
                ]
                .into_iter()
            ),
            WeightLayout::LanguageModelInner
        );
    }

    #[test]
    fn test_weight_files_from_index() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("model.safetensors.index.json"),
            r#"{"weight_map": {
                "a": "model-00002-of-00002.safetensors",
                "b": "model-00001-of-00002.safetensors",
                "c": "model-00001-of-00002.safetensors"
            }}"#,
        )
        .unwrap();

        let (files, names) = weight_files(temp_dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                temp_dir.path().join("model-00001-of-00002.safetensors"),
                temp_dir.path().join("model-00002-of-00002.safetensors"),
            ]
        );
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_weight_files_missing() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert!(weight_files(temp_dir.path()).is_err());
    }

    #[test]
    fn test_select_next_token_by_rank() {
        let device = Device::Cpu;
        let flat = Tensor::new(&[0.1f32, 0.9, 0.3], &device).unwrap();
        assert_eq!(select_next_token(&flat).unwrap(), 1);

        let batched = Tensor::new(&[[[0.5f32, 0.1, 0.2], [0.0, 0.1, 0.7]]], &device).unwrap();
        assert_eq!(select_next_token(&batched).unwrap(), 2);
    }
}
