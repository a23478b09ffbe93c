// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! M2M100 / NLLB encoder-decoder
//!
//! Pre-norm transformer with sinusoidal positions and a shared embedding
//! tied to the output projection. Decoding is greedy with the target
//! language token forced at the first generated position.

use std::path::Path;

use candle_core::{DType, Device, IndexOp, Module, Tensor, D};
use candle_nn::{layer_norm, linear, Embedding, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;

use super::{runtime_error, CandleResult};
use crate::error::{BabError, Result};
use crate::runtime::Seq2SeqGenerator;

const LAYER_NORM_EPS: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Gelu,
}

/// Fields of an M2M100 `config.json` used by the generator
#[derive(Debug, Clone, Deserialize)]
pub struct M2M100Config {
    pub vocab_size: usize,
    pub d_model: usize,
    pub encoder_layers: usize,
    pub decoder_layers: usize,
    pub encoder_attention_heads: usize,
    pub decoder_attention_heads: usize,
    pub encoder_ffn_dim: usize,
    pub decoder_ffn_dim: usize,
    #[serde(default = "default_max_position_embeddings")]
    pub max_position_embeddings: usize,
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: u32,
    #[serde(default = "default_eos_token_id")]
    pub eos_token_id: u32,
    #[serde(default = "default_eos_token_id")]
    pub decoder_start_token_id: u32,
    #[serde(default = "default_true")]
    pub scale_embedding: bool,
    #[serde(default = "default_activation")]
    pub activation_function: Activation,
}

fn default_max_position_embeddings() -> usize {
    1024
}

fn default_pad_token_id() -> u32 {
    1
}

fn default_eos_token_id() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

fn default_activation() -> Activation {
    Activation::Relu
}

impl M2M100Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn embed_scale(&self) -> f64 {
        if self.scale_embedding {
            (self.d_model as f64).sqrt()
        } else {
            1.0
        }
    }
}

/// Sinusoidal table with `num_positions` rows, the padding row zeroed.
fn sinusoidal_positions(
    num_positions: usize,
    embed_dim: usize,
    padding_idx: usize,
    dtype: DType,
    device: &Device,
) -> CandleResult<Tensor> {
    let half_dim = embed_dim / 2;
    let scale = (10000f64).ln() / (half_dim.saturating_sub(1).max(1)) as f64;

    let mut table = vec![0f32; num_positions * embed_dim];
    for pos in 0..num_positions {
        if pos == padding_idx {
            continue;
        }
        let row = &mut table[pos * embed_dim..(pos + 1) * embed_dim];
        for i in 0..half_dim {
            let angle = pos as f64 * (-scale * i as f64).exp();
            row[i] = angle.sin() as f32;
            row[half_dim + i] = angle.cos() as f32;
        }
    }

    Tensor::from_vec(table, (num_positions, embed_dim), device)?.to_dtype(dtype)
}

struct Attention {
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
    num_heads: usize,
    head_dim: usize,
    scale: f64,
}

impl Attention {
    fn new(embed_dim: usize, num_heads: usize, vb: VarBuilder) -> CandleResult<Self> {
        let head_dim = embed_dim / num_heads;
        Ok(Self {
            q_proj: linear(embed_dim, embed_dim, vb.pp("q_proj"))?,
            k_proj: linear(embed_dim, embed_dim, vb.pp("k_proj"))?,
            v_proj: linear(embed_dim, embed_dim, vb.pp("v_proj"))?,
            out_proj: linear(embed_dim, embed_dim, vb.pp("out_proj"))?,
            num_heads,
            head_dim,
            scale: (head_dim as f64).powf(-0.5),
        })
    }

    fn split_heads(&self, xs: &Tensor, batch: usize, len: usize) -> CandleResult<Tensor> {
        xs.reshape((batch, len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, query: &Tensor, key_value: &Tensor, mask: Option<&Tensor>) -> CandleResult<Tensor> {
        let (batch, tgt_len, _) = query.dims3()?;
        let (_, src_len, _) = key_value.dims3()?;

        let q = self.split_heads(&(self.q_proj.forward(query)? * self.scale)?, batch, tgt_len)?;
        let k = self.split_heads(&self.k_proj.forward(key_value)?, batch, src_len)?;
        let v = self.split_heads(&self.v_proj.forward(key_value)?, batch, src_len)?;

        let mut weights = q.matmul(&k.transpose(2, 3)?.contiguous()?)?;
        if let Some(mask) = mask {
            weights = weights.broadcast_add(mask)?;
        }
        let weights = candle_nn::ops::softmax_last_dim(&weights)?;

        weights
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, tgt_len, self.num_heads * self.head_dim))?
            .apply(&self.out_proj)
    }
}

struct FeedForward {
    fc1: Linear,
    fc2: Linear,
    activation: Activation,
}

impl FeedForward {
    fn new(embed_dim: usize, ffn_dim: usize, activation: Activation, vb: &VarBuilder) -> CandleResult<Self> {
        Ok(Self {
            fc1: linear(embed_dim, ffn_dim, vb.pp("fc1"))?,
            fc2: linear(ffn_dim, embed_dim, vb.pp("fc2"))?,
            activation,
        })
    }

    fn forward(&self, xs: &Tensor) -> CandleResult<Tensor> {
        let xs = self.fc1.forward(xs)?;
        let xs = match self.activation {
            Activation::Relu => xs.relu()?,
            Activation::Gelu => xs.gelu_erf()?,
        };
        self.fc2.forward(&xs)
    }
}

struct EncoderLayer {
    self_attn: Attention,
    self_attn_layer_norm: LayerNorm,
    ffn: FeedForward,
    final_layer_norm: LayerNorm,
}

impl EncoderLayer {
    fn new(config: &M2M100Config, vb: VarBuilder) -> CandleResult<Self> {
        let dim = config.d_model;
        Ok(Self {
            self_attn: Attention::new(dim, config.encoder_attention_heads, vb.pp("self_attn"))?,
            self_attn_layer_norm: layer_norm(dim, LAYER_NORM_EPS, vb.pp("self_attn_layer_norm"))?,
            ffn: FeedForward::new(dim, config.encoder_ffn_dim, config.activation_function, &vb)?,
            final_layer_norm: layer_norm(dim, LAYER_NORM_EPS, vb.pp("final_layer_norm"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> CandleResult<Tensor> {
        let normed = self.self_attn_layer_norm.forward(xs)?;
        let xs = (xs + self.self_attn.forward(&normed, &normed, None)?)?;

        let normed = self.final_layer_norm.forward(&xs)?;
        &xs + self.ffn.forward(&normed)?
    }
}

struct DecoderLayer {
    self_attn: Attention,
    self_attn_layer_norm: LayerNorm,
    encoder_attn: Attention,
    encoder_attn_layer_norm: LayerNorm,
    ffn: FeedForward,
    final_layer_norm: LayerNorm,
}

impl DecoderLayer {
    fn new(config: &M2M100Config, vb: VarBuilder) -> CandleResult<Self> {
        let dim = config.d_model;
        let heads = config.decoder_attention_heads;
        Ok(Self {
            self_attn: Attention::new(dim, heads, vb.pp("self_attn"))?,
            self_attn_layer_norm: layer_norm(dim, LAYER_NORM_EPS, vb.pp("self_attn_layer_norm"))?,
            encoder_attn: Attention::new(dim, heads, vb.pp("encoder_attn"))?,
            encoder_attn_layer_norm: layer_norm(
                dim,
                LAYER_NORM_EPS,
                vb.pp("encoder_attn_layer_norm"),
            )?,
            ffn: FeedForward::new(dim, config.decoder_ffn_dim, config.activation_function, &vb)?,
            final_layer_norm: layer_norm(dim, LAYER_NORM_EPS, vb.pp("final_layer_norm"))?,
        })
    }

    fn forward(&self, xs: &Tensor, encoder_out: &Tensor, causal_mask: &Tensor) -> CandleResult<Tensor> {
        let normed = self.self_attn_layer_norm.forward(xs)?;
        let xs = (xs + self.self_attn.forward(&normed, &normed, Some(causal_mask))?)?;

        let normed = self.encoder_attn_layer_norm.forward(&xs)?;
        let xs = (&xs + self.encoder_attn.forward(&normed, encoder_out, None)?)?;

        let normed = self.final_layer_norm.forward(&xs)?;
        &xs + self.ffn.forward(&normed)?
    }
}

/// Token embedding plus sinusoidal positions, shared by both stacks
struct Embeddings {
    tokens: Embedding,
    positions: Tensor,
    scale: f64,
    padding_idx: usize,
}

impl Embeddings {
    fn forward(&self, ids: &Tensor) -> CandleResult<Tensor> {
        let (_, seq_len) = ids.dims2()?;
        let tokens = (self.tokens.forward(ids)? * self.scale)?;

        let position_ids: Vec<u32> = (0..seq_len)
            .map(|i| (self.padding_idx + 1 + i) as u32)
            .collect();
        let position_ids = Tensor::new(position_ids.as_slice(), ids.device())?;
        let positions = self.positions.index_select(&position_ids, 0)?.unsqueeze(0)?;

        tokens.broadcast_add(&positions)
    }
}

struct M2M100Model {
    embeddings: Embeddings,
    encoder_layers: Vec<EncoderLayer>,
    encoder_norm: LayerNorm,
    decoder_layers: Vec<DecoderLayer>,
    decoder_norm: LayerNorm,
    lm_head: Linear,
    dtype: DType,
}

impl M2M100Model {
    fn new(config: &M2M100Config, vb: VarBuilder) -> CandleResult<Self> {
        let dim = config.d_model;
        let shared_name = if vb.contains_tensor("model.shared.weight") {
            "model.shared.weight"
        } else {
            "model.encoder.embed_tokens.weight"
        };
        let shared = vb.get((config.vocab_size, dim), shared_name)?;

        let padding_idx = config.pad_token_id as usize;
        let positions = sinusoidal_positions(
            config.max_position_embeddings + 2,
            dim,
            padding_idx,
            vb.dtype(),
            vb.device(),
        )?;

        let vb_enc = vb.pp("model.encoder");
        let encoder_layers = (0..config.encoder_layers)
            .map(|i| EncoderLayer::new(config, vb_enc.pp(format!("layers.{}", i))))
            .collect::<CandleResult<Vec<_>>>()?;
        let encoder_norm = layer_norm(dim, LAYER_NORM_EPS, vb_enc.pp("layer_norm"))?;

        let vb_dec = vb.pp("model.decoder");
        let decoder_layers = (0..config.decoder_layers)
            .map(|i| DecoderLayer::new(config, vb_dec.pp(format!("layers.{}", i))))
            .collect::<CandleResult<Vec<_>>>()?;
        let decoder_norm = layer_norm(dim, LAYER_NORM_EPS, vb_dec.pp("layer_norm"))?;

        Ok(Self {
            embeddings: Embeddings {
                tokens: Embedding::new(shared.clone(), dim),
                positions,
                scale: config.embed_scale(),
                padding_idx,
            },
            encoder_layers,
            encoder_norm,
            decoder_layers,
            decoder_norm,
            lm_head: Linear::new(shared, None),
            dtype: vb.dtype(),
        })
    }

    fn encode(&self, input_ids: &Tensor) -> CandleResult<Tensor> {
        let mut xs = self.embeddings.forward(input_ids)?;
        for layer in &self.encoder_layers {
            xs = layer.forward(&xs)?;
        }
        self.encoder_norm.forward(&xs)
    }

    /// Logits for the last decoder position.
    fn decode_step(&self, decoder_ids: &Tensor, encoder_out: &Tensor) -> CandleResult<Tensor> {
        let (_, seq_len) = decoder_ids.dims2()?;
        let mask = causal_mask(seq_len, self.dtype, decoder_ids.device())?;

        let mut xs = self.embeddings.forward(decoder_ids)?;
        for layer in &self.decoder_layers {
            xs = layer.forward(&xs, encoder_out, &mask)?;
        }
        let xs = self.decoder_norm.forward(&xs)?;
        self.lm_head.forward(&xs.i((.., seq_len - 1, ..))?)
    }
}

fn causal_mask(seq_len: usize, dtype: DType, device: &Device) -> CandleResult<Tensor> {
    let mask: Vec<f32> = (0..seq_len)
        .flat_map(|i| (0..seq_len).map(move |j| if j > i { f32::NEG_INFINITY } else { 0.0 }))
        .collect();
    Tensor::from_vec(mask, (1, 1, seq_len, seq_len), device)?.to_dtype(dtype)
}

/// Greedy M2M100 generator
pub struct M2M100Generator {
    model: M2M100Model,
    config: M2M100Config,
    device: Device,
}

impl M2M100Generator {
    /// Load `config.json` plus `model.safetensors` or `pytorch_model.bin`.
    pub fn load(model_dir: &Path, dtype: DType, device: &Device) -> Result<Self> {
        let config = M2M100Config::from_file(&model_dir.join("config.json"))?;

        let safetensors = model_dir.join("model.safetensors");
        let pytorch = model_dir.join("pytorch_model.bin");
        let vb = if safetensors.exists() {
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], dtype, device) }
                .map_err(runtime_error)?
        } else if pytorch.exists() {
            VarBuilder::from_pth(&pytorch, dtype, device).map_err(runtime_error)?
        } else {
            return Err(BabError::Runtime(format!(
                "No model weights in {}",
                model_dir.display()
            )));
        };

        let generator = Self::from_var_builder(config, vb, device)?;
        tracing::info!(
            "Loaded M2M100 model ({} encoder / {} decoder layers) from {}",
            generator.config.encoder_layers,
            generator.config.decoder_layers,
            model_dir.display()
        );
        Ok(generator)
    }

    pub fn from_var_builder(config: M2M100Config, vb: VarBuilder, device: &Device) -> Result<Self> {
        let model = M2M100Model::new(&config, vb).map_err(runtime_error)?;
        Ok(Self {
            model,
            config,
            device: device.clone(),
        })
    }

    fn generate_inner(
        &self,
        input_ids: &[u32],
        forced_bos_token_id: u32,
        max_length: usize,
    ) -> CandleResult<Vec<u32>> {
        let input = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let encoder_out = self.model.encode(&input)?;

        let mut output = vec![self.config.decoder_start_token_id];
        while output.len() < max_length {
            let next = if output.len() == 1 {
                forced_bos_token_id
            } else {
                let decoder_ids = Tensor::new(output.as_slice(), &self.device)?.unsqueeze(0)?;
                let logits = self.model.decode_step(&decoder_ids, &encoder_out)?;
                logits.squeeze(0)?.argmax(D::Minus1)?.to_scalar::<u32>()?
            };
            output.push(next);
            if next == self.config.eos_token_id {
                break;
            }
        }
        Ok(output)
    }
}

impl Seq2SeqGenerator for M2M100Generator {
    fn generate(
        &self,
        input_ids: &[u32],
        forced_bos_token_id: u32,
        max_length: usize,
    ) -> Result<Vec<u32>> {
        if input_ids.is_empty() {
            return Err(BabError::InvalidInput("Empty encoder input".to_string()));
        }
        self.generate_inner(input_ids, forced_bos_token_id, max_length)
            .map_err(runtime_error)
    }

    fn eos_token_id(&self) -> u32 {
        self.config.eos_token_id
    }

    fn max_source_positions(&self) -> usize {
        self.config.max_position_embeddings
    }
}
