// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BLIP text decoder
//!
//! Greedy autoregressive generation conditioned on the vision encoder's
//! hidden states, plus the tokenizer used to turn ids back into text.

use anyhow::{anyhow, Context, Result};
use ndarray::{Array2, Array3, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

/// Default maximum caption length, BOS included
pub const DEFAULT_MAX_LENGTH: usize = 20;

/// Upper bound accepted for `max_length`
pub const MAX_LENGTH_LIMIT: usize = 512;

/// `[DEC]` token that starts every BLIP caption
pub const DEFAULT_BOS_TOKEN_ID: u32 = 30522;

/// `[SEP]` token that ends generation
pub const DEFAULT_EOS_TOKEN_ID: u32 = 102;

/// `[PAD]` token
pub const DEFAULT_PAD_TOKEN_ID: u32 = 0;

/// BLIP text decoder session and tokenizer
#[derive(Clone)]
pub struct BlipTextDecoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    input_names: Vec<String>,
    max_length: usize,
    bos_token_id: u32,
    eos_token_id: u32,
    pad_token_id: u32,
}

impl std::fmt::Debug for BlipTextDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlipTextDecoder")
            .field("input_names", &self.input_names)
            .field("max_length", &self.max_length)
            .field("bos_token_id", &self.bos_token_id)
            .field("eos_token_id", &self.eos_token_id)
            .finish_non_exhaustive()
    }
}

impl BlipTextDecoder {
    /// Load `text_decoder_model.onnx` and `tokenizer.json`
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        tokenizer_path: P,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("BLIP text decoder not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("BLIP tokenizer not found: {}", tokenizer_path.display());
        }

        info!("Loading BLIP text decoder from {}", model_path.display());

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        info!(
            "Loaded tokenizer with {} tokens",
            tokenizer.get_vocab_size(true)
        );

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!(
                    "Failed to load BLIP text decoder from {}",
                    model_path.display()
                )
            })?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        debug!("Decoder inputs: {:?}", input_names);

        if !input_names.iter().any(|n| n == "input_ids")
            || !input_names.iter().any(|n| n == "encoder_hidden_states")
        {
            anyhow::bail!(
                "BLIP text decoder has unexpected inputs: {:?}",
                input_names
            );
        }

        let bos_token_id = tokenizer
            .token_to_id("[DEC]")
            .unwrap_or(DEFAULT_BOS_TOKEN_ID);
        let eos_token_id = tokenizer
            .token_to_id("[SEP]")
            .unwrap_or(DEFAULT_EOS_TOKEN_ID);
        let pad_token_id = tokenizer
            .token_to_id("[PAD]")
            .unwrap_or(DEFAULT_PAD_TOKEN_ID);

        debug!(
            "Special tokens - BOS: {}, EOS: {}, PAD: {}",
            bos_token_id, eos_token_id, pad_token_id
        );
        info!("✅ BLIP text decoder loaded (CPU)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            input_names,
            max_length: DEFAULT_MAX_LENGTH,
            bos_token_id,
            eos_token_id,
            pad_token_id,
        })
    }

    /// Set the maximum caption length (BOS included)
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.clamp(2, MAX_LENGTH_LIMIT);
        self
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Greedy generation from encoder hidden states [1, seq_len, hidden]
    pub fn generate(&self, encoder_hidden_states: &Array3<f32>) -> Result<Vec<u32>> {
        let tokens = greedy_decode(
            self.bos_token_id,
            self.eos_token_id,
            self.max_length,
            |ids| self.forward(encoder_hidden_states, ids),
        )?;
        debug!("Generated {} tokens: {:?}", tokens.len(), tokens);
        Ok(tokens)
    }

    /// Turn token ids into text, dropping special tokens
    pub fn decode(&self, token_ids: &[u32]) -> Result<String> {
        let ids: Vec<u32> = token_ids
            .iter()
            .copied()
            .filter(|&id| {
                id != self.bos_token_id && id != self.eos_token_id && id != self.pad_token_id
            })
            .collect();

        let text = self
            .tokenizer
            .decode(&ids, true)
            .map_err(|e| anyhow!("Decoding failed: {}", e))?;

        Ok(text.trim().to_string())
    }

    /// Single decoder pass returning logits for the last position
    fn forward(&self, encoder_hidden_states: &Array3<f32>, input_ids: &[u32]) -> Result<Vec<f32>> {
        let seq_len = input_ids.len();
        let encoder_len = encoder_hidden_states.shape()[1];

        let ids = Array2::from_shape_vec(
            (1, seq_len),
            input_ids.iter().map(|&id| id as i64).collect(),
        )
        .context("Failed to shape input_ids")?;

        let mut inputs: Vec<(String, SessionInputValue<'_>)> =
            Vec::with_capacity(self.input_names.len());

        for name in &self.input_names {
            let value = match name.as_str() {
                "input_ids" => Value::from_array(ids.clone())
                    .context("Failed to create input_ids tensor")?
                    .into_dyn(),
                "attention_mask" => Value::from_array(Array2::<i64>::ones((1, seq_len)))
                    .context("Failed to create attention_mask tensor")?
                    .into_dyn(),
                "encoder_hidden_states" => Value::from_array(encoder_hidden_states.to_owned())
                    .context("Failed to create encoder_hidden_states tensor")?
                    .into_dyn(),
                "encoder_attention_mask" => {
                    Value::from_array(Array2::<i64>::ones((1, encoder_len)))
                        .context("Failed to create encoder_attention_mask tensor")?
                        .into_dyn()
                }
                other => anyhow::bail!("Unsupported decoder input: {}", other),
            };
            inputs.push((name.clone(), SessionInputValue::from(value)));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("BLIP decoder session lock poisoned"))?;

        let outputs = session.run(inputs).context("Decoder inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract logits")?
            .to_owned()
            .into_dimensionality::<Ix3>()
            .map_err(|e| anyhow!("Unexpected logits shape: {}", e))?;

        let last_pos = logits.shape()[1]
            .checked_sub(1)
            .ok_or_else(|| anyhow!("Decoder returned empty sequence"))?;

        Ok(logits.slice(ndarray::s![0, last_pos, ..]).to_vec())
    }
}

/// Greedy decoding loop
///
/// Starts from `bos`, appends the arg-max token of each step until `eos`
/// is produced or the sequence reaches `max_length`. The returned ids
/// start with `bos` and include `eos` when it was generated.
pub fn greedy_decode<F>(bos: u32, eos: u32, max_length: usize, mut step: F) -> Result<Vec<u32>>
where
    F: FnMut(&[u32]) -> Result<Vec<f32>>,
{
    let mut tokens = vec![bos];

    while tokens.len() < max_length {
        let logits = step(&tokens)?;
        let next = argmax(&logits).ok_or_else(|| anyhow!("Empty logits vector"))?;
        tokens.push(next);

        if next == eos {
            debug!("Generation stopped at EOS after {} tokens", tokens.len());
            return Ok(tokens);
        }
    }

    debug!("Generation reached max_length {}", max_length);
    Ok(tokens)
}

/// Index of the largest logit; NaN entries never win
pub fn argmax(logits: &[f32]) -> Option<u32> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in logits.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if current >= value => {}
            _ => best = Some((idx, value)),
        }
    }
    if best.is_none() && !logits.is_empty() {
        warn!("All {} logits are NaN", logits.len());
    }
    best.map(|(idx, _)| idx as u32)
}
