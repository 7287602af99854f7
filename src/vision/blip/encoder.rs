// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BLIP vision encoder (ViT-B/16)
//!
//! Turns `pixel_values` into the patch embeddings the text decoder
//! cross-attends to.

use anyhow::{anyhow, Context, Result};
use ndarray::{Array3, Array4, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::BLIP_INPUT_SIZE;

/// Hidden size of the base vision tower
pub const VISION_HIDDEN_SIZE: usize = 768;

/// BLIP vision encoder session
#[derive(Clone)]
pub struct BlipVisionEncoder {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for BlipVisionEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlipVisionEncoder")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl BlipVisionEncoder {
    /// Load `vision_model.onnx`
    ///
    /// # Errors
    /// Fails when the file is missing or ONNX Runtime cannot build a session.
    pub fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("BLIP vision model not found: {}", model_path.display());
        }

        info!("Loading BLIP vision encoder from {}", model_path.display());

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
                    "Failed to load BLIP vision model from {}",
                    model_path.display()
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .unwrap_or_else(|| "last_hidden_state".to_string());

        debug!(
            "BLIP encoder loaded - input: {}, output: {}",
            input_name, output_name
        );
        info!("✅ BLIP vision encoder loaded (CPU)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
        })
    }

    /// Encode `pixel_values` [1, 3, H, W] into hidden states [1, seq_len, hidden]
    pub fn encode(&self, pixel_values: &Array4<f32>) -> Result<Array3<f32>> {
        validate_pixel_values(pixel_values.shape())?;

        let input_value =
            Value::from_array(pixel_values.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("BLIP encoder session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Encoder inference failed")?;

        let output_tensor = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .context("Failed to extract encoder output")?;

        debug!("Encoder output shape: {:?}", output_tensor.shape());

        let hidden = output_tensor
            .to_owned()
            .into_dimensionality::<Ix3>()
            .map_err(|e| anyhow!("Unexpected encoder output shape: {}", e))?;

        Ok(hidden)
    }
}

/// Shape check for `pixel_values`; only batch size 1 is supported
fn validate_pixel_values(shape: &[usize]) -> Result<()> {
    if shape.len() != 4 || shape[0] != 1 || shape[1] != 3 {
        anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
    }
    if shape[2] != BLIP_INPUT_SIZE as usize || shape[3] != BLIP_INPUT_SIZE as usize {
        debug!(
            "Input size {}x{} differs from expected {}x{}",
            shape[3], shape[2], BLIP_INPUT_SIZE, BLIP_INPUT_SIZE
        );
    }
    Ok(())
}
