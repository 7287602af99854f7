// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BLIP captioning pipeline
//!
//! Combines preprocessing, the vision encoder and the text decoder behind
//! the [`CaptionModel`] trait.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::decoder::{BlipTextDecoder, DEFAULT_MAX_LENGTH};
use super::encoder::BlipVisionEncoder;
use super::preprocessing::PreprocessConfig;
use crate::caption::CaptionModel;

pub const VISION_MODEL_FILE: &str = "vision_model.onnx";
pub const TEXT_DECODER_FILE: &str = "text_decoder_model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PREPROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";

/// Options applied when loading a BLIP model
#[derive(Debug, Clone)]
pub struct BlipOptions {
    pub max_length: usize,
    pub intra_threads: usize,
    /// Display name reported by [`CaptionModel::name`]
    pub name: String,
}

impl Default for BlipOptions {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            intra_threads: 4,
            name: crate::config::DEFAULT_MODEL_REPO.to_string(),
        }
    }
}

/// Resolved locations of the files a BLIP model needs
#[derive(Debug, Clone, PartialEq)]
pub struct BlipFiles {
    pub vision_model: PathBuf,
    pub text_decoder: PathBuf,
    pub tokenizer: PathBuf,
    pub preprocessor_config: Option<PathBuf>,
}

impl BlipFiles {
    /// Locate model files in `dir`, checking `dir/onnx/` before `dir/`
    pub fn locate<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            anyhow::bail!("BLIP model directory not found: {}", dir.display());
        }

        Ok(Self {
            vision_model: find_model_file(dir, VISION_MODEL_FILE)?,
            text_decoder: find_model_file(dir, TEXT_DECODER_FILE)?,
            tokenizer: find_model_file(dir, TOKENIZER_FILE)?,
            preprocessor_config: find_model_file(dir, PREPROCESSOR_CONFIG_FILE).ok(),
        })
    }
}

fn find_model_file(dir: &Path, name: &str) -> Result<PathBuf> {
    let candidates = [dir.join("onnx").join(name), dir.join(name)];
    for path in &candidates {
        if path.exists() {
            return Ok(path.clone());
        }
    }
    anyhow::bail!(
        "Model file {} not found in {}. Tried: {:?}",
        name,
        dir.display(),
        candidates
    );
}

/// BLIP image captioning model (ONNX)
#[derive(Clone)]
pub struct BlipModel {
    encoder: BlipVisionEncoder,
    decoder: BlipTextDecoder,
    preprocess: PreprocessConfig,
    name: String,
}

impl std::fmt::Debug for BlipModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlipModel")
            .field("name", &self.name)
            .field("max_length", &self.decoder.max_length())
            .finish_non_exhaustive()
    }
}

impl BlipModel {
    /// Load from a local directory laid out like the Hub repo
    pub fn from_dir<P: AsRef<Path>>(model_dir: P, options: &BlipOptions) -> Result<Self> {
        let files = BlipFiles::locate(model_dir.as_ref())?;
        Self::from_files(&files, options)
    }

    /// Load from explicit file locations
    pub fn from_files(files: &BlipFiles, options: &BlipOptions) -> Result<Self> {
        let start = Instant::now();
        info!("Loading BLIP model '{}'", options.name);

        let preprocess = match &files.preprocessor_config {
            Some(path) => PreprocessConfig::from_file(path)?,
            None => {
                debug!("No preprocessor_config.json, using BLIP defaults");
                PreprocessConfig::default()
            }
        };

        let encoder = BlipVisionEncoder::new(&files.vision_model, options.intra_threads)
            .context("Failed to load BLIP vision encoder")?;

        let decoder =
            BlipTextDecoder::new(&files.text_decoder, &files.tokenizer, options.intra_threads)
                .context("Failed to load BLIP text decoder")?
                .with_max_length(options.max_length);

        info!(
            "✅ BLIP pipeline ready in {}ms (CPU)",
            start.elapsed().as_millis()
        );

        Ok(Self {
            encoder,
            decoder,
            preprocess,
            name: options.name.clone(),
        })
    }

    pub fn max_length(&self) -> usize {
        self.decoder.max_length()
    }

    pub fn preprocess_config(&self) -> &PreprocessConfig {
        &self.preprocess
    }
}

impl CaptionModel for BlipModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn preprocess(&self, image: &DynamicImage) -> Result<Array4<f32>> {
        if image.width() == 0 || image.height() == 0 {
            anyhow::bail!("Image has zero size: {}x{}", image.width(), image.height());
        }
        Ok(self.preprocess.preprocess(image))
    }

    fn generate(&self, pixel_values: &Array4<f32>) -> Result<Vec<u32>> {
        let start = Instant::now();

        let hidden = self
            .encoder
            .encode(pixel_values)
            .context("Failed to encode image")?;
        debug!("Encoded image to {:?}", hidden.shape());

        let tokens = self
            .decoder
            .generate(&hidden)
            .context("Failed to generate caption tokens")?;

        if tokens.len() <= 1 {
            warn!("Decoder produced no caption tokens");
        }
        debug!(
            "Generated {} tokens in {}ms",
            tokens.len(),
            start.elapsed().as_millis()
        );
        Ok(tokens)
    }

    fn decode(&self, token_ids: &[u32]) -> Result<String> {
        self.decoder.decode(token_ids)
    }
}
