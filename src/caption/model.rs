// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Captioning model seam

use anyhow::Result;
use image::DynamicImage;
use ndarray::Array4;

/// A pretrained image-to-text model
///
/// Implementations are loaded once and shared behind `Arc`, so every
/// method takes `&self`. Calls are CPU-bound and blocking.
pub trait CaptionModel: Send + Sync {
    /// Human readable model identifier (e.g. the Hub repo name)
    fn name(&self) -> &str;

    /// Resize and normalize an RGB image into `pixel_values` [1, 3, H, W]
    fn preprocess(&self, image: &DynamicImage) -> Result<Array4<f32>>;

    /// Run generation with the model's default decoding parameters
    fn generate(&self, pixel_values: &Array4<f32>) -> Result<Vec<u32>>;

    /// Decode token ids to text with special tokens removed
    fn decode(&self, token_ids: &[u32]) -> Result<String>;
}
