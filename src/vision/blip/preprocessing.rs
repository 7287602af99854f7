// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the BLIP vision encoder

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Input resolution of blip-image-captioning-base
pub const BLIP_INPUT_SIZE: u32 = 384;

/// CLIP normalization mean values (BLIP reuses the CLIP statistics)
pub const MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];

/// CLIP normalization std values
pub const STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Resize and normalization settings, mirroring `preprocessor_config.json`
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub width: u32,
    pub height: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub rescale_factor: f32,
    pub do_resize: bool,
    pub do_normalize: bool,
    pub filter: FilterType,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: BLIP_INPUT_SIZE,
            height: BLIP_INPUT_SIZE,
            mean: MEAN,
            std: STD,
            rescale_factor: 1.0 / 255.0,
            do_resize: true,
            do_normalize: true,
            // resample = 3 (bicubic)
            filter: FilterType::CatmullRom,
        }
    }
}

impl PreprocessConfig {
    /// Read a Hugging Face `preprocessor_config.json`
    ///
    /// Keys that are absent keep the BLIP defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self::from_json(&value))
    }

    pub fn from_json(value: &Value) -> Self {
        let mut config = Self::default();

        // `size` is either an int or {"height": h, "width": w} / {"shortest_edge": s}
        match value.get("size") {
            Some(Value::Number(n)) => {
                if let Some(s) = n.as_u64() {
                    config.width = s as u32;
                    config.height = s as u32;
                }
            }
            Some(Value::Object(map)) => {
                let edge = map.get("shortest_edge").and_then(Value::as_u64);
                if let Some(h) = map.get("height").and_then(Value::as_u64).or(edge) {
                    config.height = h as u32;
                }
                if let Some(w) = map.get("width").and_then(Value::as_u64).or(edge) {
                    config.width = w as u32;
                }
            }
            _ => {}
        }

        if let Some(mean) = read_triplet(value, "image_mean") {
            config.mean = mean;
        }
        if let Some(std) = read_triplet(value, "image_std") {
            config.std = std;
        }
        if let Some(factor) = value.get("rescale_factor").and_then(Value::as_f64) {
            config.rescale_factor = factor as f32;
        }
        if let Some(flag) = value.get("do_resize").and_then(Value::as_bool) {
            config.do_resize = flag;
        }
        if let Some(flag) = value.get("do_normalize").and_then(Value::as_bool) {
            config.do_normalize = flag;
        }
        if let Some(resample) = value.get("resample").and_then(Value::as_u64) {
            config.filter = match resample {
                0 => FilterType::Nearest,
                2 => FilterType::Triangle,
                1 => FilterType::Lanczos3,
                _ => FilterType::CatmullRom,
            };
        }

        debug!("Preprocess config: {:?}", config);
        config
    }

    /// Convert an image to `pixel_values` of shape [1, 3, height, width]
    pub fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let rgb = if self.do_resize
            && (image.width() != self.width || image.height() != self.height)
        {
            image
                .resize_exact(self.width, self.height, self.filter)
                .to_rgb8()
        } else {
            image.to_rgb8()
        };

        let (w, h) = (rgb.width() as usize, rgb.height() as usize);
        let mut tensor = Array4::zeros((1, 3, h, w));

        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                let mut value = pixel[c] as f32 * self.rescale_factor;
                if self.do_normalize {
                    value = (value - self.mean[c]) / self.std[c];
                }
                tensor[[0, c, y as usize, x as usize]] = value;
            }
        }

        tensor
    }
}

fn read_triplet(value: &Value, key: &str) -> Option<[f32; 3]> {
    let arr = value.get(key)?.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    let mut out = [0.0f32; 3];
    for (slot, v) in out.iter_mut().zip(arr) {
        *slot = v.as_f64()? as f32;
    }
    Some(out)
}

/// Preprocess with the default BLIP settings
pub fn preprocess_for_blip(image: &DynamicImage) -> Array4<f32> {
    PreprocessConfig::default().preprocess(image)
}
