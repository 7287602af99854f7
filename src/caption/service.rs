// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption service shared by every front-end

use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::error::CaptionError;
use super::fetch::ImageFetcher;
use super::input::ImageInput;
use super::model::CaptionModel;
use crate::config::DEFAULT_MAX_IMAGE_BYTES;
use crate::vision::image_utils::{decode_image_bytes_with_limit, normalize_to_rgb};

/// A successful caption with its metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub text: String,
    pub width: u32,
    pub height: u32,
    pub token_count: usize,
    pub processing_time_ms: u64,
}

/// Where the bytes being decoded came from; selects the failure category
#[derive(Debug, Clone, Copy)]
enum Origin {
    Upload,
    Url,
}

/// Produces one caption per image
///
/// Holds the shared model handle and the URL fetcher. Cloning is cheap.
#[derive(Clone)]
pub struct CaptionService {
    model: Arc<dyn CaptionModel>,
    fetcher: ImageFetcher,
    max_image_bytes: usize,
}

impl std::fmt::Debug for CaptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionService")
            .field("model", &self.model.name())
            .field("max_image_bytes", &self.max_image_bytes)
            .finish_non_exhaustive()
    }
}

impl CaptionService {
    pub fn new(model: Arc<dyn CaptionModel>, fetcher: ImageFetcher) -> Self {
        Self {
            model,
            fetcher,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Limit for uploaded byte payloads
    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Caption an image and render the outcome as a single string
    ///
    /// Failures come back as `❌`-prefixed messages; this never returns an
    /// error or panics.
    pub async fn generate_caption(&self, input: Option<ImageInput>) -> String {
        match self.caption(input).await {
            Ok(caption) => caption.text,
            Err(e) => {
                warn!("Caption failed ({}): {}", e.kind(), e);
                e.render()
            }
        }
    }

    /// Caption an image, keeping the failure category
    pub async fn caption(&self, input: Option<ImageInput>) -> Result<Caption, CaptionError> {
        let start = Instant::now();

        let (bytes, origin) = match input {
            None => return Err(CaptionError::MissingInput),
            Some(ImageInput::Bytes(bytes)) if bytes.is_empty() => {
                return Err(CaptionError::MissingInput)
            }
            Some(ImageInput::Url(url)) if url.trim().is_empty() => {
                return Err(CaptionError::MissingInput)
            }
            Some(ImageInput::Bytes(bytes)) => (bytes, Origin::Upload),
            Some(ImageInput::Url(url)) => {
                let bytes = self
                    .fetcher
                    .fetch(url.trim())
                    .await
                    .map_err(|e| CaptionError::Fetch(e.to_string()))?;
                (bytes, Origin::Url)
            }
        };

        let model = self.model.clone();
        let max_bytes = self.max_image_bytes;
        let mut caption = tokio::task::spawn_blocking(move || {
            let image = decode(&bytes, origin, max_bytes)?;
            run_model(model.as_ref(), &image)
        })
        .await
        .map_err(|e| CaptionError::Model(format!("caption task failed: {}", e)))??;

        caption.processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Captioned {}x{} image in {}ms: '{}'",
            caption.width, caption.height, caption.processing_time_ms, caption.text
        );
        Ok(caption)
    }
}

fn decode(bytes: &[u8], origin: Origin, max_bytes: usize) -> Result<DynamicImage, CaptionError> {
    let (image, info) = decode_image_bytes_with_limit(bytes, max_bytes).map_err(|e| match origin {
        Origin::Upload => CaptionError::Decode(e.to_string()),
        Origin::Url => CaptionError::Fetch(e.to_string()),
    })?;
    debug!(
        "Decoded {:?} image {}x{} ({} bytes)",
        info.format, info.width, info.height, info.size_bytes
    );
    Ok(normalize_to_rgb(image))
}

fn run_model(model: &dyn CaptionModel, image: &DynamicImage) -> Result<Caption, CaptionError> {
    let model_err = |e: anyhow::Error| CaptionError::Model(format!("{:#}", e));

    let pixel_values = model.preprocess(image).map_err(model_err)?;
    let tokens = model.generate(&pixel_values).map_err(model_err)?;
    let text = model.decode(&tokens).map_err(model_err)?;

    if text.is_empty() {
        warn!("Model '{}' returned an empty caption", model.name());
    }

    Ok(Caption {
        text,
        width: image.width(),
        height: image.height(),
        token_count: tokens.len(),
        processing_time_ms: 0,
    })
}
