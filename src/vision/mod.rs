// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based image captioning
//!
//! This module provides:
//! - Image decoding and color normalization
//! - BLIP captioning via ONNX Runtime
//! - Lazy, memoized model loading

pub mod blip;
pub mod image_utils;
pub mod model_manager;

pub use blip::{BlipModel, BlipOptions};
pub use image_utils::{
    decode_base64_payload, decode_image_bytes, decode_image_bytes_with_limit, detect_format,
    normalize_to_rgb, ImageError, ImageInfo,
};
pub use model_manager::{LoadedModel, ModelInfo, ModelManager, ModelSource};
