// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BLIP image captioning on ONNX Runtime
//!
//! Components:
//! - `preprocessing` - resize and normalize into `pixel_values`
//! - `encoder` - ViT vision encoder
//! - `decoder` - greedy text decoder and tokenizer
//! - `model` - combined pipeline implementing `CaptionModel`

pub mod decoder;
pub mod encoder;
pub mod model;
pub mod preprocessing;

pub use decoder::BlipTextDecoder;
pub use encoder::BlipVisionEncoder;
pub use model::{BlipFiles, BlipModel, BlipOptions};
pub use preprocessing::{preprocess_for_blip, PreprocessConfig};
