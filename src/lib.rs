// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod caption;
pub mod cli;
pub mod config;
pub mod version;
pub mod vision;

// Re-export main types
pub use caption::{
    Caption, CaptionError, CaptionModel, CaptionService, ImageFetcher, ImageInput,
    FAILURE_MARKER, NO_IMAGE_MESSAGE,
};
pub use config::CaptionConfig;
pub use vision::{BlipModel, ModelManager};
