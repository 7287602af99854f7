// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image captioning core
//!
//! `CaptionService` turns one `ImageInput` into one caption string.
//! Failures share the string channel and start with `❌`.

pub mod error;
pub mod fetch;
pub mod input;
pub mod model;
pub mod service;

pub use error::{is_failure, CaptionError, FAILURE_MARKER, NO_IMAGE_MESSAGE};
pub use fetch::{FetchError, ImageFetcher};
pub use input::ImageInput;
pub use model::CaptionModel;
pub use service::{Caption, CaptionService};
