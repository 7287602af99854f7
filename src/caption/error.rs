// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption failures and their string rendering

use thiserror::Error;

/// Prefix carried by every failure string
pub const FAILURE_MARKER: &str = "❌";

/// Exact string returned when no image was supplied
pub const NO_IMAGE_MESSAGE: &str = "❌ No image provided.";

/// Why a caption could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptionError {
    #[error("No image provided.")]
    MissingInput,

    /// URL fetch failed, or the fetched body is not an image
    #[error("Error loading image from URL: {0}")]
    Fetch(String),

    /// Uploaded bytes could not be decoded
    #[error("Error loading image: {0}")]
    Decode(String),

    /// Preprocessing, generation or token decoding failed
    #[error("Error generating caption: {0}")]
    Model(String),
}

impl CaptionError {
    /// Render onto the caption string channel
    pub fn render(&self) -> String {
        format!("{} {}", FAILURE_MARKER, self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::Fetch(_) => "fetch",
            Self::Decode(_) => "decode",
            Self::Model(_) => "model",
        }
    }
}

/// Whether a caption string reports a failure
pub fn is_failure(caption: &str) -> bool {
    caption.starts_with(FAILURE_MARKER)
}
