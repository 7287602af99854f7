// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::caption::ImageInput;
use crate::vision::image_utils::{decode_base64_payload, ImageError};

/// Request for a caption
///
/// Either field may be omitted; when both are present the image wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRequest {
    /// Base64-encoded image data (a `data:` URI prefix is accepted)
    #[serde(default)]
    pub image: Option<String>,

    /// Image URL to fetch
    #[serde(default)]
    pub url: Option<String>,
}

/// Longest base64 text that can decode to `max_image_bytes`
///
/// Saturates instead of overflowing for very large limits.
pub fn encoded_len_limit(max_image_bytes: usize) -> usize {
    (max_image_bytes / 3).saturating_mul(4).saturating_add(4)
}

impl CaptionRequest {
    /// Validate field shapes that are HTTP-level problems
    pub fn validate(&self, max_image_bytes: usize) -> Result<(), ApiError> {
        if let Some(ref image) = self.image {
            if image.len() > encoded_len_limit(max_image_bytes) {
                return Err(ApiError::ValidationError {
                    field: "image".to_string(),
                    message: format!("image exceeds maximum size of {} bytes", max_image_bytes),
                });
            }
        }

        if let Some(ref url) = self.url {
            if url.len() > 8192 {
                return Err(ApiError::ValidationError {
                    field: "url".to_string(),
                    message: "url is too long".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Resolve the request into a service input
    ///
    /// A payload that is not valid base64 is reported as an image decode
    /// failure, like any other unreadable upload.
    pub fn into_input(self) -> Result<Option<ImageInput>, ImageError> {
        let upload = match self.image {
            Some(ref data) if !data.trim().is_empty() => Some(decode_base64_payload(data)?),
            _ => None,
        };
        Ok(ImageInput::from_parts(upload, self.url))
    }
}
