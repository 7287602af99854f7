// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart form reading shared by the upload front-ends

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};
use tracing::debug;

use super::errors::ApiError;

/// Form field carrying the image file
pub const IMAGE_FIELD: &str = "image";

/// Form field carrying the image URL
pub const URL_FIELD: &str = "url";

/// Fields of an upload / URL form; unknown fields are skipped
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImageForm {
    pub upload: Option<Vec<u8>>,
    pub url: Option<String>,
}

pub async fn read_image_form(
    mut multipart: Multipart,
    limit: usize,
) -> Result<ImageForm, ApiError> {
    let mut form = ImageForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            IMAGE_FIELD => {
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                debug!("Form image field: {} bytes", bytes.len());
                if !bytes.is_empty() {
                    form.upload = Some(bytes.to_vec());
                }
            }
            URL_FIELD => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                if !text.trim().is_empty() {
                    form.url = Some(text.trim().to_string());
                }
            }
            other => debug!("Ignoring form field '{}'", other),
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::InvalidRequest(format!("Malformed multipart form: {}", err.body_text()))
    }
}
