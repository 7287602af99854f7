// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption endpoint handler

use axum::{extract::State, http::StatusCode, Json};
use std::time::Instant;
use tracing::debug;

use super::request::CaptionRequest;
use super::response::CaptionResponse;
use crate::api::http_server::AppState;
use crate::caption::CaptionError;

/// POST /v1/caption - Caption a base64 image or an image URL
///
/// Caption failures are still 200 responses; only malformed requests are
/// rejected with an HTTP error.
pub async fn caption_handler(
    State(state): State<AppState>,
    Json(request): Json<CaptionRequest>,
) -> Result<Json<CaptionResponse>, (StatusCode, String)> {
    if let Err(e) = request.validate(state.config.max_image_bytes) {
        return Err((StatusCode::BAD_REQUEST, e.to_string()));
    }

    let start = Instant::now();
    let result = match request.into_input() {
        Ok(input) => {
            debug!(
                "Caption request for {}",
                input.as_ref().map(|i| i.kind()).unwrap_or("nothing")
            );
            state.service.caption(input).await
        }
        Err(e) => Err(CaptionError::Decode(e.to_string())),
    };

    Ok(Json(CaptionResponse::from_result(
        result,
        state.service.model_name(),
        start.elapsed().as_millis() as u64,
    )))
}
