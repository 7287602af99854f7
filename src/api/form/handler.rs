// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Form front-end handlers

use axum::{extract::State, response::Html};
use axum_extra::extract::Multipart;
use tracing::info;

use super::page::{render_page, FormKind};
use crate::api::errors::ApiErrorResponse;
use crate::api::http_server::AppState;
use crate::api::upload::read_image_form;
use crate::caption::ImageInput;

/// GET / - upload form
pub async fn upload_page_handler() -> Html<String> {
    Html(render_page(FormKind::Upload, None, None))
}

/// POST /caption - caption the uploaded file
pub async fn upload_submit_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Html<String>, ApiErrorResponse> {
    let form = read_image_form(multipart, state.config.max_image_bytes).await?;
    if form.url.is_some() {
        info!("Upload form received a URL field; ignoring it");
    }

    let caption = state
        .service
        .generate_caption(form.upload.and_then(ImageInput::from_bytes))
        .await;

    Ok(Html(render_page(FormKind::Upload, Some(&caption), None)))
}

/// GET /caption/url - upload-or-URL form
pub async fn url_page_handler() -> Html<String> {
    Html(render_page(FormKind::UploadOrUrl, None, None))
}

/// POST /caption/url - caption the upload, or the URL when no file was sent
pub async fn url_submit_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Html<String>, ApiErrorResponse> {
    let form = read_image_form(multipart, state.config.max_image_bytes).await?;
    let url = form.url.clone();

    let caption = state
        .service
        .generate_caption(ImageInput::from_parts(form.upload, form.url))
        .await;

    Ok(Html(render_page(
        FormKind::UploadOrUrl,
        Some(&caption),
        url.as_deref(),
    )))
}
