// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption session handlers
//!
//! A session holds an upload slot, a URL slot and the last caption. Clients
//! attach inputs in any order and ask for a caption when ready.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::store::{CaptionSession, SessionStatus};
use crate::api::errors::{ApiError, ApiErrorResponse};
use crate::api::http_server::AppState;
use crate::api::upload::read_image_form;

/// Public view of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub status: String,
    pub has_upload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&CaptionSession> for SessionView {
    fn from(session: &CaptionSession) -> Self {
        let status = match session.status() {
            SessionStatus::Empty => "empty",
            SessionStatus::Ready => "ready",
            SessionStatus::Captioned => "captioned",
        };
        Self {
            id: session.id.clone(),
            status: status.to_string(),
            has_upload: session.upload.is_some(),
            upload_bytes: session.upload.as_ref().map(Vec::len),
            url: session.url.clone(),
            caption: session.caption.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// Body of `PUT /v1/sessions/:id/url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachUrlRequest {
    #[serde(default)]
    pub url: String,
}

fn not_found(id: &str) -> ApiErrorResponse {
    ApiErrorResponse(ApiError::NotFound(format!("Session {} not found", id)))
}

/// POST /v1/sessions
pub async fn create_session_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), ApiErrorResponse> {
    let session = state.sessions.try_create_session().await.map_err(|_| {
        ApiErrorResponse(ApiError::SessionLimitReached {
            max_sessions: state.sessions.max_sessions(),
        })
    })?;

    info!("Created caption session {}", session.id);
    Ok((StatusCode::CREATED, Json(SessionView::from(&session))))
}

/// GET /v1/sessions/:id
pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiErrorResponse> {
    let session = state
        .sessions
        .get_session(&id)
        .await
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(SessionView::from(&session)))
}

/// DELETE /v1/sessions/:id
pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiErrorResponse> {
    if state.sessions.destroy_session(&id).await {
        debug!("Deleted caption session {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&id))
    }
}

/// PUT /v1/sessions/:id/image - attach (or clear, when empty) the upload
pub async fn attach_image_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<SessionView>, ApiErrorResponse> {
    if state.sessions.get_session(&id).await.is_none() {
        return Err(not_found(&id));
    }

    let form = read_image_form(multipart, state.config.max_image_bytes).await?;
    let session = state
        .sessions
        .set_upload(&id, form.upload.unwrap_or_default())
        .await
        .map_err(|_| not_found(&id))?;

    Ok(Json(SessionView::from(&session)))
}

/// PUT /v1/sessions/:id/url - attach (or clear, when blank) the URL
pub async fn attach_url_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AttachUrlRequest>,
) -> Result<Json<SessionView>, ApiErrorResponse> {
    let session = state
        .sessions
        .set_url(&id, &request.url)
        .await
        .map_err(|_| not_found(&id))?;

    Ok(Json(SessionView::from(&session)))
}

/// POST /v1/sessions/:id/caption - caption the current inputs
pub async fn caption_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiErrorResponse> {
    let session = state
        .sessions
        .get_session(&id)
        .await
        .ok_or_else(|| not_found(&id))?;

    let caption = state.service.generate_caption(session.input()).await;

    let session = state
        .sessions
        .set_caption(&id, caption, session.updated_at)
        .await
        .map_err(|_| not_found(&id))?;

    Ok(Json(SessionView::from(&session)))
}
