// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health and model listing endpoint tests

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use axum::http::header;
use captiongen::{
    api::http_server::{create_app, AppState},
    config::CaptionConfig,
};
use tower::util::ServiceExt;

use crate::common::{body_json, multipart_body, multipart_content_type, png_bytes, FakeModel};

#[tokio::test]
async fn test_health_reports_loaded_model() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "fake-blip");
    assert_eq!(body["modelLoaded"], true);
    assert_eq!(body["sessions"], 0);
    assert_eq!(body["sessionMetrics"]["uploadBytes"], 0);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_reports_session_uploads() {
    let state = AppState::new_for_test(FakeModel::new()).unwrap();
    let app = create_app(state.clone());

    let session = state.sessions.try_create_session().await.unwrap();
    let image = png_bytes(20, 20);
    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/v1/sessions/{}/image", session.id))
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(multipart_body(Some(&image), None)))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["sessions"], 1);
    assert_eq!(body["sessionMetrics"]["totalSessions"], 1);
    assert_eq!(body["sessionMetrics"]["uploadBytes"], image.len());
    assert_eq!(body["sessionMetrics"]["captionedSessions"], 0);
}

#[tokio::test]
async fn test_app_with_unbounded_image_limit() {
    let config = CaptionConfig {
        max_image_bytes: usize::MAX,
        ..CaptionConfig::default()
    };
    let app = create_app(AppState::with_config(FakeModel::new(), config).unwrap());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_models_endpoint() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let models = body["models"].as_array().unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0]["name"], "fake-blip");
    assert_eq!(models[0]["maxLength"], 20);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/v1/describe")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
