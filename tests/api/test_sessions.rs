// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Caption session tests for /v1/sessions

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use captiongen::{
    api::http_server::{create_app, AppState},
    config::CaptionConfig,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use crate::common::{
    body_json, multipart_body, multipart_content_type, png_bytes, spawn_image_server, FakeModel,
    FAKE_CAPTION,
};

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return (status, Value::Null);
    }
    (status, body_json(response).await)
}

async fn create_session(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/v1/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_and_get_session() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let id = create_session(&app).await;
    let (status, body) = send(&app, Method::GET, &format!("/v1/sessions/{}", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["status"], "empty");
    assert_eq!(body["hasUpload"], false);
    assert!(body.get("caption").is_none());
}

#[tokio::test]
async fn test_unknown_session() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let (status, body) = send(&app, Method::GET, "/v1/sessions/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");

    let (status, _) = send(&app, Method::POST, "/v1/sessions/nope/caption", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_caption_empty_session() {
    let model = FakeModel::new();
    let app = create_app(AppState::new_for_test(model.clone()).unwrap());

    let id = create_session(&app).await;
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/v1/sessions/{}/caption", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["caption"], "❌ No image provided.");
    assert_eq!(body["status"], "captioned");
    assert_eq!(model.runs(), 0);
}

#[tokio::test]
async fn test_session_url_caption() {
    let base = spawn_image_server().await;
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let id = create_session(&app).await;
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/v1/sessions/{}/url", id),
        Some(json!({ "url": format!("{}/cat.png", base) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let (_, body) = send(
        &app,
        Method::POST,
        &format!("/v1/sessions/{}/caption", id),
        None,
    )
    .await;
    assert_eq!(body["caption"], FAKE_CAPTION);
    assert_eq!(body["status"], "captioned");
}

#[tokio::test]
async fn test_session_upload_caption() {
    let model = FakeModel::new();
    let app = create_app(AppState::new_for_test(model.clone()).unwrap());
    let id = create_session(&app).await;

    let image = png_bytes(40, 30);
    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/v1/sessions/{}/image", id))
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(multipart_body(Some(&image), None)))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["hasUpload"], true);
    assert_eq!(body["uploadBytes"], image.len());

    let (_, body) = send(
        &app,
        Method::POST,
        &format!("/v1/sessions/{}/caption", id),
        None,
    )
    .await;
    assert_eq!(body["caption"], FAKE_CAPTION);
    assert_eq!(model.runs(), 1);
}

#[tokio::test]
async fn test_changing_input_clears_caption() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());
    let id = create_session(&app).await;

    send(
        &app,
        Method::POST,
        &format!("/v1/sessions/{}/caption", id),
        None,
    )
    .await;

    let (_, body) = send(
        &app,
        Method::PUT,
        &format!("/v1/sessions/{}/url", id),
        Some(json!({ "url": "https://example.com/dog.jpg" })),
    )
    .await;
    assert_eq!(body["status"], "ready");
    assert!(body.get("caption").is_none());
}

#[tokio::test]
async fn test_delete_session() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());
    let id = create_session(&app).await;
    let uri = format!("/v1/sessions/{}", id);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_limit() {
    let config = CaptionConfig {
        max_sessions: 1,
        ..CaptionConfig::default()
    };
    let app = create_app(AppState::with_config(FakeModel::new(), config).unwrap());

    create_session(&app).await;
    let (status, body) = send(&app, Method::POST, "/v1/sessions", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error_type"], "session_limit_reached");
}
