// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! JSON caption endpoint tests for POST /v1/caption
//!
//! Failures of the caption itself are reported in the body with
//! `success: false`; only request validation produces an error status.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use captiongen::{
    api::http_server::{create_app, AppState},
    config::CaptionConfig,
};
use serde_json::json;
use tower::util::ServiceExt;

use crate::common::{body_json, png_base64, spawn_image_server, FakeModel, FAKE_CAPTION};

fn caption_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/v1/caption")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_caption_base64_image() {
    let model = FakeModel::new();
    let app = create_app(AppState::new_for_test(model.clone()).unwrap());

    let response = app
        .oneshot(caption_request(json!({ "image": png_base64(224, 224) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["caption"], FAKE_CAPTION);
    assert_eq!(body["success"], true);
    assert_eq!(body["width"], 224);
    assert_eq!(body["height"], 224);
    assert_eq!(body["model"], "fake-blip");
    assert!(body.get("errorKind").is_none());
    assert_eq!(model.runs(), 1);
}

#[tokio::test]
async fn test_caption_data_url_image() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let data_url = format!("data:image/png;base64,{}", png_base64(16, 16));
    let response = app
        .oneshot(caption_request(json!({ "image": data_url })))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["caption"], FAKE_CAPTION);
}

#[tokio::test]
async fn test_caption_without_image() {
    let model = FakeModel::new();
    let app = create_app(AppState::new_for_test(model.clone()).unwrap());

    let response = app.oneshot(caption_request(json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["caption"], "❌ No image provided.");
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "missing_input");
    assert_eq!(model.runs(), 0);
}

#[tokio::test]
async fn test_caption_invalid_base64() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let response = app
        .oneshot(caption_request(json!({ "image": "!!! not base64 !!!" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "decode");
    assert!(body["caption"]
        .as_str()
        .unwrap()
        .starts_with("❌ Error loading image: "));
}

#[tokio::test]
async fn test_caption_from_url() {
    let base = spawn_image_server().await;
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let response = app
        .oneshot(caption_request(json!({ "url": format!("{}/cat.png", base) })))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["width"], 224);
}

#[tokio::test]
async fn test_caption_from_unreachable_url() {
    let app = create_app(AppState::new_for_test(FakeModel::new()).unwrap());

    let response = app
        .oneshot(caption_request(json!({ "url": "http://127.0.0.1:9/cat.png" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "fetch");
    assert!(body["caption"]
        .as_str()
        .unwrap()
        .starts_with("❌ Error loading image from URL: "));
}

#[tokio::test]
async fn test_caption_model_failure() {
    let app = create_app(AppState::new_for_test(FakeModel::failing()).unwrap());

    let response = app
        .oneshot(caption_request(json!({ "image": png_base64(8, 8) })))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "model");
    assert_eq!(
        body["caption"],
        "❌ Error generating caption: text decoder returned no logits"
    );
}

#[tokio::test]
async fn test_each_request_gets_its_own_caption() {
    let model = FakeModel::new();
    let app = create_app(AppState::new_for_test(model.clone()).unwrap());

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(caption_request(json!({ "image": png_base64(10, 10) })))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["caption"], FAKE_CAPTION);
    }
    assert_eq!(model.runs(), 2);
}

#[tokio::test]
async fn test_oversized_image_is_rejected() {
    let config = CaptionConfig {
        max_image_bytes: 1024,
        ..CaptionConfig::default()
    };
    let app = create_app(AppState::with_config(FakeModel::new(), config).unwrap());

    let response = app
        .oneshot(caption_request(json!({ "image": "A".repeat(4096) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
