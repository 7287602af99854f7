// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! CaptionService behaviour against local fixtures
//!
//! Every outcome is a single string; failures start with ❌.

use captiongen::caption::{is_failure, CaptionService, ImageFetcher, ImageInput};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{png_bytes, spawn_image_server, FakeModel, FAKE_CAPTION};

fn service(model: Arc<FakeModel>) -> CaptionService {
    let fetcher = ImageFetcher::new(Some(Duration::from_secs(5)), 1024 * 1024).unwrap();
    CaptionService::new(model, fetcher)
}

#[tokio::test]
async fn test_missing_input() {
    let model = FakeModel::new();
    let svc = service(model.clone());

    assert_eq!(svc.generate_caption(None).await, "❌ No image provided.");
    assert_eq!(model.runs(), 0);
}

#[tokio::test]
async fn test_small_image_gets_short_caption() {
    let svc = service(FakeModel::new());

    let caption = svc
        .generate_caption(ImageInput::from_bytes(png_bytes(224, 224)))
        .await;

    assert!(!is_failure(&caption));
    assert!(!caption.is_empty());
    assert!(caption.split_whitespace().count() <= 20);
}

#[tokio::test]
async fn test_url_image() {
    let base = spawn_image_server().await;
    let model = FakeModel::new();
    let svc = service(model.clone());

    let caption = svc
        .caption(ImageInput::from_url(&format!("{}/cat.png", base)))
        .await
        .unwrap();

    assert_eq!(caption.text, FAKE_CAPTION);
    assert_eq!((caption.width, caption.height), (224, 224));
    assert_eq!(model.runs(), 1);
}

#[tokio::test]
async fn test_url_with_non_image_body() {
    let base = spawn_image_server().await;
    let model = FakeModel::new();
    let svc = service(model.clone());

    let caption = svc
        .generate_caption(ImageInput::from_url(&format!("{}/page.html", base)))
        .await;

    assert_eq!(
        caption,
        "❌ Error loading image from URL: unsupported image format"
    );
    assert_eq!(model.runs(), 0);
}

#[tokio::test]
async fn test_url_not_found() {
    let base = spawn_image_server().await;
    let svc = service(FakeModel::new());

    let caption = svc
        .generate_caption(ImageInput::from_url(&format!("{}/missing.png", base)))
        .await;

    assert!(caption.starts_with("❌ Error loading image from URL: "));
    assert!(caption.contains("404"));
}

#[tokio::test]
async fn test_unreachable_url() {
    let svc = service(FakeModel::new());

    let caption = svc
        .generate_caption(ImageInput::from_url("http://127.0.0.1:9/cat.png"))
        .await;

    assert!(is_failure(&caption));
    assert!(caption.starts_with("❌ Error loading image from URL: "));
}

#[tokio::test]
async fn test_two_calls_two_captions() {
    let model = FakeModel::new();
    let svc = service(model.clone());

    let first = svc
        .generate_caption(ImageInput::from_bytes(png_bytes(20, 20)))
        .await;
    let second = svc
        .generate_caption(ImageInput::from_bytes(png_bytes(30, 10)))
        .await;

    assert_eq!(first, FAKE_CAPTION);
    assert_eq!(second, FAKE_CAPTION);
    assert_eq!(model.runs(), 2);
}

#[tokio::test]
async fn test_concurrent_callers_share_the_service() {
    let model = FakeModel::new();
    let svc = service(model.clone());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let svc = svc.clone();
            tokio::spawn(async move {
                svc.generate_caption(ImageInput::from_bytes(png_bytes(8 + i, 8)))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), FAKE_CAPTION);
    }
    assert_eq!(model.runs(), 8);
}

#[tokio::test]
async fn test_model_failure() {
    let svc = service(FakeModel::failing());

    let caption = svc
        .generate_caption(ImageInput::from_bytes(png_bytes(16, 16)))
        .await;

    assert_eq!(
        caption,
        "❌ Error generating caption: text decoder returned no logits"
    );
}

#[tokio::test]
async fn test_upload_wins_over_url() {
    let svc = service(FakeModel::new());

    let input = ImageInput::from_parts(
        Some(png_bytes(12, 12)),
        Some("http://127.0.0.1:9/unused.png".to_string()),
    );
    let caption = svc.caption(input).await.unwrap();
    assert_eq!((caption.width, caption.height), (12, 12));
}
