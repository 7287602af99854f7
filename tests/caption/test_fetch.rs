// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ImageFetcher tests against a local server

use captiongen::caption::{FetchError, ImageFetcher};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use crate::common::{png_bytes, spawn_image_server};

#[tokio::test]
async fn test_fetch_image_bytes() {
    let base = spawn_image_server().await;
    let fetcher = ImageFetcher::with_defaults().unwrap();

    let bytes = assert_ok!(fetcher.fetch(&format!("{}/cat.png", base)).await);
    assert_eq!(bytes, png_bytes(224, 224));
}

#[tokio::test]
async fn test_fetch_status_error() {
    let base = spawn_image_server().await;
    let fetcher = ImageFetcher::with_defaults().unwrap();

    let err = fetcher
        .fetch(&format!("{}/missing.png", base))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus(404, _)));
}

#[tokio::test]
async fn test_fetch_size_limit() {
    let base = spawn_image_server().await;
    let fetcher = ImageFetcher::new(Some(Duration::from_secs(5)), 64).unwrap();

    let err = fetcher
        .fetch(&format!("{}/cat.png", base))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::TooLarge(64)));
}

#[tokio::test]
async fn test_fetch_rejects_other_schemes() {
    let fetcher = ImageFetcher::with_defaults().unwrap();

    let err = assert_err!(fetcher.fetch("file:///etc/passwd").await);
    assert!(matches!(err, FetchError::InvalidUrl(_)));

    let err = assert_err!(fetcher.fetch("not a url").await);
    assert!(matches!(err, FetchError::InvalidUrl(_)));
}
