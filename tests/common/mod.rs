// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared helpers for the integration tests: an in-memory caption model,
//! image fixtures, a local image server and a multipart body builder.
#![allow(dead_code)]

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use captiongen::caption::CaptionModel;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::Array4;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const FAKE_CAPTION: &str = "a gray square on a plain background";

/// Caption model that answers instantly and counts its runs
#[derive(Default)]
pub struct FakeModel {
    runs: AtomicUsize,
    fail: bool,
}

impl FakeModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A model whose decoder always fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            runs: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl CaptionModel for FakeModel {
    fn name(&self) -> &str {
        "fake-blip"
    }

    fn preprocess(&self, image: &DynamicImage) -> anyhow::Result<Array4<f32>> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(image.width() > 0 && image.height() > 0, "empty image");
        Ok(Array4::zeros((1, 3, 4, 4)))
    }

    fn generate(&self, _pixel_values: &Array4<f32>) -> anyhow::Result<Vec<u32>> {
        if self.fail {
            anyhow::bail!("text decoder returned no logits");
        }
        Ok(vec![30522, 1037, 3897, 2675, 102])
    }

    fn decode(&self, _token_ids: &[u32]) -> anyhow::Result<String> {
        Ok(FAKE_CAPTION.to_string())
    }
}

/// Solid gray PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |_, _| Rgb([128u8, 128u8, 128u8]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

pub fn png_base64(width: u32, height: u32) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    STANDARD.encode(png_bytes(width, height))
}

/// Start a local HTTP server with image and non-image routes
///
/// Routes: `/cat.png` (224x224 PNG), `/page.html` (HTML text),
/// `/missing.png` (404). Returns the base URL, e.g. `http://127.0.0.1:41234`.
pub async fn spawn_image_server() -> String {
    async fn cat() -> impl IntoResponse {
        ([(header::CONTENT_TYPE, "image/png")], png_bytes(224, 224))
    }

    async fn page() -> impl IntoResponse {
        (
            [(header::CONTENT_TYPE, "text/html")],
            "<html><body>not an image</body></html>",
        )
    }

    async fn missing() -> impl IntoResponse {
        (StatusCode::NOT_FOUND, "no such image")
    }

    let app = Router::new()
        .route("/cat.png", get(cat))
        .route("/page.html", get(page))
        .route("/missing.png", get(missing));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

pub const BOUNDARY: &str = "captiongen-test-boundary";

/// Build a `multipart/form-data` body with optional image and url fields
pub fn multipart_body(image: Option<&[u8]>, url: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(bytes) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"test.png\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(url) = url {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"url\"\r\n\r\n{}\r\n",
                BOUNDARY, url
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Read a whole response body
pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
