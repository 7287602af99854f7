// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JSON caption endpoint
//!
//! Provides `POST /v1/caption` for base64 images and image URLs.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::caption_handler;
pub use request::{encoded_len_limit, CaptionRequest};
pub use response::CaptionResponse;
