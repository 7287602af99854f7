// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multi-step caption sessions

pub mod handler;
pub mod store;

pub use handler::{
    attach_image_handler, attach_url_handler, caption_session_handler, create_session_handler,
    delete_session_handler, get_session_handler, AttachUrlRequest, SessionView,
};
pub use store::{CaptionSession, SessionStatus, SessionStore, StoreMetrics};
