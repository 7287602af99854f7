// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod caption;
pub mod errors;
pub mod form;
pub mod http_server;
pub mod session;
pub mod upload;

pub use caption::{caption_handler, CaptionRequest, CaptionResponse};
pub use errors::{ApiError, ApiErrorResponse, ErrorResponse};
pub use http_server::{create_app, start_server, AppState, HealthResponse, ModelsResponse};
pub use session::{SessionStore, SessionView};
