// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption response types

use serde::{Deserialize, Serialize};

use crate::caption::{Caption, CaptionError};

/// Response from the caption endpoint
///
/// `caption` always carries the caption string, including `❌` failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionResponse {
    pub caption: String,
    pub success: bool,
    /// Failure category when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub processing_time_ms: u64,
    pub model: String,
}

impl CaptionResponse {
    pub fn from_result(result: Result<Caption, CaptionError>, model: &str, elapsed_ms: u64) -> Self {
        match result {
            Ok(caption) => Self {
                caption: caption.text,
                success: true,
                error_kind: None,
                width: Some(caption.width),
                height: Some(caption.height),
                processing_time_ms: caption.processing_time_ms,
                model: model.to_string(),
            },
            Err(e) => Self {
                caption: e.render(),
                success: false,
                error_kind: Some(e.kind().to_string()),
                width: None,
                height: None,
                processing_time_ms: elapsed_ms,
                model: model.to_string(),
            },
        }
    }
}
