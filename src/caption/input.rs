// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image sources accepted by the caption service

use tracing::debug;

/// One image source per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Raw encoded image (upload, base64 payload, local file)
    Bytes(Vec<u8>),
    /// Remote image fetched with a plain GET
    Url(String),
}

impl ImageInput {
    /// `None` when the payload is empty
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(Self::Bytes(bytes))
        }
    }

    /// `None` when the URL is blank; surrounding whitespace is trimmed
    pub fn from_url(url: impl AsRef<str>) -> Option<Self> {
        let url = url.as_ref().trim();
        if url.is_empty() {
            None
        } else {
            Some(Self::Url(url.to_string()))
        }
    }

    /// Combine an optional upload with an optional URL
    ///
    /// A non-empty upload wins and the URL is ignored; otherwise a non-blank
    /// URL is used.
    pub fn from_parts(upload: Option<Vec<u8>>, url: Option<String>) -> Option<Self> {
        let upload = upload.and_then(Self::from_bytes);
        let url = url.and_then(Self::from_url);

        match (upload, url) {
            (Some(upload), Some(ignored)) => {
                if let Self::Url(u) = &ignored {
                    debug!("Upload provided, ignoring URL {}", u);
                }
                Some(upload)
            }
            (Some(upload), None) => Some(upload),
            (None, url) => url,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "upload",
            Self::Url(_) => "url",
        }
    }
}
