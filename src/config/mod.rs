// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file
//! (`CAPTIONGEN_CONFIG`), then `CAPTIONGEN_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Published ONNX export of `Salesforce/blip-image-captioning-base`
pub const DEFAULT_MODEL_REPO: &str = "Xenova/blip-image-captioning-base";

/// Maximum upload / fetched image size (10MB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Idle time after which a caption session is discarded (1 hour)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Configuration for the caption service and its front-ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Hugging Face Hub repository holding the ONNX model files
    pub model_repo: String,
    /// Local directory checked for model files before downloading
    pub model_dir: PathBuf,
    /// Maximum total caption length in tokens (BOS included)
    pub max_length: usize,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
    /// Largest accepted image payload in bytes
    pub max_image_bytes: usize,
    /// Timeout for URL fetches; unset means wait indefinitely
    pub fetch_timeout_secs: Option<u64>,
    /// Maximum number of live caption sessions
    pub max_sessions: usize,
    /// Seconds a session may sit idle before it is discarded
    pub session_ttl_secs: u64,
    /// How often expired sessions are swept
    pub session_cleanup_interval_secs: u64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:7860".to_string(),
            model_repo: DEFAULT_MODEL_REPO.to_string(),
            model_dir: PathBuf::from("./models/blip-base-onnx"),
            max_length: 20,
            intra_threads: 4,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            fetch_timeout_secs: None,
            max_sessions: 1000,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            session_cleanup_interval_secs: 300, // 5 minutes
        }
    }
}

impl CaptionConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: CaptionConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults, then `CAPTIONGEN_CONFIG` file if set, then environment overrides
    pub fn load() -> Result<Self> {
        let config = match std::env::var("CAPTIONGEN_CONFIG") {
            Ok(path) => {
                debug!("Loading config file {}", path);
                Self::from_file(path)?
            }
            Err(_) => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `CAPTIONGEN_*` overrides read through `lookup`
    ///
    /// Unparseable numeric values are ignored and the current value is kept.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CAPTIONGEN_LISTEN_ADDR") {
            self.listen_addr = val;
        }
        if let Some(val) = lookup("CAPTIONGEN_MODEL_REPO") {
            self.model_repo = val;
        }
        if let Some(val) = lookup("CAPTIONGEN_MODEL_DIR") {
            self.model_dir = PathBuf::from(val);
        }
        if let Some(num) = lookup("CAPTIONGEN_MAX_LENGTH").and_then(|v| v.parse().ok()) {
            self.max_length = num;
        }
        if let Some(num) = lookup("CAPTIONGEN_INTRA_THREADS").and_then(|v| v.parse().ok()) {
            self.intra_threads = num;
        }
        if let Some(num) = lookup("CAPTIONGEN_MAX_IMAGE_BYTES").and_then(|v| v.parse().ok()) {
            self.max_image_bytes = num;
        }
        if let Some(num) = lookup("CAPTIONGEN_FETCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.fetch_timeout_secs = Some(num);
        }
        if let Some(num) = lookup("CAPTIONGEN_MAX_SESSIONS").and_then(|v| v.parse().ok()) {
            self.max_sessions = num;
        }
        if let Some(num) = lookup("CAPTIONGEN_SESSION_TTL_SECS").and_then(|v| v.parse().ok()) {
            self.session_ttl_secs = num;
        }
        if let Some(num) =
            lookup("CAPTIONGEN_SESSION_CLEANUP_INTERVAL_SECS").and_then(|v| v.parse().ok())
        {
            self.session_cleanup_interval_secs = num;
        }
        self
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Sweep period for expired sessions; never below one second
    pub fn session_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.session_cleanup_interval_secs.max(1))
    }
}
