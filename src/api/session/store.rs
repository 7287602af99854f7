// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory store for multi-step caption sessions

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::caption::ImageInput;
use crate::config::DEFAULT_SESSION_TTL_SECS;

/// Where a session stands in the attach / caption flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing attached yet
    Empty,
    /// An upload or URL is attached, no caption for it yet
    Ready,
    /// Caption produced for the current inputs
    Captioned,
}

/// One caption session
///
/// Mirrors a form with an upload field, a URL field and an output box.
/// Changing either input clears the previous caption.
#[derive(Debug, Clone)]
pub struct CaptionSession {
    pub id: String,
    pub upload: Option<Vec<u8>>,
    pub url: Option<String>,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaptionSession {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            upload: None,
            url: None,
            caption: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.caption.is_some() {
            SessionStatus::Captioned
        } else if self.upload.is_some() || self.url.is_some() {
            SessionStatus::Ready
        } else {
            SessionStatus::Empty
        }
    }

    /// The input a caption request would use now
    pub fn input(&self) -> Option<ImageInput> {
        ImageInput::from_parts(self.upload.clone(), self.url.clone())
    }

    /// True once the session has been idle for at least `ttl`
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.updated_at)
            .to_std()
            .is_ok_and(|idle| idle >= ttl)
    }

    fn touch(&mut self) {
        self.caption = None;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetrics {
    pub total_sessions: usize,
    pub captioned_sessions: usize,
    pub upload_bytes: usize,
}

/// Bounded session map shared across handlers
///
/// Sessions idle for longer than the TTL are dropped by `cleanup_expired`,
/// which runs periodically and whenever the store is full.
#[derive(Debug, Clone)]
pub struct SessionStore {
    max_sessions: usize,
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, CaptionSession>>>,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            max_sessions,
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create an empty session, failing when the store is full
    pub async fn try_create_session(&self) -> Result<CaptionSession> {
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= self.max_sessions {
            let removed = Self::retain_live(&mut sessions, self.ttl);
            if removed > 0 {
                debug!("Dropped {} expired sessions to make room", removed);
            }
        }
        if sessions.len() >= self.max_sessions {
            return Err(anyhow!("Maximum number of sessions reached"));
        }

        let session = CaptionSession::new();
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Option<CaptionSession> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// Replace the uploaded image; an empty payload clears it
    pub async fn set_upload(&self, session_id: &str, bytes: Vec<u8>) -> Result<CaptionSession> {
        self.update(session_id, |session| {
            session.upload = if bytes.is_empty() { None } else { Some(bytes) };
        })
        .await
    }

    /// Replace the URL; a blank URL clears it
    pub async fn set_url(&self, session_id: &str, url: &str) -> Result<CaptionSession> {
        let url = url.trim();
        self.update(session_id, |session| {
            session.url = if url.is_empty() {
                None
            } else {
                Some(url.to_string())
            };
        })
        .await
    }

    /// Store a caption, unless the inputs changed while it was produced
    pub async fn set_caption(
        &self,
        session_id: &str,
        caption: String,
        inputs_at: DateTime<Utc>,
    ) -> Result<CaptionSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| anyhow!("Session not found"))?;

        if session.updated_at == inputs_at {
            session.caption = Some(caption);
        }
        Ok(session.clone())
    }

    async fn update<F>(&self, session_id: &str, apply: F) -> Result<CaptionSession>
    where
        F: FnOnce(&mut CaptionSession),
    {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(session) => {
                apply(session);
                session.touch();
                Ok(session.clone())
            }
            None => Err(anyhow!("Session not found")),
        }
    }

    pub async fn destroy_session(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).is_some()
    }

    /// Remove sessions idle longer than the TTL; returns how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        Self::retain_live(&mut sessions, self.ttl)
    }

    fn retain_live(sessions: &mut HashMap<String, CaptionSession>, ttl: Duration) -> usize {
        let now = Utc::now();
        let initial_count = sessions.len();
        sessions.retain(|_, session| !session.is_expired(ttl, now));
        initial_count - sessions.len()
    }

    /// Sweep expired sessions every `every` until the task is aborted
    pub fn spawn_cleanup_task(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = store.cleanup_expired().await;
                if removed > 0 {
                    info!("Removed {} expired caption sessions", removed);
                }
            }
        })
    }

    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    pub async fn get_store_metrics(&self) -> StoreMetrics {
        let sessions = self.sessions.read().await;
        StoreMetrics {
            total_sessions: sessions.len(),
            captioned_sessions: sessions.values().filter(|s| s.caption.is_some()).count(),
            upload_bytes: sessions
                .values()
                .map(|s| s.upload.as_ref().map_or(0, Vec::len))
                .sum(),
        }
    }
}
