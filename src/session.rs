//! Durable session state, one JSON file per session.
//!
//! [`SessionManager`] persists [`SessionData`] under a configurable
//! directory, named by a filesystem-sanitized session id. Sessions expire
//! `ttl` after their last activity and are deleted lazily — on the next
//! load, or during an explicit [`cleanup`](SessionManager::cleanup) sweep.
//!
//! Persistence here is optimization-layer bookkeeping, not a user-visible
//! operation: a missing file or malformed JSON is recovered as "no such
//! session" with a warning, never propagated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;
use crate::types::Content;

/// Configuration for session persistence.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory holding one JSON file per session.
    pub dir: PathBuf,
    /// Idle lifetime measured from `last_activity_at`. Zero means sessions
    /// never expire. Default: 7 days.
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("garmr")
            .join("sessions");
        Self {
            dir,
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Durable per-session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub id: String,
    /// Epoch milliseconds.
    pub created_at: u64,
    /// Epoch milliseconds; refreshed by every save.
    pub last_activity_at: u64,
    #[serde(default)]
    pub history: Vec<Content>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl SessionData {
    /// Create a fresh session with the current timestamps.
    pub fn new(id: impl Into<String>) -> Self {
        let now = epoch_millis();
        Self {
            id: id.into(),
            created_at: now,
            last_activity_at: now,
            history: Vec::new(),
            metadata: HashMap::new(),
            model: None,
            total_tokens: None,
        }
    }
}

/// Persister for session state.
pub struct SessionManager {
    config: SessionConfig,
}

impl SessionManager {
    /// Create a manager over the configured directory.
    ///
    /// The directory is created lazily on first save.
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Load a session, or create a fresh one if absent or expired.
    pub async fn get_or_create(&self, id: &str) -> SessionData {
        match self.load(id).await {
            Some(session) => session,
            None => SessionData::new(id),
        }
    }

    /// Load a persisted session.
    ///
    /// Returns `None` for a missing file, malformed JSON (warned and
    /// treated as absent), or an expired session — expired files are
    /// deleted as a side effect.
    pub async fn load(&self, id: &str) -> Option<SessionData> {
        let path = self.session_path(id);
        let raw = tokio::fs::read_to_string(&path).await.ok()?;
        let session: SessionData = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!(session = id, error = %e, "malformed session file, treating as absent");
                return None;
            }
        };
        if self.is_expired(&session) {
            debug!(session = id, "session expired, deleting");
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }
        Some(session)
    }

    /// Persist a session, refreshing its `last_activity_at`.
    pub async fn save(&self, session: &mut SessionData) -> Result<()> {
        session.last_activity_at = epoch_millis();
        tokio::fs::create_dir_all(&self.config.dir).await?;
        let encoded = serde_json::to_string_pretty(session)?;
        tokio::fs::write(self.session_path(&session.id), encoded).await?;
        Ok(())
    }

    /// Delete a session's file. Missing files are not an error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.session_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sweep out every expired session file. Returns the number removed.
    ///
    /// Unreadable or malformed files are skipped with a warning — a sweep
    /// never destroys data it cannot interpret.
    pub async fn cleanup(&self) -> usize {
        let Ok(mut entries) = tokio::fs::read_dir(&self.config.dir).await else {
            return 0;
        };
        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(raw) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            match serde_json::from_str::<SessionData>(&raw) {
                Ok(session) if self.is_expired(&session) => {
                    if tokio::fs::remove_file(&path).await.is_ok() {
                        removed += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping malformed session file");
                }
            }
        }
        removed
    }

    /// Ids of every persisted session file (sanitized form).
    pub async fn list(&self) -> Vec<String> {
        let Ok(mut entries) = tokio::fs::read_dir(&self.config.dir).await else {
            return Vec::new();
        };
        let mut ids = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        ids
    }

    fn is_expired(&self, session: &SessionData) -> bool {
        if self.config.ttl.is_zero() {
            return false;
        }
        let age_ms = epoch_millis().saturating_sub(session.last_activity_at);
        Duration::from_millis(age_ms) > self.config.ttl
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.config.dir.join(format!("{}.json", sanitize_id(id)))
    }

    /// Directory this manager persists into.
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }
}

/// Reduce a session id to filesystem-safe characters.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
