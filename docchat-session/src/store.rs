//! In-memory session store with sliding TTL and expiry notifications.
//!
//! Sessions hold uploaded-file metadata and serialized chat history. Every
//! read refreshes the TTL, so an idle conversation dies after the configured
//! window while any activity resets the clock. A background sweeper removes
//! lapsed sessions and emits their ids on the expiry channel exactly once,
//! so the [`crate::ExpiryWatcher`] can clean up the external vector store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A single question/answer pair in a conversation.
///
/// Stored turns are parsed strictly from JSON; a record missing either field
/// is skipped, never executed or partially honored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

impl ChatTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Public view of a live session, returned by [`SessionStore::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Names of the files uploaded into this session.
    pub files: Vec<String>,
}

/// Internal session entry with its expiry deadline.
#[derive(Debug)]
struct SessionEntry {
    files: Vec<String>,
    /// Serialized [`ChatTurn`] records, insertion order, oldest first.
    history: Vec<String>,
    expires_at: Instant,
}

impl SessionEntry {
    fn new(files: Vec<String>, ttl: Duration) -> Self {
        Self {
            files,
            history: Vec::new(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn refresh(&mut self, ttl: Duration) {
        self.expires_at = Instant::now() + ttl;
    }
}

/// Key-value session cache with per-session sliding TTL.
///
/// Operations on a single session id are atomic to concurrent callers (one
/// store-wide lock; the system does not need cross-session atomicity beyond
/// that). Constructed explicitly and passed by reference; the expiry channel
/// receiver goes to the watcher.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
    expiry_tx: mpsc::UnboundedSender<String>,
}

impl SessionStore {
    /// Create a store with the given TTL window.
    ///
    /// Returns the store and the receiving end of the expiry event channel.
    pub fn new(ttl: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        (
            Self {
                sessions: RwLock::new(HashMap::new()),
                ttl,
                expiry_tx,
            },
            expiry_rx,
        )
    }

    /// Create or overwrite session metadata, resetting the TTL.
    pub async fn save(&self, id: &str, files: Vec<String>) {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(entry) if !entry.is_expired() => {
                entry.files = files;
                entry.refresh(self.ttl);
            }
            _ => {
                sessions.insert(id.to_string(), SessionEntry::new(files, self.ttl));
            }
        }
    }

    /// Look up a session, refreshing its TTL on hit.
    ///
    /// Returns `None` for unknown or lapsed sessions; callers treat that as
    /// "session unknown", not an error.
    pub async fn get(&self, id: &str) -> Option<SessionSnapshot> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        if entry.is_expired() {
            return None;
        }
        entry.refresh(self.ttl);
        Some(SessionSnapshot {
            files: entry.files.clone(),
        })
    }

    /// Append a chat turn, implicitly creating the session when unknown.
    ///
    /// A query may legitimately precede any upload, so the implicit session
    /// starts with an empty file list.
    pub async fn append_history(&self, id: &str, question: &str, answer: &str) {
        let record = serde_json::to_string(&ChatTurn::new(question, answer))
            .expect("serializing ChatTurn cannot fail");

        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(entry) if !entry.is_expired() => {
                entry.history.push(record);
                entry.refresh(self.ttl);
            }
            _ => {
                let mut entry = SessionEntry::new(Vec::new(), self.ttl);
                entry.history.push(record);
                sessions.insert(id.to_string(), entry);
            }
        }
    }

    /// Parsed history for a session, oldest first.
    ///
    /// Malformed stored records are skipped and logged, never fatal.
    pub async fn history(&self, id: &str) -> Vec<ChatTurn> {
        let sessions = self.sessions.read().await;
        let Some(entry) = sessions.get(id).filter(|e| !e.is_expired()) else {
            return Vec::new();
        };

        entry
            .history
            .iter()
            .filter_map(|raw| match serde_json::from_str::<ChatTurn>(raw) {
                Ok(turn) => Some(turn),
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "Skipping corrupt history record");
                    None
                }
            })
            .collect()
    }

    /// Remove a session immediately.
    ///
    /// Does not touch the vector store and emits no expiry event; explicit
    /// end-session callers issue the embedding deletion themselves, so both
    /// cleanup paths produce exactly one deletion per session.
    pub async fn delete(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Number of live (unexpired) sessions.
    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|e| !e.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Spawn the background sweeper that evicts lapsed sessions.
    ///
    /// Each lapsed id is sent on the expiry channel exactly once, when it is
    /// removed. The task runs for the store's lifetime; aborting the handle
    /// is the shutdown path.
    pub fn start_sweeper(self: &std::sync::Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                store.sweep().await;
            }
        })
    }

    /// Remove all lapsed sessions and publish their ids.
    async fn sweep(&self) {
        let expired: Vec<String> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| entry.is_expired())
                .map(|(id, _)| id.clone())
                .collect();
            for id in &ids {
                sessions.remove(id);
            }
            ids
        };

        for id in expired {
            tracing::info!(session_id = %id, "Session expired");
            // Receiver gone means the watcher shut down first; nothing left
            // to clean up on its behalf.
            let _ = self.expiry_tx.send(id);
        }
    }
}
