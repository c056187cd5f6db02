use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::chat::ChatMessage;
use crate::services::query_analyzer::ServiceIntent;
use super::types::{EvictionPolicy, SessionState, StoreStats};

/// Session-scoped chat memory.
///
/// Every operation is atomic for its session. Unknown sessions read as empty
/// and are created lazily by the first write.
pub trait SessionStore: Send + Sync {
    /// Add a message to the end of the transcript
    fn append(&self, session_id: &str, message: ChatMessage);

    /// Snapshot of the full transcript, oldest first
    fn transcript(&self, session_id: &str) -> Vec<ChatMessage>;

    /// Content of the last `n` user messages, oldest first
    fn recent_user_messages(&self, session_id: &str, n: usize) -> Vec<String>;

    /// Clear transcript and intent. No-op for unknown sessions.
    fn reset(&self, session_id: &str);

    fn intent(&self, session_id: &str) -> Option<ServiceIntent>;

    fn set_intent(&self, session_id: &str, intent: ServiceIntent);

    /// Drop expired sessions, returns how many were removed
    fn cleanup_expired(&self) -> usize;

    fn stats(&self) -> StoreStats;
}

/// Thread-safe in-memory session store
/// Uses DashMap so distinct sessions never contend
#[derive(Clone)]
pub struct InMemorySessionStore {
    /// Session storage: session_id -> SessionState
    sessions: Arc<DashMap<String, SessionState>>,
    policy: EvictionPolicy,
}

impl InMemorySessionStore {
    pub fn new(policy: EvictionPolicy) -> Self {
        info!(
            "Initializing session store (ttl: {:?}, max_messages: {:?})",
            policy.ttl, policy.max_messages
        );
        Self {
            sessions: Arc::new(DashMap::new()),
            policy,
        }
    }

    /// Run `f` against a live session, dropping it first if it expired.
    /// Returns None for unknown or expired sessions.
    fn read<T>(&self, session_id: &str, f: impl FnOnce(&SessionState) -> T) -> Option<T> {
        let mut entry = self.sessions.get_mut(session_id)?;

        if entry.is_expired(&self.policy) {
            drop(entry);
            self.sessions
                .remove_if(session_id, |_, state| state.is_expired(&self.policy));
            debug!("Session {} expired, removed from store", session_id);
            return None;
        }

        entry.touch();
        Some(f(entry.value()))
    }

    /// Run `f` against the session, creating it (or replacing an expired one)
    fn write<T>(&self, session_id: &str, f: impl FnOnce(&mut SessionState) -> T) -> T {
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Creating session {}", session_id);
                SessionState::new()
            });

        if entry.is_expired(&self.policy) {
            debug!("Session {} expired, starting fresh", session_id);
            *entry = SessionState::new();
        }

        entry.touch();
        f(entry.value_mut())
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(EvictionPolicy::unbounded())
    }
}

impl SessionStore for InMemorySessionStore {
    fn append(&self, session_id: &str, message: ChatMessage) {
        let max_messages = self.policy.max_messages;
        self.write(session_id, |state| {
            state.messages.push(message);

            if let Some(max) = max_messages {
                let excess = state.messages.len().saturating_sub(max);
                if excess > 0 {
                    state.messages.drain(0..excess);
                    debug!("Session {} transcript truncated by {}", session_id, excess);
                }
            }
        });
    }

    fn transcript(&self, session_id: &str) -> Vec<ChatMessage> {
        self.read(session_id, |state| state.messages.clone())
            .unwrap_or_default()
    }

    fn recent_user_messages(&self, session_id: &str, n: usize) -> Vec<String> {
        self.read(session_id, |state| state.recent_user_messages(n))
            .unwrap_or_default()
    }

    fn reset(&self, session_id: &str) {
        if let Some(mut state) = self.sessions.get_mut(session_id) {
            state.clear();
            state.touch();
            debug!("Session {} reset", session_id);
        }
    }

    fn intent(&self, session_id: &str) -> Option<ServiceIntent> {
        self.read(session_id, |state| state.last_intent).flatten()
    }

    fn set_intent(&self, session_id: &str, intent: ServiceIntent) {
        self.write(session_id, |state| state.last_intent = Some(intent));
    }

    fn cleanup_expired(&self) -> usize {
        let start_len = self.sessions.len();
        self.sessions
            .retain(|_, state: &mut SessionState| !state.is_expired(&self.policy));
        let end_len = self.sessions.len();

        let count = start_len.saturating_sub(end_len);

        if count > 0 {
            info!("Cleaned up {} expired sessions", count);
        }

        count
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            active_sessions: self.sessions.len(),
            total_messages: self.sessions.iter().map(|e| e.messages.len()).sum(),
        }
    }
}
