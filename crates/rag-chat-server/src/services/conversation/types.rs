use std::time::{Duration, Instant};

use crate::models::chat::{ChatMessage, Role};
use crate::services::query_analyzer::ServiceIntent;

/// Conversation state stored in memory per session
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Transcript, oldest first
    pub messages: Vec<ChatMessage>,

    /// Category of the most recently classified user message
    pub last_intent: Option<ServiceIntent>,

    pub created_at: Instant,

    /// Last read or write, drives idle expiration
    pub last_activity: Instant,
}

impl SessionState {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            messages: Vec::new(),
            last_intent: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn is_expired(&self, policy: &EvictionPolicy) -> bool {
        policy
            .ttl
            .is_some_and(|ttl| self.last_activity.elapsed() > ttl)
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Clear transcript and intent, keep the session alive
    pub fn clear(&mut self) {
        self.messages.clear();
        self.last_intent = None;
    }

    /// Content of the last `n` user messages, oldest to newest
    pub fn recent_user_messages(&self, n: usize) -> Vec<String> {
        let mut recent: Vec<String> = self
            .messages
            .iter()
            .rev()
            .filter(|msg| msg.role == Role::User)
            .take(n)
            .map(|msg| msg.content.clone())
            .collect();
        recent.reverse();
        recent
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Eviction knobs. `None` disables a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Idle time after which a session is dropped
    pub ttl: Option<Duration>,
    /// Transcript length cap, oldest messages go first
    pub max_messages: Option<usize>,
}

impl EvictionPolicy {
    /// No expiry, no truncation
    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub active_sessions: usize,
    pub total_messages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_user_messages_skips_assistant() {
        let mut state = SessionState::new();
        state.messages.push(ChatMessage::user("a"));
        state.messages.push(ChatMessage::assistant("reply a"));
        state.messages.push(ChatMessage::user("b"));
        state.messages.push(ChatMessage::assistant("reply b"));
        state.messages.push(ChatMessage::user("c"));

        assert_eq!(state.recent_user_messages(2), vec!["b", "c"]);
        assert_eq!(state.recent_user_messages(10), vec!["a", "b", "c"]);
        assert!(state.recent_user_messages(0).is_empty());
    }

    #[test]
    fn test_expiration_disabled_without_ttl() {
        let state = SessionState::new();
        assert!(!state.is_expired(&EvictionPolicy::unbounded()));

        std::thread::sleep(Duration::from_millis(5));
        assert!(state.is_expired(&EvictionPolicy {
            ttl: Some(Duration::from_millis(1)),
            max_messages: None,
        }));
    }
}
