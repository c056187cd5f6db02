use tracing::{debug, info};

use crate::models::chat::ChatMessage;
use crate::services::query_analyzer::QueryAnalyzer;
use super::manager::RetrievalChunk;
use super::store::SessionStore;

/// Suffix that steers retrieval toward pricing passages
pub const PRICING_MARKER: &str = " pricing rate";

/// Placeholder in the system prompt replaced by retrieved passages
pub const DATA_PLACEHOLDER: &str = "{{DATA}}";

/// Outcome of building a contextual query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextualQuery {
    /// Search string sent to the retrieval provider
    pub text: String,
    /// Transcript was cleared because the topic changed
    pub transcript_reset: bool,
}

pub struct ContextBuilder {
    system_prompt: String,
    history_window: usize,
    intent_aware: bool,
}

impl ContextBuilder {
    pub fn new(system_prompt: String, history_window: usize, intent_aware: bool) -> Self {
        Self {
            system_prompt,
            history_window,
            intent_aware,
        }
    }

    pub fn default_system_prompt() -> String {
        r#"You are a friendly sales representative for a home services company.
You put customer satisfaction first and always answer in a warm, helpful tone.

Guidelines:
- Only answer based on the provided knowledge below
- Do not answer if you are unsure; ask the customer for the details you need first
- If it is unclear which service the customer means, ask for clarification
- Be specific, and suggest related services when they genuinely help the customer
- If the knowledge does not contain the answer, just say: I don't know

The data:
{{DATA}}"#
            .to_string()
    }

    /// Build the search string for a new message.
    /// Dispatches on the configured mode.
    pub fn build_query(
        &self,
        store: &dyn SessionStore,
        session_id: &str,
        user_query: &str,
    ) -> ContextualQuery {
        if self.intent_aware {
            self.intent_aware_query(store, session_id, user_query)
        } else {
            ContextualQuery {
                text: self.contextual_query(store, session_id, user_query),
                transcript_reset: false,
            }
        }
    }

    /// Recent user messages followed by the new query. Read-only.
    pub fn contextual_query(
        &self,
        store: &dyn SessionStore,
        session_id: &str,
        user_query: &str,
    ) -> String {
        let recent = store.recent_user_messages(session_id, self.history_window);
        let context_query = Self::join_with_history(&recent, user_query);
        debug!("Contextual query: {}", context_query);
        context_query
    }

    /// Classify the query, reset the transcript on topic change, then build
    /// the contextual query with an optional pricing marker.
    pub fn intent_aware_query(
        &self,
        store: &dyn SessionStore,
        session_id: &str,
        user_query: &str,
    ) -> ContextualQuery {
        let intent = QueryAnalyzer::classify(user_query);

        // Only a known previous intent can trigger a reset
        let transcript_reset = match store.intent(session_id) {
            Some(previous) if previous != intent => {
                info!(
                    "Intent changed from {} to {} for session {}, resetting transcript",
                    previous, intent, session_id
                );
                store.reset(session_id);
                true
            }
            _ => false,
        };
        store.set_intent(session_id, intent);

        let mut text = self.contextual_query(store, session_id, user_query);

        if QueryAnalyzer::is_pricing_query(user_query) {
            debug!("Pricing question detected, adding marker");
            text.push_str(PRICING_MARKER);
        }

        ContextualQuery {
            text,
            transcript_reset,
        }
    }

    /// System message with the retrieved passages embedded verbatim
    pub fn build_system_message(&self, chunks: &[RetrievalChunk]) -> ChatMessage {
        let data = chunks
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        ChatMessage::system(self.system_prompt.replace(DATA_PLACEHOLDER, &data))
    }

    fn join_with_history(history: &[String], user_query: &str) -> String {
        if history.is_empty() {
            return user_query.to_string();
        }
        format!("{} {}", history.join(" "), user_query)
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(Self::default_system_prompt(), 2, true)
    }
}
