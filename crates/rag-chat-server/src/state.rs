use axum::extract::FromRef;
use std::sync::Arc;

use crate::services::conversation::ConversationManager;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversation_manager: Arc<ConversationManager>,
}

impl AppState {
    pub fn new(conversation_manager: Arc<ConversationManager>) -> Self {
        Self {
            conversation_manager,
        }
    }
}

impl FromRef<AppState> for Arc<ConversationManager> {
    fn from_ref(state: &AppState) -> Self {
        state.conversation_manager.clone()
    }
}
