use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity type categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    RequestReceived,
    TranscriptReset,
    RetrievalExecuted,
    RetrievalEmpty,
    RetrievalError,
    LlmError,
    MessageSent,
    SessionReset,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestReceived => "request_received",
            Self::TranscriptReset => "transcript_reset",
            Self::RetrievalExecuted => "retrieval_executed",
            Self::RetrievalEmpty => "retrieval_empty",
            Self::RetrievalError => "retrieval_error",
            Self::LlmError => "llm_error",
            Self::MessageSent => "message_sent",
            Self::SessionReset => "session_reset",
        }
    }
}

/// Activity status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Error,
    Warning,
    Info,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// Complete activity log entry
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLog {
    pub session_id: String,

    pub activity_type: ActivityType,
    pub activity_status: ActivityStatus,

    // Context
    pub intent: Option<String>,
    pub message_content: Option<String>,
    pub response_content: Option<String>,

    // Retrieval
    pub retrieval_count: Option<i32>,
    pub similarity_score: Option<f32>,

    // Performance
    pub processing_time_ms: Option<i32>,
    pub llm_call_duration_ms: Option<i32>,
    pub retrieval_duration_ms: Option<i32>,

    // Error
    pub error_message: Option<String>,
    pub error_type: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// Create builder for fluent API
    pub fn builder(session_id: impl Into<String>, activity_type: ActivityType) -> ActivityLogBuilder {
        ActivityLogBuilder::new(session_id, activity_type)
    }
}

/// Builder pattern for ActivityLog
pub struct ActivityLogBuilder {
    log: ActivityLog,
}

impl ActivityLogBuilder {
    pub fn new(session_id: impl Into<String>, activity_type: ActivityType) -> Self {
        Self {
            log: ActivityLog {
                session_id: session_id.into(),
                activity_type,
                activity_status: ActivityStatus::Success,
                intent: None,
                message_content: None,
                response_content: None,
                retrieval_count: None,
                similarity_score: None,
                processing_time_ms: None,
                llm_call_duration_ms: None,
                retrieval_duration_ms: None,
                error_message: None,
                error_type: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn status(mut self, status: ActivityStatus) -> Self {
        self.log.activity_status = status;
        self
    }

    pub fn intent(mut self, intent: impl Into<String>) -> Self {
        self.log.intent = Some(intent.into());
        self
    }

    pub fn message(mut self, content: impl Into<String>) -> Self {
        self.log.message_content = Some(content.into());
        self
    }

    pub fn response(mut self, content: impl Into<String>) -> Self {
        self.log.response_content = Some(content.into());
        self
    }

    pub fn retrieval_count(mut self, count: i32) -> Self {
        self.log.retrieval_count = Some(count);
        self
    }

    pub fn similarity(mut self, score: f32) -> Self {
        self.log.similarity_score = Some(score);
        self
    }

    pub fn processing_time(mut self, ms: i32) -> Self {
        self.log.processing_time_ms = Some(ms);
        self
    }

    pub fn llm_duration(mut self, ms: i32) -> Self {
        self.log.llm_call_duration_ms = Some(ms);
        self
    }

    pub fn retrieval_duration(mut self, ms: i32) -> Self {
        self.log.retrieval_duration_ms = Some(ms);
        self
    }

    /// Record an error, also flips status to Error
    pub fn error(mut self, message: impl Into<String>, error_type: impl Into<String>) -> Self {
        self.log.error_message = Some(message.into());
        self.log.error_type = Some(error_type.into());
        self.log.activity_status = ActivityStatus::Error;
        self
    }

    pub fn build(self) -> ActivityLog {
        self.log
    }
}
