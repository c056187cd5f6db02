use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Retrieval failed: {0:#}")]
    Retrieval(#[source] anyhow::Error),
}
