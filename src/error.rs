//! Error types for the conversation-sync library.
//!
//! Scanning and merging are total and never produce errors; everything here comes
//! from the collaborator boundaries (feed, send) or from caller input.

use thiserror::Error;

/// Errors that can occur while synchronizing a conversation.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The message feed could not produce a snapshot
    #[error("Feed error for conversation {conversation_id}: {reason}")]
    Feed {
        /// Conversation that was being fetched
        conversation_id: String,
        /// Provider-supplied failure description
        reason: String,
    },

    /// The send provider rejected or failed to deliver a message
    #[error("Send error for conversation {conversation_id}: {reason}")]
    Send {
        /// Conversation the message was addressed to
        conversation_id: String,
        /// Provider-supplied failure description
        reason: String,
    },

    /// An operation needed an open conversation but none is open
    #[error("No conversation is open")]
    NotOpen,

    /// Caller input failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Build a feed error for `conversation_id`
    pub fn feed(conversation_id: &str, reason: impl std::fmt::Display) -> Self {
        Self::Feed {
            conversation_id: conversation_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build a send error for `conversation_id`
    pub fn send(conversation_id: &str, reason: impl std::fmt::Display) -> Self {
        Self::Send {
            conversation_id: conversation_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience type alias for Result with `SyncError`
pub type Result<T> = std::result::Result<T, SyncError>;

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
