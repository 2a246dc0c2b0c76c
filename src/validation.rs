use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::models::OutgoingMessage;

/// Longest accepted conversation identifier
pub const MAX_CONVERSATION_ID_LEN: usize = 128;
/// Longest accepted message body, in characters
pub const MAX_BODY_CHARS: usize = 10_000;
/// Fastest allowed polling period
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Slowest allowed polling period
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(600);

fn invalid(msg: impl Into<String>) -> SyncError {
    SyncError::InvalidInput(msg.into())
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a conversation identifier
    pub fn validate_conversation_id(id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(invalid("Conversation id cannot be empty"));
        }

        if id.chars().count() > MAX_CONVERSATION_ID_LEN {
            return Err(invalid(format!(
                "Conversation id too long (max {MAX_CONVERSATION_ID_LEN} characters)"
            )));
        }

        // Ids end up in file names for the JSON repository
        if id.chars().any(|c| c.is_control() || c == '/' || c == '\\') || id.contains("..") {
            return Err(invalid("Conversation id contains invalid characters"));
        }

        Ok(())
    }

    /// Validate an outgoing draft
    pub fn validate_outgoing(draft: &OutgoingMessage) -> Result<()> {
        if draft.body.trim().is_empty() && draft.attachments.is_empty() {
            return Err(invalid("Message needs a body or at least one attachment"));
        }

        if draft.body.chars().count() > MAX_BODY_CHARS {
            return Err(invalid(format!(
                "Message body too long (max {MAX_BODY_CHARS} characters)"
            )));
        }

        if draft.attachments.iter().any(|a| a.name.trim().is_empty()) {
            return Err(invalid("Attachment name cannot be empty"));
        }

        Ok(())
    }

    /// Validate the background polling period
    pub fn validate_poll_interval(interval: Duration) -> Result<()> {
        if interval < MIN_POLL_INTERVAL {
            return Err(invalid(format!(
                "Poll interval too short (min {} ms)",
                MIN_POLL_INTERVAL.as_millis()
            )));
        }

        if interval > MAX_POLL_INTERVAL {
            return Err(invalid(format!(
                "Poll interval too long (max {} s)",
                MAX_POLL_INTERVAL.as_secs()
            )));
        }

        Ok(())
    }

    /// Sanitize text input: drop control characters except newline and tab, trim
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
