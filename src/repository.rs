//! Collaborator boundaries: where snapshots come from and where sends go.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::models::{AuthorKind, Message, OutgoingMessage};
use crate::validation::InputValidator;

/// Source of conversation snapshots
#[async_trait]
pub trait MessageFeed: Send + Sync {
    /// Full ordered message list of `conversation_id`, oldest first
    async fn fetch(&self, conversation_id: &str) -> Result<Vec<Message>>;
}

/// Remote send endpoint
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Deliver `draft` and return the message as recorded remotely
    async fn send(&self, conversation_id: &str, draft: &OutgoingMessage) -> Result<Message>;
}

/// File-backed feed and sender: one `<conversation_id>.json` array per conversation.
///
/// Meant for local runs of the CLI and for tests; writes are serialized within one
/// process only.
#[derive(Debug)]
pub struct JsonFileRepository {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Repository rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory holding the conversation files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, conversation_id: &str) -> Result<PathBuf> {
        InputValidator::validate_conversation_id(conversation_id)?;
        Ok(self.dir.join(format!("{conversation_id}.json")))
    }

    async fn read(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let path = self.path_for(conversation_id)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(conversation_id, "No conversation file yet, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(SyncError::feed(conversation_id, e)),
        };
        serde_json::from_str(&raw).map_err(|e| SyncError::feed(conversation_id, e))
    }
}

#[async_trait]
impl MessageFeed for JsonFileRepository {
    async fn fetch(&self, conversation_id: &str) -> Result<Vec<Message>> {
        self.read(conversation_id).await
    }
}

#[async_trait]
impl MessageSender for JsonFileRepository {
    async fn send(&self, conversation_id: &str, draft: &OutgoingMessage) -> Result<Message> {
        let _guard = self.write_lock.lock().await;
        let mut messages = self.read(conversation_id).await?;

        let message = Message {
            id: format!("msg-{:016x}", rand::random::<u64>()),
            body: draft.body.clone(),
            author_kind: AuthorKind::Admin,
            created_at: Utc::now(),
            attachments: draft.attachments.clone(),
            delivery_state: None,
            server_id: None,
        };
        messages.push(message.clone());

        let path = self.path_for(conversation_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(&messages)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| SyncError::send(conversation_id, e))?;

        debug!(conversation_id, message_id = %message.id, "Message appended to file");
        Ok(message)
    }
}
