//! Ordered in-memory view of one conversation
//!
//! The store's order is whatever the last accepted source said: the most recent
//! remote snapshot, plus any local appends made on top of it. Nothing here ever
//! re-sorts.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{DeliveryState, Message};

/// How a diverging snapshot is applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Replace the local collection with the snapshot as-is. A snapshot that lags
    /// behind a local send drops the optimistic entry until a later snapshot
    /// includes it.
    #[default]
    Snapshot,
    /// Replace with the snapshot, then re-append local entries whose id the
    /// snapshot does not contain yet.
    PreservePending,
}

/// Result of applying a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Snapshot matched positionally; store untouched
    Unchanged,
    /// Store content was substituted
    Replaced,
}

impl MergeOutcome {
    /// True if the store changed
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Replaced)
    }
}

/// True if `remote` differs from `local` in length or in any positional id
#[must_use]
pub fn diverges(local: &[Message], remote: &[Message]) -> bool {
    local.len() != remote.len() || local.iter().zip(remote).any(|(l, r)| l.id != r.id)
}

/// Append-ordered messages of a single conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStore {
    messages: Vec<Message>,
    revision: u64,
}

impl MessageStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing snapshot
    #[must_use]
    pub const fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            revision: 0,
        }
    }

    /// Messages in display order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if there are no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Counter bumped on every content change
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a remote snapshot.
    ///
    /// Matching snapshots leave the store (and its revision) untouched; anything
    /// else replaces the whole collection. Fields of messages whose ids match are
    /// not compared.
    pub fn merge(&mut self, remote: Vec<Message>, policy: MergePolicy) -> MergeOutcome {
        if !diverges(&self.messages, &remote) {
            return MergeOutcome::Unchanged;
        }

        let next = match policy {
            MergePolicy::Snapshot => remote,
            MergePolicy::PreservePending => self.with_local_tail(remote),
        };

        if !diverges(&self.messages, &next) {
            return MergeOutcome::Unchanged;
        }
        self.replace(next);
        MergeOutcome::Replaced
    }

    fn with_local_tail(&self, mut remote: Vec<Message>) -> Vec<Message> {
        let known: HashSet<&str> = remote.iter().map(|m| m.id.as_str()).collect();
        let tail: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.is_local() && !known.contains(m.id.as_str()))
            .filter(|m| m.server_id.as_deref().is_none_or(|id| !known.contains(id)))
            .cloned()
            .collect();
        remote.extend(tail);
        remote
    }

    fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.revision += 1;
    }

    /// Append a locally created message as pending
    pub fn append_optimistic(&mut self, mut message: Message) {
        message.delivery_state = Some(DeliveryState::Pending);
        self.messages.push(message);
        self.revision += 1;
    }

    /// Mark the optimistic entry `local_id` as confirmed by `server`.
    ///
    /// The entry keeps its local id and position and only records the server id,
    /// so the next snapshot carrying the server copy diverges and supersedes it.
    /// If the server copy is already in the store the local entry is removed.
    /// Returns false if the entry is no longer in the store, which happens when a
    /// snapshot replaced it.
    pub fn confirm(&mut self, local_id: &str, server: &Message) -> bool {
        let Some(pos) = self.messages.iter().position(|m| m.id == local_id) else {
            return false;
        };

        if server.id != local_id && self.messages.iter().any(|m| m.id == server.id) {
            self.messages.remove(pos);
        } else {
            let entry = &mut self.messages[pos];
            entry.server_id = Some(server.id.clone());
            entry.delivery_state = Some(DeliveryState::Confirmed);
        }
        self.revision += 1;
        true
    }
}
