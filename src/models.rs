//! Data models for conversation messages and scan output
//!
//! Messages mirror the remote feed's JSON shape (camelCase). Entity matches and
//! segments are transient scan results and are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorKind {
    /// The customer on the other side of the conversation
    Customer,
    /// A dashboard operator
    Admin,
}

/// Delivery progress of a locally created message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    /// Appended locally, send not yet acknowledged
    Pending,
    /// Send provider acknowledged the message
    Confirmed,
}

/// A file attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Download location
    pub url: String,
}

/// One conversation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Opaque identifier, stable once assigned by the remote source
    pub id: String,
    /// Raw message text, possibly empty
    #[serde(default)]
    pub body: String,
    /// Author of the message
    pub author_kind: AuthorKind,
    /// Creation time, used for display grouping only
    pub created_at: DateTime<Utc>,
    /// Attachments in upload order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,
    /// Set only on entries created locally by a send
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_state: Option<DeliveryState>,
    /// Id the send provider assigned to a confirmed local entry
    #[serde(skip)]
    pub server_id: Option<String>,
}

impl Message {
    /// Create a remote-style message with no attachments
    pub fn new(id: impl Into<String>, body: impl Into<String>, author_kind: AuthorKind) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            author_kind,
            created_at: Utc::now(),
            attachments: Vec::new(),
            delivery_state: None,
            server_id: None,
        }
    }

    /// True if this entry was created locally and not yet confirmed
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.delivery_state == Some(DeliveryState::Pending)
    }

    /// True if this entry originated from a local send
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.delivery_state.is_some()
    }
}

/// Draft handed to the send provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Message text
    pub body: String,
    /// Attachments already uploaded elsewhere
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl OutgoingMessage {
    /// Text-only draft
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            attachments: Vec::new(),
        }
    }
}

/// Category of an embedded reference
///
/// Declaration order is the tie-break precedence when two candidates start at
/// the same offset: `Url` beats everything, `Ip` loses to everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// `http://` or `https://` link
    Url,
    /// Email address
    Email,
    /// Loose phone-number run
    Phone,
    /// Bare domain name
    Domain,
    /// Dotted-quad IPv4 address
    Ip,
}

impl EntityType {
    /// Tie-break rank; lower wins
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Url => 0,
            Self::Email => 1,
            Self::Phone => 2,
            Self::Domain => 3,
            Self::Ip => 4,
        }
    }

    /// Lowercase name used in logs and metrics labels
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Domain => "domain",
            Self::Ip => "ip",
        }
    }
}

/// A candidate or accepted entity span
///
/// `start` and `end` are half-open byte offsets into the scanned `&str`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMatch {
    /// Kind of reference
    pub entity_type: EntityType,
    /// First byte of the match
    pub start: usize,
    /// One past the last byte of the match
    pub end: usize,
    /// Exact matched substring
    pub raw_text: String,
}

impl EntityMatch {
    /// True if the two half-open spans share at least one byte
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Unit of render output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Segment {
    /// Plain text run
    Text {
        /// Source substring
        content: String,
    },
    /// Recognized reference
    Entity {
        /// Source substring
        content: String,
        /// Kind of reference
        entity_type: EntityType,
        /// Ready-to-use action target
        href: String,
    },
}

impl Segment {
    /// Source substring covered by this segment
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Text { content } | Self::Entity { content, .. } => content,
        }
    }

    /// Entity type, if this is an entity segment
    #[must_use]
    pub const fn entity_type(&self) -> Option<EntityType> {
        match self {
            Self::Text { .. } => None,
            Self::Entity { entity_type, .. } => Some(*entity_type),
        }
    }

    /// Action target, if this is an entity segment
    #[must_use]
    pub fn href(&self) -> Option<&str> {
        match self {
            Self::Text { .. } => None,
            Self::Entity { href, .. } => Some(href),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_deserializes_missing_and_null_attachments() {
        let missing = r#"{"id":"m1","body":"hi","authorKind":"customer","createdAt":"2024-03-01T10:00:00Z"}"#;
        let null = r#"{"id":"m2","body":"hi","authorKind":"admin","createdAt":"2024-03-01T10:00:00Z","attachments":null}"#;

        let a: Message = serde_json::from_str(missing).unwrap();
        let b: Message = serde_json::from_str(null).unwrap();

        assert!(a.attachments.is_empty());
        assert!(b.attachments.is_empty());
        assert_eq!(b.author_kind, AuthorKind::Admin);
        assert_eq!(a.delivery_state, None);
    }

    #[test]
    fn test_precedence_follows_declaration_order() {
        let declared = [
            EntityType::Url,
            EntityType::Email,
            EntityType::Phone,
            EntityType::Domain,
            EntityType::Ip,
        ];
        let mut ranks: Vec<u8> = declared.iter().map(|t| t.precedence()).collect();
        let sorted = ranks.clone();
        ranks.sort_unstable();
        assert_eq!(ranks, sorted);
        assert!(EntityType::Url < EntityType::Ip);
    }

    #[test]
    fn test_segment_serializes_with_kind_tag() {
        let seg = Segment::Entity {
            content: "a@b.io".into(),
            entity_type: EntityType::Email,
            href: "mailto:a@b.io".into(),
        };
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["kind"], "entity");
        assert_eq!(json["entityType"], "email");
        assert_eq!(json["href"], "mailto:a@b.io");
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = EntityMatch {
            entity_type: EntityType::Url,
            start: 0,
            end: 5,
            raw_text: String::new(),
        };
        let b = EntityMatch {
            entity_type: EntityType::Ip,
            start: 5,
            end: 8,
            raw_text: String::new(),
        };
        assert!(!a.overlaps(&b));
        let c = EntityMatch { start: 4, ..b };
        assert!(a.overlaps(&c));
    }
}
