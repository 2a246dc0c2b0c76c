//! Conversation Sync - Message Annotation and Polling Synchronization
//!
//! A Rust library backing a customer-conversation view: it turns message bodies
//! into renderable segments with linked entities, and keeps a local message list
//! in step with a polled remote feed.
//!
//! # Features
//!
//! - Entity scanning for URLs, emails, phone numbers, bare domains and IPv4 addresses
//! - Action targets (`mailto:`, `tel:`, `https://`) for every recognized entity
//! - Snapshot merging that stays silent when nothing changed
//! - Optimistic sends appended ahead of remote confirmation
//! - Background polling tied to an explicit open/close session

/// Segment memoization
pub mod cache;
/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// Entity action targets
pub mod href;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Feed and send provider traits
pub mod repository;
/// Entity scanning
pub mod scanner;
/// Ordered message view and merge logic
pub mod store;
/// Polling session lifecycle
pub mod sync;
/// Display helpers
pub mod utils;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use error::{Result, SyncError};
pub use models::{AuthorKind, EntityType, Message, OutgoingMessage, Segment};
pub use scanner::{scan, EntityScanner};
pub use store::{MergePolicy, MessageStore};
pub use sync::{SyncEngine, SyncStatus};
