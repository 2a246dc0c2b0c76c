use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::metrics::SyncMetrics;
use crate::models::{Message, Segment};
use crate::scanner;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    message_id: String,
    body_hash: u64,
}

impl CacheKey {
    fn for_message(message: &Message) -> Self {
        let mut hasher = DefaultHasher::new();
        message.body.hash(&mut hasher);
        Self {
            message_id: message.id.clone(),
            body_hash: hasher.finish(),
        }
    }
}

/// In-memory memo of scan results keyed by message id and body hash.
///
/// Editing a body changes the key, so stale segments are never served. When the
/// cache reaches capacity it is cleared wholesale.
#[derive(Debug)]
pub struct SegmentCache {
    entries: Mutex<HashMap<CacheKey, Arc<[Segment]>>>,
    capacity: usize,
    metrics: Option<Arc<SyncMetrics>>,
}

impl SegmentCache {
    /// Cache holding at most `capacity` segment lists
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            metrics: None,
        }
    }

    /// Count scanned entities in `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Renderable segments for `message`, scanning only on a miss
    pub fn segments(&self, message: &Message) -> Arc<[Segment]> {
        let key = CacheKey::for_message(message);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(hit) = entries.get(&key) {
            return Arc::clone(hit);
        }

        let segments: Arc<[Segment]> = scanner::scan(&message.body).into();
        if let Some(metrics) = &self.metrics {
            metrics.record_entities(segments.iter().filter(|s| s.entity_type().is_some()).count());
        }

        if entries.len() >= self.capacity {
            debug!(capacity = self.capacity, "Segment cache full, clearing");
            entries.clear();
        }
        entries.insert(key, Arc::clone(&segments));
        segments
    }

    /// Segments for every message, in store order
    pub fn annotate(&self, messages: &[Message]) -> Vec<Arc<[Segment]>> {
        messages.iter().map(|m| self.segments(m)).collect()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
