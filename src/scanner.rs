//! Entity scanning for message bodies
//!
//! Five independent matchers (url, email, phone, domain, ip) each produce
//! candidate spans over the whole text. Candidates are ordered by start offset,
//! ties broken by [`EntityType::precedence`], and a left-to-right sweep keeps
//! every candidate that does not overlap one already kept. The kept spans cut the
//! text into plain and entity segments whose contents concatenate back to the
//! input exactly.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::href;
use crate::models::{EntityMatch, EntityType, Segment};

const URL_PATTERN: &str = r#"https?://[^\s<>"']+"#;
const EMAIL_PATTERN: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}";
const PHONE_PATTERN: &str = r"\+?[0-9 ()\-]{10,}";
const DOMAIN_PATTERN: &str = r"(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}";
const IP_PATTERN: &str = r"(?:(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])";

const PHONE_MIN_LEN: usize = 10;

/// Adjusts or rejects a raw regex hit. Returns the final `(start, end)`.
type BoundaryRule = fn(&str, usize, usize) -> Option<(usize, usize)>;

struct Matcher {
    entity_type: EntityType,
    pattern: Regex,
    boundary: BoundaryRule,
}

impl Matcher {
    fn new(entity_type: EntityType, pattern: &str, boundary: BoundaryRule) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("Failed to compile {} pattern", entity_type.as_str()))?;
        Ok(Self {
            entity_type,
            pattern,
            boundary,
        })
    }

    fn candidates<'a>(&'a self, text: &'a str) -> impl Iterator<Item = EntityMatch> + 'a {
        self.pattern.find_iter(text).filter_map(move |m| {
            let (start, end) = (self.boundary)(text, m.start(), m.end())?;
            Some(EntityMatch {
                entity_type: self.entity_type,
                start,
                end,
                raw_text: text[start..end].to_string(),
            })
        })
    }
}

/// Compiled set of entity matchers
pub struct EntityScanner {
    matchers: Vec<Matcher>,
}

impl std::fmt::Debug for EntityScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityScanner")
            .field("matchers", &self.matchers.iter().map(|m| m.entity_type).collect::<Vec<_>>())
            .finish()
    }
}

impl EntityScanner {
    /// Compile all matchers in precedence order
    pub fn new() -> Result<Self> {
        let matchers = vec![
            Matcher::new(EntityType::Url, URL_PATTERN, as_is)?,
            Matcher::new(EntityType::Email, EMAIL_PATTERN, as_is)?,
            Matcher::new(EntityType::Phone, PHONE_PATTERN, phone_boundary)?,
            Matcher::new(EntityType::Domain, DOMAIN_PATTERN, domain_boundary)?,
            Matcher::new(EntityType::Ip, IP_PATTERN, ip_boundary)?,
        ];
        Ok(Self { matchers })
    }

    /// Accepted entity spans: pairwise disjoint, ascending by start.
    #[must_use]
    pub fn find_entities(&self, text: &str) -> Vec<EntityMatch> {
        let mut candidates: Vec<EntityMatch> = self
            .matchers
            .iter()
            .flat_map(|matcher| matcher.candidates(text))
            .collect();

        // Earliest start wins; at equal starts the higher-precedence type wins.
        candidates.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.entity_type.precedence().cmp(&b.entity_type.precedence()))
        });

        let total = candidates.len();
        let mut accepted: Vec<EntityMatch> = Vec::with_capacity(total);
        for candidate in candidates {
            // Accepted spans are sorted and disjoint, so only the last can overlap.
            if accepted.last().is_none_or(|last| !last.overlaps(&candidate)) {
                accepted.push(candidate);
            }
        }

        trace!(candidates = total, accepted = accepted.len(), "Entity sweep finished");
        accepted
    }

    /// Split `text` into plain and entity segments
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<Segment> {
        if text.is_empty() {
            return Vec::new();
        }

        let matches = self.find_entities(text);
        if matches.is_empty() {
            return vec![Segment::Text {
                content: text.to_string(),
            }];
        }

        let mut segments = Vec::with_capacity(matches.len() * 2 + 1);
        let mut cursor = 0;
        for m in matches {
            if m.start > cursor {
                segments.push(Segment::Text {
                    content: text[cursor..m.start].to_string(),
                });
            }
            segments.push(Segment::Entity {
                href: href::resolve(m.entity_type, &m.raw_text),
                entity_type: m.entity_type,
                content: m.raw_text,
            });
            cursor = m.end;
        }
        if cursor < text.len() {
            segments.push(Segment::Text {
                content: text[cursor..].to_string(),
            });
        }
        segments
    }
}

fn default_scanner() -> Option<&'static EntityScanner> {
    static SCANNER: OnceLock<Option<EntityScanner>> = OnceLock::new();
    SCANNER
        .get_or_init(|| match EntityScanner::new() {
            Ok(scanner) => Some(scanner),
            Err(e) => {
                tracing::error!("Entity scanner unavailable, rendering plain text: {e:#}");
                None
            }
        })
        .as_ref()
}

/// Scan `text` with the shared default scanner
#[must_use]
pub fn scan(text: &str) -> Vec<Segment> {
    match default_scanner() {
        Some(scanner) => scanner.scan(text),
        None if text.is_empty() => Vec::new(),
        None => vec![Segment::Text {
            content: text.to_string(),
        }],
    }
}

/// Scan possibly-absent text; `None` yields no segments
#[must_use]
pub fn scan_optional(text: Option<&str>) -> Vec<Segment> {
    text.map_or_else(Vec::new, scan)
}

/// Scan a loosely typed JSON body.
///
/// Strings are scanned, `null` yields no segments, and any other value comes back
/// unchanged as a single text segment of its JSON rendering.
#[must_use]
pub fn scan_value(value: &Value) -> Vec<Segment> {
    match value {
        Value::String(text) => scan(text),
        Value::Null => Vec::new(),
        other => vec![Segment::Text {
            content: other.to_string(),
        }],
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn char_before(text: &str, at: usize) -> Option<char> {
    text[..at].chars().next_back()
}

fn char_after(text: &str, at: usize) -> Option<char> {
    text[at..].chars().next()
}

fn ends_with_ignore_case(prefix: &str, suffix: &str) -> bool {
    let (p, s) = (prefix.as_bytes(), suffix.as_bytes());
    p.len() >= s.len() && p[p.len() - s.len()..].eq_ignore_ascii_case(s)
}

#[allow(clippy::unnecessary_wraps)]
const fn as_is(_text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    Some((start, end))
}

/// Trim the spaces the loose character class picks up at either end.
fn phone_boundary(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let raw = &text[start..end];
    let leading = raw.len() - raw.trim_start_matches(' ').len();
    let trimmed = raw.trim_matches(' ');
    if trimmed.len() < PHONE_MIN_LEN || !trimmed.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let start = start + leading;
    Some((start, start + trimmed.len()))
}

fn domain_boundary(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let prefix = &text[..start];
    if prefix.ends_with("://") || ends_with_ignore_case(prefix, "mailto:") {
        return None;
    }
    if char_before(text, start).is_some_and(|c| is_word_char(c) || c == '.' || c == '-') {
        return None;
    }
    if char_after(text, end).is_some_and(is_word_char) {
        return None;
    }
    Some((start, end))
}

/// Reject dotted quads embedded in longer numeric runs. A single trailing dot is
/// sentence punctuation unless another digit follows it.
fn ip_boundary(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    if char_before(text, start).is_some_and(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let mut rest = text[end..].chars();
    match rest.next() {
        Some(c) if c.is_ascii_digit() => None,
        Some('.') if rest.next().is_some_and(|c| c.is_ascii_digit() || c == '.') => None,
        _ => Some((start, end)),
    }
}
