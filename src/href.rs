//! Action targets for recognized entities.

use crate::models::EntityType;

/// Map a matched entity to the target a renderer can use as-is.
#[must_use]
pub fn resolve(entity_type: EntityType, raw_text: &str) -> String {
    match entity_type {
        EntityType::Url => raw_text.to_string(),
        EntityType::Email => format!("mailto:{raw_text}"),
        EntityType::Phone => format!("tel:{}", dial_string(raw_text)),
        EntityType::Domain | EntityType::Ip => format!("https://{raw_text}"),
    }
}

/// Digits only, keeping a `+` when it is the first character.
fn dial_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    if raw.starts_with('+') {
        out.push('+');
    }
    out.extend(raw.chars().filter(char::is_ascii_digit));
    out
}
