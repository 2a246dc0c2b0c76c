//! Display helpers for rendered conversations.

use chrono::NaiveDate;

use crate::models::Message;

/// Consecutive messages sharing a calendar day (UTC)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup<'a> {
    /// Day shared by every message in the group
    pub day: NaiveDate,
    /// Messages in store order
    pub messages: &'a [Message],
}

/// Split `messages` into runs of the same `created_at` day.
///
/// Store order is kept as-is: a message dated earlier than its predecessor starts
/// a new group rather than being moved.
#[must_use]
pub fn group_by_day(messages: &[Message]) -> Vec<DayGroup<'_>> {
    messages
        .chunk_by(|a, b| a.created_at.date_naive() == b.created_at.date_naive())
        .map(|run| DayGroup {
            day: run[0].created_at.date_naive(),
            messages: run,
        })
        .collect()
}

/// Human-readable attachment size
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthorKind;
    use chrono::{TimeZone, Utc};

    fn at(id: &str, day: u32, hour: u32) -> Message {
        let mut m = Message::new(id, "", AuthorKind::Customer);
        m.created_at = Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap();
        m
    }

    #[test]
    fn test_group_by_day_runs() {
        let messages = vec![at("1", 1, 9), at("2", 1, 23), at("3", 2, 0), at("4", 1, 12)];
        let groups = group_by_day(&messages);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].messages.len(), 2);
        assert_eq!(groups[1].day, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(groups[2].messages[0].id, "4");
    }

    #[test]
    fn test_group_by_day_empty() {
        assert!(group_by_day(&[]).is_empty());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024 * 1024), "3072.0 GB");
    }
}
