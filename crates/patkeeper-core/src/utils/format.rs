use chrono::{DateTime, Utc};

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp as a calendar date without time of day, e.g. `Dec 31, 2024`
pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format("%b %d, %Y").to_string()
}
