//! Display formatting helpers for sizes, timestamps and filenames.

use chrono::{DateTime, Utc};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size with two decimals, e.g. `1.50 MB`.
pub fn format_file_size(bytes: Option<u64>) -> String {
    let bytes = match bytes {
        Some(b) if b > 0 => b,
        _ => return "Unknown".to_string(),
    };

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, SIZE_UNITS[unit])
}

fn from_unix(timestamp: Option<i64>) -> Option<DateTime<Utc>> {
    timestamp
        .filter(|t| *t != 0)
        .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
}

/// Unix seconds as `Mar 5, 2024` (UTC).
pub fn format_date(timestamp: Option<i64>) -> String {
    match timestamp {
        None | Some(0) => "Unknown".to_string(),
        Some(_) => from_unix(timestamp)
            .map(|dt| dt.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| "Invalid date".to_string()),
    }
}

/// Unix seconds as `Mar 5, 2024 14:07` (UTC).
pub fn format_date_time(timestamp: Option<i64>) -> String {
    match timestamp {
        None | Some(0) => "Unknown".to_string(),
        Some(_) => from_unix(timestamp)
            .map(|dt| dt.format("%b %-d, %Y %H:%M").to_string())
            .unwrap_or_else(|| "Invalid date".to_string()),
    }
}

/// Upper-cased last extension, or `FILE` when there is none.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_uppercase(),
        None => "FILE".to_string(),
    }
}

/// Cut `text` to at most `max_len` characters, ending in `...` when cut.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
