//! Display formatting for candidate fields.
//!
//! Everything here is a pure function of its input (plus `now` for ages).

use crate::types::{SizeField, TimeField};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

/// Placeholder for an absent or unreadable value.
pub const PLACEHOLDER: &str = "—";

static GB_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*GB\s*$").expect("size pattern"));
static BTIH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)btih:([0-9a-f]+)").expect("btih pattern"));

/// Episode size in whole megabytes.
///
/// Text of the form `"X.Y GB"` becomes `round(X.Y * 1024)`; a byte count
/// becomes `round(n / 1024 / 1024)`. Anything else has no size.
///
/// # Examples
///
/// ```
/// use dvr_console::format::episode_size_mb;
/// use dvr_console::types::SizeField;
///
/// assert_eq!(episode_size_mb(Some(&SizeField::Text("1.3 GB".into()))), Some(1331));
/// assert_eq!(episode_size_mb(Some(&SizeField::Bytes(1048576.0))), Some(1));
/// assert_eq!(episode_size_mb(Some(&SizeField::Text("700 MB".into()))), None);
/// ```
pub fn episode_size_mb(size: Option<&SizeField>) -> Option<u64> {
    let mb = match size? {
        SizeField::Text(text) => {
            let caps = GB_SIZE.captures(text)?;
            caps[1].parse::<f64>().ok()? * 1024.0
        }
        SizeField::Bytes(n) => n / 1024.0 / 1024.0,
    };
    (mb.is_finite() && mb >= 0.0).then(|| mb.round() as u64)
}

/// `"1331 MB"`, or `"Unknown"` without a unit.
pub fn episode_size_label(size: Option<&SizeField>) -> String {
    match episode_size_mb(size) {
        Some(mb) => format!("{} MB", mb),
        None => "Unknown".to_string(),
    }
}

/// Binary-unit size: divide by 1024 while at least 1024 and a larger unit
/// exists; zero decimals from magnitude 10 up, one decimal below.
///
/// # Examples
///
/// ```
/// use dvr_console::format::humanize_bytes;
///
/// assert_eq!(humanize_bytes(900.0), "900 B");
/// assert_eq!(humanize_bytes(1536.0), "1.5 KB");
/// assert_eq!(humanize_bytes(1073741824.0), "1.0 GB");
/// ```
pub fn humanize_bytes(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if !bytes.is_finite() || bytes < 0.0 {
        return "Unknown".to_string();
    }

    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if value >= 10.0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Torrent size: byte counts are humanized, text is shown as sent.
pub fn torrent_size_label(size: Option<&SizeField>) -> String {
    match size {
        Some(SizeField::Bytes(n)) => humanize_bytes(*n),
        Some(SizeField::Text(text)) => match text.trim().parse::<f64>() {
            Ok(n) => humanize_bytes(n),
            Err(_) => text.clone(),
        },
        None => "Unknown".to_string(),
    }
}

/// Parse a torrent timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), bare dates, and unix
/// time in seconds or milliseconds, numeric or as a string.
pub fn parse_timestamp(time: &TimeField) -> Option<DateTime<Utc>> {
    match time {
        TimeField::Number(n) => from_unix(*n),
        TimeField::Text(text) => {
            let text = text.trim();
            if let Ok(n) = text.parse::<f64>() {
                return from_unix(n);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
                return Some(dt.and_utc());
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        }
    }
}

fn from_unix(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    // Anything past 1e12 cannot be seconds (year 33658).
    let millis = if n >= 1e12 { n } else { n * 1000.0 };
    DateTime::from_timestamp_millis(millis as i64)
}

/// Age of `time` relative to `now`: `"5h"` under a day, `"2d"` beyond.
///
/// Timestamps in the future count as `"0h"`.
pub fn format_age(time: Option<&TimeField>, now: DateTime<Utc>) -> String {
    let Some(then) = time.and_then(parse_timestamp) else {
        return PLACEHOLDER.to_string();
    };

    let millis = (now - then).num_milliseconds().max(0) as f64;
    let hours = (millis / 3_600_000.0).round();
    if hours < 24.0 {
        format!("{}h", hours as u64)
    } else {
        format!("{}d", (hours / 24.0).round() as u64)
    }
}

/// First 12 hex characters of the infohash in a magnet URI, plus `…`.
///
/// # Examples
///
/// ```
/// use dvr_console::format::infohash_snippet;
///
/// let magnet = "magnet:?xt=urn:btih:0123456789ABCDEF0123&dn=x";
/// assert_eq!(infohash_snippet(magnet).as_deref(), Some("0123456789AB…"));
/// assert_eq!(infohash_snippet("http://example.invalid/x.torrent"), None);
/// ```
pub fn infohash_snippet(magnet: &str) -> Option<String> {
    let caps = BTIH.captures(magnet)?;
    let hash: String = caps[1].chars().take(12).collect();
    Some(format!("{}…", hash))
}

/// Reduce an HTML fragment to its text, entities decoded and whitespace
/// collapsed.
pub fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text or the placeholder.
pub fn or_placeholder(value: Option<&str>) -> &str {
    value.filter(|s| !s.trim().is_empty()).unwrap_or(PLACEHOLDER)
}
