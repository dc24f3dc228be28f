//! Type definitions for the dvr-console application.
//!
//! This module contains the candidate items the interpreter offers (episodes,
//! torrents, recording slots), bulk-action results, and the request bodies of
//! the recording endpoints.
//!
//! Candidate items are decoded by hand from `serde_json::Value` rather than
//! derived: upstream payloads are loosely shaped, and a missing or mistyped
//! field must turn into `None` instead of failing the whole response.

use crate::error::{AppError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// First present key among `keys`, as display text.
///
/// Strings are taken verbatim (empty ones count as absent), numbers and
/// booleans are stringified.
pub(crate) fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// First present key among `keys`, as a non-negative count.
///
/// Accepts JSON numbers and numeric strings.
pub(crate) fn count_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

fn option_field(obj: &Map<String, Value>, position: usize) -> u32 {
    count_field(obj, &["option"])
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(position as u32 + 1)
}

/// Video quality hint attached to an episode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Quality {
    P1080,
    P720,
    Other(String),
}

impl Quality {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "1080p" | "1080" => Quality::P1080,
            "720p" | "720" => Quality::P720,
            _ => Quality::Other(s.trim().to_string()),
        }
    }

    /// Format the quality for display.
    ///
    /// # Examples
    ///
    /// ```
    /// use dvr_console::types::Quality;
    ///
    /// assert_eq!(Quality::parse("1080p").to_display(), "1080p");
    /// assert_eq!(Quality::parse("2160p").to_display(), "2160p");
    /// assert_eq!(Quality::parse("unknown").to_display(), "unknown");
    /// ```
    pub fn to_display(&self) -> String {
        match self {
            Quality::P1080 => "1080p".to_string(),
            Quality::P720 => "720p".to_string(),
            Quality::Other(s) => s.clone(),
        }
    }
}

/// A size as the server sent it: either text ("1.3 GB") or a byte count.
#[derive(Clone, Debug, PartialEq)]
pub enum SizeField {
    Text(String),
    Bytes(f64),
}

impl SizeField {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(SizeField::Bytes),
            Value::String(s) if !s.trim().is_empty() => Some(SizeField::Text(s.clone())),
            _ => None,
        }
    }
}

/// A moment in time as the server sent it.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeField {
    Text(String),
    Number(f64),
}

impl TimeField {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(TimeField::Number),
            Value::String(s) if !s.trim().is_empty() => Some(TimeField::Text(s.clone())),
            _ => None,
        }
    }
}

/// One episode torrent offered for a season.
///
/// The upstream object is kept whole so a bulk request can echo back every
/// field the server attached (magnet, raw title, pack flags).
#[derive(Clone, Debug, PartialEq)]
pub struct Episode {
    pub title: Option<String>,
    pub name: Option<String>,
    pub quality: Option<Quality>,
    pub size: Option<SizeField>,
    pub seeders: Option<u64>,
    pub magnet: Option<String>,
    /// Selection flag as sent by the server
    pub selected: bool,
    raw: Map<String, Value>,
}

impl Episode {
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            title: text_field(obj, &["title"]),
            name: text_field(obj, &["name"]),
            quality: text_field(obj, &["quality"]).map(|q| Quality::parse(&q)),
            size: obj.get("size").and_then(SizeField::from_json),
            seeders: count_field(obj, &["seeders", "seeds"]),
            magnet: text_field(obj, &["magnet"]),
            selected: obj.get("selected").and_then(Value::as_bool).unwrap_or(false),
            raw: obj.clone(),
        }
    }

    /// Title shown in lists.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }

    /// The upstream object with `selected` overwritten, as `/bulk_download`
    /// expects it.
    pub fn to_request_json(&self, selected: bool) -> Value {
        let mut obj = self.raw.clone();
        obj.insert("selected".to_string(), Value::Bool(selected));
        if !obj.contains_key("title") {
            obj.insert(
                "title".to_string(),
                Value::String(self.display_title().to_string()),
            );
        }
        Value::Object(obj)
    }
}

/// One torrent search hit.
#[derive(Clone, Debug, PartialEq)]
pub struct TorrentCandidate {
    /// 1-based number used in follow-up commands
    pub option: u32,
    pub title: Option<String>,
    pub seeders: Option<u64>,
    pub leechers: Option<u64>,
    pub size: Option<SizeField>,
    pub uploader: Option<String>,
    pub category: Option<String>,
    pub subcat: Option<String>,
    pub magnet: Option<String>,
    pub time: Option<TimeField>,
}

impl TorrentCandidate {
    /// Decode the item at `position` (0-based) of a torrent list.
    pub fn from_json(value: &Value, position: usize) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            option: option_field(obj, position),
            title: text_field(obj, &["title"]),
            seeders: count_field(obj, &["seeders", "seeds"]),
            leechers: count_field(obj, &["leechers", "leeches"]),
            size: ["size", "size_bytes"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(SizeField::from_json)),
            uploader: text_field(obj, &["uploader"]),
            category: text_field(obj, &["category"]),
            subcat: text_field(obj, &["subcat"]),
            magnet: text_field(obj, &["magnet"]),
            time: ["time", "publish_date", "added"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(TimeField::from_json)),
        }
    }
}

/// One broadcast slot the DVR could record.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordCandidate {
    pub option: u32,
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub channel: Option<String>,
    pub duration: Option<String>,
}

impl RecordCandidate {
    pub fn from_json(value: &Value, position: usize) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            option: option_field(obj, position),
            title: text_field(obj, &["title"]),
            date: text_field(obj, &["date"]),
            time: text_field(obj, &["time"]),
            channel: text_field(obj, &["channel"]),
            duration: text_field(obj, &["duration"]),
        }
    }
}

/// Identifier of a recurring rule, echoed back exactly as the server sent it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RuleId {
    Number(u64),
    Text(String),
}

impl RuleId {
    /// Numeric ids are sent as JSON numbers, anything else as a string.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AppError::validation("Rule ID required"));
        }
        Ok(match s.parse::<u64>() {
            Ok(n) => RuleId::Number(n),
            Err(_) => RuleId::Text(s.to_string()),
        })
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(RuleId::Number),
            Value::String(s) if !s.trim().is_empty() => Some(RuleId::Text(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleId::Number(n) => write!(f, "{}", n),
            RuleId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A weekly recording rule from `/recurring_status`.
#[derive(Clone, Debug, PartialEq)]
pub struct RecurringRule {
    pub id: Option<RuleId>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub time: Option<String>,
    pub days: Vec<String>,
    pub last_started_at: Option<String>,
    pub status: Option<String>,
}

impl RecurringRule {
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            id: obj.get("id").and_then(RuleId::from_json),
            title: text_field(obj, &["title"]),
            channel: text_field(obj, &["channel_number", "channel"]),
            time: text_field(obj, &["time"]),
            days: obj
                .get("days")
                .and_then(Value::as_array)
                .map(|days| days.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            last_started_at: text_field(obj, &["last_started_at"]),
            status: text_field(obj, &["status"]),
        }
    }
}

/// One entry of `/recent_recordings`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledRecording {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub status: Option<String>,
    pub scheduled_at: Option<String>,
}

impl ScheduledRecording {
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            id: count_field(obj, &["id"]),
            title: text_field(obj, &["title"]),
            channel: text_field(obj, &["channel", "channel_number"]),
            date: text_field(obj, &["date"]),
            time: text_field(obj, &["time"]),
            status: text_field(obj, &["status"]),
            scheduled_at: text_field(obj, &["scheduled_at"]),
        }
    }
}

/// Outcome for one item of a bulk episode download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BulkItemResult {
    pub title: String,
    pub success: bool,
    pub message: String,
}

impl BulkItemResult {
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            title: text_field(obj, &["title"]).unwrap_or_else(|| "Unknown Episode".to_string()),
            success: obj.get("success").and_then(Value::as_bool).unwrap_or(false),
            message: text_field(obj, &["message"]).unwrap_or_default(),
        }
    }

    pub fn failed(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            success: false,
            message: message.to_string(),
        }
    }
}

/// Aggregate answer of `/bulk_download`, reconciled to the submitted items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkDownloadReport {
    pub success: bool,
    pub message: String,
    pub results: Vec<BulkItemResult>,
}

impl BulkDownloadReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// One torrent the interpreter started from a multi-option command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedTorrent {
    pub option: Option<u32>,
    pub title: Option<String>,
    pub seeds: Option<u64>,
}

impl AddedTorrent {
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            option: count_field(obj, &["option"]).and_then(|n| u32::try_from(n).ok()),
            title: text_field(obj, &["title"]),
            seeds: count_field(obj, &["seeds", "seeders"]),
        }
    }
}

/// Weekday names the scheduler accepts.
pub const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Body of `/record_now`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ManualRecording {
    pub channel: String,
    /// Minutes
    pub duration: u32,
    pub format: String,
    pub crf: u8,
    pub preset: String,
}

impl ManualRecording {
    pub fn validate(&self) -> Result<()> {
        if self.channel.trim().is_empty() {
            return Err(AppError::validation("Channel is required"));
        }
        if self.duration == 0 {
            return Err(AppError::validation("Duration must be at least 1 minute"));
        }
        if self.crf > 51 {
            return Err(AppError::validation("CRF must be between 0 and 51"));
        }
        if self.format.trim().is_empty() || self.preset.trim().is_empty() {
            return Err(AppError::validation("Format and preset are required"));
        }
        Ok(())
    }
}

/// Body of `/schedule`: a recording repeated on weekdays at a time of day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduleRequest {
    #[serde(flatten)]
    pub recording: ManualRecording,
    /// "HH:MM"
    pub time: String,
    pub days: Vec<String>,
}

impl ScheduleRequest {
    /// Validate the request, normalising weekday names to `Mon`..`Sun`.
    pub fn validate(mut self) -> Result<Self> {
        self.recording.validate()?;

        if !is_clock_time(&self.time) {
            return Err(AppError::validation(format!(
                "Invalid time '{}'. Use HH:MM",
                self.time
            )));
        }
        if self.days.is_empty() {
            return Err(AppError::validation("No days selected"));
        }

        let mut days = Vec::with_capacity(self.days.len());
        for day in &self.days {
            let prefix: String = day.trim().chars().take(3).collect();
            match WEEKDAYS.iter().find(|w| w.eq_ignore_ascii_case(&prefix)) {
                Some(w) if day.trim().len() >= 3 => days.push(w.to_string()),
                _ => return Err(AppError::validation(format!("Unknown day '{}'", day))),
            }
        }
        self.days = days;
        Ok(self)
    }
}

fn is_clock_time(s: &str) -> bool {
    let Some((h, m)) = s.split_once(':') else {
        return false;
    };
    let valid = |part: &str, max: u32| {
        (1..=2).contains(&part.len())
            && part.chars().all(|c| c.is_ascii_digit())
            && part.parse::<u32>().map(|n| n <= max).unwrap_or(false)
    };
    valid(h, 23) && m.len() == 2 && valid(m, 59)
}

/// Check a wake-on-LAN MAC address (`xx:xx:xx:xx:xx:xx`, hex pairs).
///
/// # Examples
///
/// ```
/// use dvr_console::types::validate_mac;
///
/// assert!(validate_mac("00:11:22:aa:BB:cc").is_ok());
/// assert!(validate_mac("00-11-22-33-44-55").is_err());
/// ```
pub fn validate_mac(mac: &str) -> Result<()> {
    let parts: Vec<&str> = mac.trim().split(':').collect();
    let valid = parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()));

    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Invalid MAC address '{}'. Use format xx:xx:xx:xx:xx:xx",
            mac
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_episode_from_full_object() {
        let ep = Episode::from_json(&json!({
            "title": "Show - Season 1 Episode 2",
            "name": "Show S01E02",
            "quality": "1080p",
            "size": "1.3 GB",
            "seeders": 42,
            "magnet": "magnet:?xt=urn:btih:abc",
            "selected": true,
            "raw_title": "Show.S01E02.1080p"
        }));
        assert_eq!(ep.display_title(), "Show - Season 1 Episode 2");
        assert_eq!(ep.quality, Some(Quality::P1080));
        assert_eq!(ep.size, Some(SizeField::Text("1.3 GB".to_string())));
        assert_eq!(ep.seeders, Some(42));
        assert!(ep.selected);
    }

    #[test]
    fn test_episode_from_garbage_does_not_panic() {
        let ep = Episode::from_json(&json!("not an object"));
        assert_eq!(ep.display_title(), "Unknown");
        assert!(ep.size.is_none());
        assert!(!ep.selected);

        let ep = Episode::from_json(&json!({"seeders": "lots", "size": null}));
        assert!(ep.seeders.is_none());
        assert!(ep.size.is_none());
    }

    #[test]
    fn test_episode_request_json_keeps_extra_fields() {
        let ep = Episode::from_json(&json!({
            "title": "Pack",
            "season_pack": true,
            "magnet": "magnet:?xt=urn:btih:ff",
            "selected": false
        }));
        let body = ep.to_request_json(true);
        assert_eq!(body["selected"], json!(true));
        assert_eq!(body["season_pack"], json!(true));
        assert_eq!(body["magnet"], json!("magnet:?xt=urn:btih:ff"));
    }

    #[test]
    fn test_torrent_aliases_and_default_option() {
        let t = TorrentCandidate::from_json(
            &json!({"title": "x", "seeds": "12", "leeches": 3, "size_bytes": 2048}),
            4,
        );
        assert_eq!(t.option, 5);
        assert_eq!(t.seeders, Some(12));
        assert_eq!(t.leechers, Some(3));
        assert_eq!(t.size, Some(SizeField::Bytes(2048.0)));
    }

    #[test]
    fn test_record_candidate_stringifies_numbers() {
        let r = RecordCandidate::from_json(
            &json!({"option": 2, "title": "News", "duration": 30, "channel": "KGW (8.1)"}),
            0,
        );
        assert_eq!(r.option, 2);
        assert_eq!(r.duration.as_deref(), Some("30"));
        assert!(r.date.is_none());
    }

    #[test]
    fn test_rule_id_keeps_server_shape() {
        assert_eq!(RuleId::parse("7").unwrap(), RuleId::Number(7));
        assert_eq!(RuleId::parse(" rule-a ").unwrap(), RuleId::Text("rule-a".to_string()));
        assert!(RuleId::parse("  ").unwrap_err().is_validation());

        assert_eq!(serde_json::to_value(RuleId::Number(7)).unwrap(), json!(7));
        assert_eq!(serde_json::to_value(RuleId::Text("x".into())).unwrap(), json!("x"));
    }

    #[test]
    fn test_recurring_rule_from_status_entry() {
        let rule = RecurringRule::from_json(&json!({
            "id": 3,
            "title": "Jeopardy!",
            "channel_number": "8.1",
            "time": "19:00",
            "days": ["Mon", "Tue"],
            "last_started_at": null,
            "status": "active"
        }));
        assert_eq!(rule.id, Some(RuleId::Number(3)));
        assert_eq!(rule.channel.as_deref(), Some("8.1"));
        assert_eq!(rule.days, vec!["Mon".to_string(), "Tue".to_string()]);
        assert!(rule.last_started_at.is_none());

        let bare = RecurringRule::from_json(&json!({"days": null}));
        assert!(bare.id.is_none());
        assert!(bare.days.is_empty());
    }

    #[test]
    fn test_bulk_item_result_defaults() {
        let r = BulkItemResult::from_json(&json!({"success": true}));
        assert_eq!(r.title, "Unknown Episode");
        assert!(r.success);
        assert_eq!(r.message, "");
    }

    #[test]
    fn test_manual_recording_validation() {
        let mut rec = ManualRecording {
            channel: "8.1".to_string(),
            duration: 30,
            format: "mp4".to_string(),
            crf: 23,
            preset: "fast".to_string(),
        };
        assert!(rec.validate().is_ok());

        rec.crf = 60;
        assert!(rec.validate().unwrap_err().is_validation());

        rec.crf = 23;
        rec.channel = " ".to_string();
        assert!(rec.validate().is_err());
    }

    #[test]
    fn test_schedule_request_normalises_days() {
        let req = ScheduleRequest {
            recording: ManualRecording {
                channel: "8.1".to_string(),
                duration: 60,
                format: "mp4".to_string(),
                crf: 23,
                preset: "fast".to_string(),
            },
            time: "19:30".to_string(),
            days: vec!["monday".to_string(), "FRI".to_string()],
        };
        let req = req.validate().unwrap();
        assert_eq!(req.days, vec!["Mon".to_string(), "Fri".to_string()]);

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["channel"], json!("8.1"));
        assert_eq!(body["time"], json!("19:30"));
    }

    #[test]
    fn test_schedule_request_rejects_bad_input() {
        let base = ScheduleRequest {
            recording: ManualRecording {
                channel: "8.1".to_string(),
                duration: 60,
                format: "mp4".to_string(),
                crf: 23,
                preset: "fast".to_string(),
            },
            time: "25:00".to_string(),
            days: vec!["Mon".to_string()],
        };
        assert!(base.clone().validate().is_err());

        let no_days = ScheduleRequest {
            time: "07:00".to_string(),
            days: vec![],
            ..base.clone()
        };
        assert!(no_days.validate().is_err());

        let bad_day = ScheduleRequest {
            time: "07:00".to_string(),
            days: vec!["Funday".to_string()],
            ..base
        };
        assert!(bad_day.validate().is_err());
    }

    #[test]
    fn test_validate_mac() {
        assert!(validate_mac("00:11:22:33:44:55").is_ok());
        assert!(validate_mac("00:11:22:33:44").is_err());
        assert!(validate_mac("00:11:22:33:44:5g").is_err());
        assert!(validate_mac("").is_err());
    }
}
