//! Display rows built from a store snapshot, and text for results.
//!
//! Both the terminal UI and the one-shot CLI draw from these; neither ever
//! touches the store directly while rendering.

use crate::bulk::bulk_add_summary;
use crate::candidates::{ActiveCandidates, CandidateList, CandidateStore};
use crate::classify::CommandResult;
use crate::format::{
    PLACEHOLDER, episode_size_label, format_age, infohash_snippet, or_placeholder,
    torrent_size_label,
};
use crate::types::{
    BulkDownloadReport, Episode, RecordCandidate, RecurringRule, ScheduledRecording,
    TorrentCandidate,
};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpisodeRow {
    pub index: usize,
    pub selected: bool,
    pub title: String,
    pub quality: String,
    pub size: String,
    pub seeders: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TorrentRow {
    pub index: usize,
    pub option: u32,
    pub selected: bool,
    pub title: String,
    pub seeders: String,
    pub leechers: String,
    pub size: String,
    pub age: String,
    pub uploader: String,
    pub category: String,
    pub infohash: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordingRow {
    pub index: usize,
    pub option: u32,
    pub selected: bool,
    pub title: String,
    pub date: String,
    pub time: String,
    pub channel: String,
    pub duration: String,
}

/// Rows for whatever collection is active.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CandidateView {
    Empty,
    Episodes(Vec<EpisodeRow>),
    Torrents(Vec<TorrentRow>),
    Recordings(Vec<RecordingRow>),
}

impl CandidateView {
    pub fn len(&self) -> usize {
        match self {
            CandidateView::Empty => 0,
            CandidateView::Episodes(rows) => rows.len(),
            CandidateView::Torrents(rows) => rows.len(),
            CandidateView::Recordings(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn count(n: Option<u64>) -> String {
    n.map(|n| n.to_string()).unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn episode_rows(list: &CandidateList<Episode>) -> Vec<EpisodeRow> {
    list.iter()
        .enumerate()
        .map(|(index, (ep, selected))| EpisodeRow {
            index,
            selected,
            title: ep.display_title().to_string(),
            quality: ep
                .quality
                .as_ref()
                .map(|q| q.to_display())
                .unwrap_or_else(|| "Unknown".to_string()),
            size: episode_size_label(ep.size.as_ref()),
            seeders: count(ep.seeders),
        })
        .collect()
}

pub fn torrent_rows(list: &CandidateList<TorrentCandidate>, now: DateTime<Utc>) -> Vec<TorrentRow> {
    list.iter()
        .enumerate()
        .map(|(index, (t, selected))| TorrentRow {
            index,
            option: t.option,
            selected,
            title: t.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            seeders: count(t.seeders),
            leechers: count(t.leechers),
            size: torrent_size_label(t.size.as_ref()),
            age: format_age(t.time.as_ref(), now),
            uploader: or_placeholder(t.uploader.as_deref()).to_string(),
            category: match (&t.category, &t.subcat) {
                (Some(cat), Some(sub)) => format!("{}/{}", cat, sub),
                (Some(cat), None) => cat.clone(),
                (None, _) => PLACEHOLDER.to_string(),
            },
            infohash: t
                .magnet
                .as_deref()
                .and_then(infohash_snippet)
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        })
        .collect()
}

pub fn recording_rows(list: &CandidateList<RecordCandidate>) -> Vec<RecordingRow> {
    list.iter()
        .enumerate()
        .map(|(index, (r, selected))| RecordingRow {
            index,
            option: r.option,
            selected,
            title: r.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            date: or_placeholder(r.date.as_deref()).to_string(),
            time: or_placeholder(r.time.as_deref()).to_string(),
            channel: or_placeholder(r.channel.as_deref()).to_string(),
            duration: or_placeholder(r.duration.as_deref()).to_string(),
        })
        .collect()
}

/// Snapshot the store into display rows.
pub fn snapshot(store: &CandidateStore, now: DateTime<Utc>) -> CandidateView {
    match store.active() {
        ActiveCandidates::Empty => CandidateView::Empty,
        ActiveCandidates::Episodes(list) => CandidateView::Episodes(episode_rows(list)),
        ActiveCandidates::Torrents(list) => CandidateView::Torrents(torrent_rows(list, now)),
        ActiveCandidates::Recordings(list) => CandidateView::Recordings(recording_rows(list)),
    }
}

fn check(selected: bool) -> &'static str {
    if selected { "[x]" } else { "[ ]" }
}

/// Plain-text table of the rows, one line per candidate.
pub fn candidate_lines(view: &CandidateView) -> Vec<String> {
    match view {
        CandidateView::Empty => Vec::new(),
        CandidateView::Episodes(rows) => rows
            .iter()
            .map(|r| {
                format!(
                    "{} {:>3}. {}  [{} | {} | {} seeders]",
                    check(r.selected),
                    r.index + 1,
                    r.title,
                    r.quality,
                    r.size,
                    r.seeders
                )
            })
            .collect(),
        CandidateView::Torrents(rows) => rows
            .iter()
            .map(|r| {
                format!(
                    "{:>3}. {}  [S:{} L:{} | {} | {} | {} | {}]",
                    r.option, r.title, r.seeders, r.leechers, r.size, r.age, r.uploader, r.infohash
                )
            })
            .collect(),
        CandidateView::Recordings(rows) => rows
            .iter()
            .map(|r| {
                format!(
                    "{:>3}. {}  [{} {} | {} | {}]",
                    r.option, r.title, r.date, r.time, r.channel, r.duration
                )
            })
            .collect(),
    }
}

/// Lines describing a classified result.
///
/// Candidate results show their message only; their rows come from
/// [`snapshot`].
pub fn result_lines(result: &CommandResult) -> Vec<String> {
    match result {
        CommandResult::EpisodeList { message, episodes } => {
            vec![non_empty(message, || format!("Found {} episodes", episodes.len()))]
        }
        CommandResult::TorrentSearch {
            message, torrents, ..
        } => vec![non_empty(message, || format!("Found {} torrents", torrents.len()))],
        CommandResult::RecordCandidates {
            message,
            candidates,
        } => vec![non_empty(message, || {
            format!("Found {} recording options", candidates.len())
        })],
        CommandResult::DownloadStarted { message, .. }
        | CommandResult::RecordScheduled { message }
        | CommandResult::RecurringRuleCreated { message } => {
            vec![non_empty(message, || result.kind().replace('_', " "))]
        }
        CommandResult::BulkDownloadResult {
            message,
            added,
            errors,
        } => bulk_add_summary(message, added, errors)
            .lines()
            .map(str::to_string)
            .collect(),
        CommandResult::Failed { error } => vec![format!("Error: {}", error)],
        CommandResult::Plain { message, raw } => match message {
            Some(message) => vec![message.clone()],
            None => serde_json::to_string_pretty(raw)
                .unwrap_or_else(|_| raw.to_string())
                .lines()
                .map(str::to_string)
                .collect(),
        },
    }
}

fn non_empty(message: &str, fallback: impl FnOnce() -> String) -> String {
    if message.trim().is_empty() {
        fallback()
    } else {
        message.to_string()
    }
}

/// Per-item lines of a bulk episode download.
pub fn bulk_report_lines(report: &BulkDownloadReport) -> Vec<String> {
    let mut lines = vec![report.message.clone()];
    lines.extend(report.results.iter().map(|r| {
        let icon = if r.success { "✓" } else { "✗" };
        if r.message.is_empty() {
            format!("{} {}", icon, r.title)
        } else {
            format!("{} {}: {}", icon, r.title, r.message)
        }
    }));
    lines
}

/// One line per recurring rule.
pub fn rule_lines(rules: &[RecurringRule]) -> Vec<String> {
    if rules.is_empty() {
        return vec!["No recurring rules".to_string()];
    }
    rules
        .iter()
        .map(|r| {
            let days = if r.days.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                r.days.join(",")
            };
            format!(
                "#{} {}  [{} | {} {} | {}]",
                r.id.as_ref().map_or_else(|| "?".to_string(), |id| id.to_string()),
                r.title.as_deref().unwrap_or("Unknown"),
                or_placeholder(r.channel.as_deref()),
                days,
                or_placeholder(r.time.as_deref()),
                or_placeholder(r.status.as_deref())
            )
        })
        .collect()
}

/// One line per scheduled or finished recording.
pub fn recording_list_lines(items: &[ScheduledRecording]) -> Vec<String> {
    if items.is_empty() {
        return vec!["No recordings".to_string()];
    }
    items
        .iter()
        .map(|r| {
            format!(
                "{}  [{} {} | {} | {}]",
                r.title.as_deref().unwrap_or("Unknown"),
                or_placeholder(r.date.as_deref()),
                or_placeholder(r.time.as_deref()),
                or_placeholder(r.channel.as_deref()),
                r.status.as_deref().unwrap_or("scheduled")
            )
        })
        .collect()
}
