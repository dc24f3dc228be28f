//! Classification of interpreter replies.
//!
//! The interpreter answers every command with loosely shaped JSON. It is
//! decoded exactly once, here, into [`CommandResult`]; everything downstream
//! matches on the enum.

use crate::types::{AddedTorrent, Episode, RecordCandidate, TorrentCandidate, text_field};
use log::debug;
use serde_json::{Map, Value};

/// A classified interpreter reply.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandResult {
    /// Per-episode torrents for a season, each selectable for bulk download.
    EpisodeList {
        message: String,
        episodes: Vec<Episode>,
    },
    /// Torrent search hits, picked by option number.
    TorrentSearch {
        message: String,
        query: Option<String>,
        torrents: Vec<TorrentCandidate>,
    },
    /// Broadcast slots, recorded once or as a recurring rule by option number.
    RecordCandidates {
        message: String,
        candidates: Vec<RecordCandidate>,
    },
    DownloadStarted {
        message: String,
        option: Option<u32>,
    },
    BulkDownloadResult {
        message: String,
        added: Vec<AddedTorrent>,
        errors: Vec<String>,
    },
    RecordScheduled {
        message: String,
    },
    RecurringRuleCreated {
        message: String,
    },
    /// A well-formed error payload (`{"error": "..."}`).
    Failed {
        error: String,
    },
    /// Anything unrecognised; shown as its message or as raw JSON.
    Plain {
        message: Option<String>,
        raw: Value,
    },
}

impl CommandResult {
    /// Whether this reply carries a candidate collection.
    pub fn has_candidates(&self) -> bool {
        matches!(
            self,
            CommandResult::EpisodeList { .. }
                | CommandResult::TorrentSearch { .. }
                | CommandResult::RecordCandidates { .. }
        )
    }

    /// Short label for logs and the header.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandResult::EpisodeList { .. } => "episode_list",
            CommandResult::TorrentSearch { .. } => "search_results",
            CommandResult::RecordCandidates { .. } => "record_candidates",
            CommandResult::DownloadStarted { .. } => "download_started",
            CommandResult::BulkDownloadResult { .. } => "bulk_download_result",
            CommandResult::RecordScheduled { .. } => "record_scheduled",
            CommandResult::RecurringRuleCreated { .. } => "recurring_rule_created",
            CommandResult::Failed { .. } => "error",
            CommandResult::Plain { .. } => "plain",
        }
    }
}

fn message_of(obj: &Map<String, Value>) -> String {
    text_field(obj, &["message"]).unwrap_or_default()
}

fn array_of<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    obj.get(key).and_then(Value::as_array)
}

/// Classify a `/nlp_command` response body.
///
/// The envelope is `{parsed, result}`; the `result` member is classified
/// when present, the whole body otherwise (top-level `{"error": ...}`
/// replies).
pub fn classify_response(body: &Value) -> CommandResult {
    match body.get("result") {
        Some(result) if !result.is_null() => classify(result),
        _ => classify(body),
    }
}

/// Classify one command result.
///
/// Checks run in a fixed order and the first match wins: an episode array,
/// then torrent search hits, then record candidates, then the confirmation
/// statuses, then an error string. Never fails; unknown shapes become
/// [`CommandResult::Plain`].
pub fn classify(value: &Value) -> CommandResult {
    let Some(obj) = value.as_object() else {
        return CommandResult::Plain {
            message: value.as_str().map(str::to_string),
            raw: value.clone(),
        };
    };

    let status = obj.get("status").and_then(Value::as_str).unwrap_or("");

    if let Some(episodes) = array_of(obj, "episodes").filter(|a| !a.is_empty()) {
        debug!("Classified reply as episode list ({} items)", episodes.len());
        return CommandResult::EpisodeList {
            message: message_of(obj),
            episodes: episodes.iter().map(Episode::from_json).collect(),
        };
    }

    if status == "search_results" {
        if let Some(torrents) = array_of(obj, "torrents") {
            debug!("Classified reply as torrent search ({} items)", torrents.len());
            return CommandResult::TorrentSearch {
                message: message_of(obj),
                query: text_field(obj, &["query"]),
                torrents: torrents
                    .iter()
                    .enumerate()
                    .map(|(i, t)| TorrentCandidate::from_json(t, i))
                    .collect(),
            };
        }
    }

    if status == "record_candidates" {
        let candidates = array_of(obj, "candidates")
            .map(|c| {
                c.iter()
                    .enumerate()
                    .map(|(i, r)| RecordCandidate::from_json(r, i))
                    .collect()
            })
            .unwrap_or_default();
        return CommandResult::RecordCandidates {
            message: message_of(obj),
            candidates,
        };
    }

    match status {
        "download_started" => {
            return CommandResult::DownloadStarted {
                message: message_of(obj),
                option: crate::types::count_field(obj, &["selected_index"])
                    .and_then(|n| u32::try_from(n).ok()),
            };
        }
        "bulk_download_result" => {
            return CommandResult::BulkDownloadResult {
                message: message_of(obj),
                added: array_of(obj, "added")
                    .map(|a| a.iter().map(AddedTorrent::from_json).collect())
                    .unwrap_or_default(),
                errors: array_of(obj, "errors")
                    .map(|e| {
                        e.iter()
                            .map(|v| match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            };
        }
        "record_scheduled" => {
            return CommandResult::RecordScheduled {
                message: message_of(obj),
            };
        }
        "recurring_rule_created" => {
            return CommandResult::RecurringRuleCreated {
                message: message_of(obj),
            };
        }
        _ => {}
    }

    if let Some(error) = text_field(obj, &["error"]) {
        return CommandResult::Failed { error };
    }

    CommandResult::Plain {
        message: text_field(obj, &["message"]),
        raw: value.clone(),
    }
}
