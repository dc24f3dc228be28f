//! Batched actions over the selected candidates.

use crate::api::Transport;
use crate::classify::CommandResult;
use crate::dispatch::{CommandDispatcher, OptionCommand};
use crate::error::{AppError, Result};
use crate::types::{AddedTorrent, BulkDownloadReport, BulkItemResult, Episode, text_field};
use log::{info, warn};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const NO_RESULT: &str = "No result reported";

/// Holds a shared "request pending" flag for as long as it lives.
///
/// Only one guard per flag can exist at a time. Dropping it, on any path
/// including unwinding, clears the flag.
#[derive(Debug)]
pub struct TriggerGuard {
    flag: Arc<AtomicBool>,
}

impl TriggerGuard {
    /// Take the flag, or `None` if a request is already pending.
    pub fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Issues the bulk episode download and the multi-option torrent add.
#[derive(Clone, Debug)]
pub struct BulkActionExecutor<T> {
    dispatcher: CommandDispatcher<T>,
}

impl<T: Transport> BulkActionExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(transport),
        }
    }

    /// Queue every episode in `episodes` with one `/bulk_download` request.
    ///
    /// The report always holds exactly one result per submitted episode.
    pub async fn run_bulk_download(&self, episodes: &[Episode]) -> Result<BulkDownloadReport> {
        if episodes.is_empty() {
            return Err(AppError::validation("No episodes selected"));
        }

        info!("Bulk downloading {} episodes", episodes.len());
        let body = json!({
            "episodes": episodes.iter().map(|e| e.to_request_json(true)).collect::<Vec<_>>()
        });
        let reply = self
            .dispatcher
            .transport()
            .post_json("/bulk_download", &body)
            .await?;

        let titles: Vec<&str> = episodes.iter().map(Episode::display_title).collect();
        let report = reconcile(&titles, &reply);
        info!(
            "Bulk download: {} queued, {} failed",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    /// Start the torrents with the given option numbers in one command.
    pub async fn run_bulk_add_torrents(&self, options: &[u32]) -> Result<CommandResult> {
        if options.is_empty() {
            return Err(AppError::validation("No torrents selected"));
        }

        info!("Adding torrent options {:?}", options);
        self.dispatcher
            .send_option(&OptionCommand::DownloadMany(options.to_vec()))
            .await
    }
}

/// Line the server's per-item results up with the submitted titles.
///
/// Missing results become failures and surplus ones are dropped. A failed
/// reply without results fails every item with the server's message.
pub fn reconcile(titles: &[&str], reply: &Value) -> BulkDownloadReport {
    let empty = serde_json::Map::new();
    let obj = reply.as_object().unwrap_or(&empty);

    let success = obj.get("success").and_then(Value::as_bool).unwrap_or(false);
    let message = text_field(obj, &["message", "error"]).unwrap_or_else(|| {
        if success {
            "Bulk download finished".to_string()
        } else {
            "Bulk download failed".to_string()
        }
    });

    let mut results: Vec<BulkItemResult> = obj
        .get("results")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(BulkItemResult::from_json).collect())
        .unwrap_or_default();

    if results.len() > titles.len() {
        warn!(
            "Server reported {} results for {} episodes",
            results.len(),
            titles.len()
        );
        results.truncate(titles.len());
    }

    let pad_message = if success || !results.is_empty() {
        NO_RESULT
    } else {
        message.as_str()
    };
    let reported = results.len();
    results.extend(
        titles[reported..]
            .iter()
            .map(|title| BulkItemResult::failed(title, pad_message)),
    );

    BulkDownloadReport {
        success,
        message,
        results,
    }
}

/// Human-readable summary of a multi-option add.
///
/// The message, then the added option numbers, then any errors joined with
/// `; `, one part per line.
pub fn bulk_add_summary(message: &str, added: &[AddedTorrent], errors: &[String]) -> String {
    let mut parts = Vec::with_capacity(3);
    if !message.trim().is_empty() {
        parts.push(message.to_string());
    }

    let options: Vec<String> = added
        .iter()
        .filter_map(|a| a.option)
        .map(|o| o.to_string())
        .collect();
    if options.is_empty() {
        parts.push("Added options: none".to_string());
    } else {
        parts.push(format!("Added options: {}", options.join(", ")));
    }

    if !errors.is_empty() {
        parts.push(format!("Errors: {}", errors.join("; ")));
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeTransport;

    fn episodes(n: usize) -> Vec<Episode> {
        (1..=n)
            .map(|i| {
                Episode::from_json(&json!({
                    "title": format!("E{}", i),
                    "magnet": format!("magnet:?xt=urn:btih:{:040x}", i),
                    "selected": false
                }))
            })
            .collect()
    }

    #[test]
    fn test_trigger_guard_is_exclusive_and_released() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = TriggerGuard::acquire(&flag).unwrap();
        assert!(flag.load(Ordering::Acquire));
        assert!(TriggerGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(TriggerGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_trigger_guard_released_on_panic() {
        let flag = Arc::new(AtomicBool::new(false));
        let inner = Arc::clone(&flag);
        let outcome = std::panic::catch_unwind(move || {
            let _guard = TriggerGuard::acquire(&inner).unwrap();
            panic!("request blew up");
        });
        assert!(outcome.is_err());
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_reconcile_passes_results_through() {
        let reply = json!({
            "success": true,
            "message": "Queued 1/2 episodes for download",
            "results": [
                {"title": "E1", "success": true, "message": "ok"},
                {"title": "E2", "success": false, "message": "No magnet link"}
            ]
        });
        let report = reconcile(&["E1", "E2"], &reply);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.results[1].message, "No magnet link");
    }

    #[test]
    fn test_reconcile_pads_and_truncates() {
        let short = json!({"success": true, "results": [{"title": "E1", "success": true}]});
        let report = reconcile(&["E1", "E2", "E3"], &short);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[2], BulkItemResult::failed("E3", NO_RESULT));

        let long = json!({"success": true, "results": [{"success": true}, {"success": true}]});
        assert_eq!(reconcile(&["E1"], &long).results.len(), 1);
    }

    #[test]
    fn test_reconcile_failure_without_results() {
        let reply = json!({"success": false, "message": "No episodes selected for download"});
        let report = reconcile(&["E1", "E2"], &reply);
        assert!(!report.success);
        assert_eq!(report.failed(), 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.message == "No episodes selected for download"));
    }

    #[test]
    fn test_bulk_add_summary_format() {
        let added = vec![
            AddedTorrent::from_json(&json!({"option": 2, "title": "a"})),
            AddedTorrent::from_json(&json!({"option": 5, "title": "b"})),
        ];
        assert_eq!(
            bulk_add_summary("Started 2 torrents", &added, &[]),
            "Started 2 torrents\nAdded options: 2, 5"
        );
        assert_eq!(
            bulk_add_summary(
                "",
                &[],
                &["Option 9 out of range".to_string(), "qBittorrent offline".to_string()]
            ),
            "Added options: none\nErrors: Option 9 out of range; qBittorrent offline"
        );
    }

    #[tokio::test]
    async fn test_bulk_download_empty_makes_no_request() {
        let transport = FakeTransport::new();
        let executor = BulkActionExecutor::new(transport.clone());

        assert!(executor.run_bulk_download(&[]).await.unwrap_err().is_validation());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_download_marks_every_item_selected() {
        let transport = FakeTransport::new().reply(json!({
            "success": true,
            "message": "Queued 2/2 episodes for download",
            "results": [{"title": "E1", "success": true}, {"title": "E2", "success": true}]
        }));
        let executor = BulkActionExecutor::new(transport.clone());

        let report = executor.run_bulk_download(&episodes(2)).await.unwrap();
        assert_eq!(report.succeeded(), 2);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].path, "/bulk_download");
        let body = sent[0].body.clone().unwrap();
        let items = body["episodes"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|e| e["selected"] == json!(true)));
    }

    #[tokio::test]
    async fn test_bulk_download_transport_failure_is_aggregate() {
        let executor = BulkActionExecutor::new(FakeTransport::new().fail("timed out"));
        let err = executor.run_bulk_download(&episodes(3)).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[tokio::test]
    async fn test_bulk_add_torrents_sends_selection_order() {
        let transport = FakeTransport::new().reply(json!({
            "result": {"status": "bulk_download_result", "added": [{"option": 7}, {"option": 2}]}
        }));
        let executor = BulkActionExecutor::new(transport.clone());

        let result = executor.run_bulk_add_torrents(&[7, 2]).await.unwrap();
        assert!(matches!(result, CommandResult::BulkDownloadResult { .. }));
        assert_eq!(
            transport.sent()[0].body,
            Some(json!({"command": "download options 7,2"}))
        );

        let err = executor.run_bulk_add_torrents(&[]).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transport.sent().len(), 1);
    }
}
