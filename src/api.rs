//! HTTP access to the DVR server.
//!
//! [`Transport`] is the seam every network call goes through; the console
//! uses [`HttpTransport`] and tests substitute an in-memory double.
//! [`ConsoleApi`] wraps the auxiliary endpoints (wake-on-LAN, manual
//! recording, schedules and their cancellation, progress, auto-categorize).

use crate::error::{AppError, Result};
use crate::format::strip_markup;
use crate::types::{
    ManualRecording, RecurringRule, RuleId, ScheduleRequest, ScheduledRecording, text_field,
    validate_mac,
};
use log::{debug, info};
use serde_json::{Value, json};
use std::future::Future;

/// JSON request/response exchange with the server.
///
/// Implementations return the decoded body for any HTTP status that carries
/// JSON; the server reports most failures as JSON payloads. Only network
/// failures and unreadable bodies are errors.
pub trait Transport: Send + Sync {
    fn post_json(&self, path: &str, body: &Value) -> impl Future<Output = Result<Value>> + Send;

    fn get_json(&self, path: &str) -> impl Future<Output = Result<Value>> + Send;
}

/// [`Transport`] over `reqwest`.
///
/// No timeout and no retries: every failure ends that user action.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dvr-console/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

async fn read_json(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let text = resp.text().await?;
    debug!("HTTP {} ({} bytes)", status, text.len());

    serde_json::from_str(&text).map_err(|e| {
        AppError::Transport(format!(
            "server answered {} with an unreadable body ({})",
            status, e
        ))
    })
}

impl Transport for HttpTransport {
    fn post_json(&self, path: &str, body: &Value) -> impl Future<Output = Result<Value>> + Send {
        let url = self.url(path);
        debug!("POST {}", url);
        let request = self.client.post(url).json(body);
        async move { read_json(request.send().await?).await }
    }

    fn get_json(&self, path: &str) -> impl Future<Output = Result<Value>> + Send {
        let url = self.url(path);
        debug!("GET {}", url);
        let request = self.client.get(url);
        async move { read_json(request.send().await?).await }
    }
}

/// Human-readable text of a reply: `message`, then `error`, then the raw JSON.
pub fn reply_message(reply: &Value) -> String {
    reply
        .as_object()
        .and_then(|obj| text_field(obj, &["message", "error"]))
        .unwrap_or_else(|| reply.to_string())
}

/// The array under `key`, or a transport error naming what came back.
fn list_of<'a>(reply: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    match reply.get(key) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(AppError::Transport(format!(
            "unexpected reply: {}",
            reply_message(reply)
        ))),
    }
}

/// Answer of `/auto_categorize`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategorizeOutcome {
    pub success: bool,
    pub message: String,
    pub count: Option<u64>,
}

/// The server's non-interpreter endpoints.
#[derive(Clone, Debug)]
pub struct ConsoleApi<T> {
    transport: T,
}

impl<T: Transport> ConsoleApi<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send a wake-on-LAN packet through the server.
    pub async fn wake(&self, mac: &str) -> Result<String> {
        validate_mac(mac)?;
        info!("Waking {}", mac);
        let reply = self
            .transport
            .post_json("/wol", &json!({ "mac": mac.trim() }))
            .await?;
        Ok(reply_message(&reply))
    }

    /// Start recording a channel now.
    pub async fn record_now(&self, recording: &ManualRecording) -> Result<String> {
        recording.validate()?;
        info!(
            "Recording channel {} for {} min",
            recording.channel, recording.duration
        );
        let body = serde_json::to_value(recording)?;
        let reply = self.transport.post_json("/record_now", &body).await?;
        Ok(reply_message(&reply))
    }

    pub async fn stop_recording(&self) -> Result<String> {
        let reply = self.transport.post_json("/stop_recording", &json!({})).await?;
        Ok(reply_message(&reply))
    }

    /// Create a weekly recording schedule.
    pub async fn schedule(&self, request: ScheduleRequest) -> Result<String> {
        let request = request.validate()?;
        info!(
            "Scheduling channel {} at {} on {}",
            request.recording.channel,
            request.time,
            request.days.join(",")
        );
        let body = serde_json::to_value(&request)?;
        let reply = self.transport.post_json("/schedule", &body).await?;
        Ok(reply_message(&reply))
    }

    /// Weekly recording rules known to the server.
    pub async fn recurring_rules(&self) -> Result<Vec<RecurringRule>> {
        let reply = self.transport.get_json("/recurring_status").await?;
        let rules = list_of(&reply, "rules")?;
        debug!("Server reports {} recurring rules", rules.len());
        Ok(rules.iter().map(RecurringRule::from_json).collect())
    }

    /// Most recent individual recordings, newest first.
    pub async fn recent_recordings(&self) -> Result<Vec<ScheduledRecording>> {
        let reply = self.transport.get_json("/recent_recordings").await?;
        let items = list_of(&reply, "items")?;
        Ok(items.iter().map(ScheduledRecording::from_json).collect())
    }

    /// Remove the entry at `index` (0-based) of the server's schedule.
    pub async fn cancel_recording(&self, index: usize) -> Result<String> {
        info!("Cancelling scheduled recording #{}", index);
        let reply = self
            .transport
            .post_json("/cancel", &json!({ "idx": index }))
            .await?;
        Ok(reply_message(&reply))
    }

    /// Remove a recurring rule and the standalone episodes scheduled from it.
    pub async fn cancel_recurring(&self, rule: &RuleId) -> Result<String> {
        info!("Cancelling recurring rule {}", rule);
        let reply = self
            .transport
            .post_json("/cancel_recurring", &json!({ "rule_id": rule }))
            .await?;
        Ok(reply_message(&reply))
    }

    /// Skip only the next upcoming episode of a recurring rule.
    pub async fn cancel_next_episode(&self, rule: &RuleId) -> Result<String> {
        info!("Skipping next episode of rule {}", rule);
        let reply = self
            .transport
            .post_json("/cancel_next_episode", &json!({ "rule_id": rule }))
            .await?;
        Ok(reply_message(&reply))
    }

    /// Recording progress as plain text.
    pub async fn progress(&self) -> Result<String> {
        let reply = self.transport.get_json("/progress").await?;
        match reply.get("html").and_then(Value::as_str) {
            Some(html) => Ok(strip_markup(html)),
            None => Ok(reply_message(&reply)),
        }
    }

    pub async fn auto_categorize(&self) -> Result<CategorizeOutcome> {
        let reply = self.transport.post_json("/auto_categorize", &json!({})).await?;
        let obj = reply.as_object();
        Ok(CategorizeOutcome {
            success: reply
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            message: reply_message(&reply),
            count: obj.and_then(|o| crate::types::count_field(o, &["count"])),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`Transport`] double shared by the unit tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug, PartialEq)]
    pub struct Sent {
        pub method: &'static str,
        pub path: String,
        pub body: Option<Value>,
    }

    /// Replies are handed out in order; requests are recorded.
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        replies: Arc<Mutex<VecDeque<Result<Value>>>>,
        sent: Arc<Mutex<Vec<Sent>>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, value: Value) -> Self {
            self.replies.lock().unwrap().push_back(Ok(value));
            self
        }

        pub fn fail(self, msg: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(AppError::Transport(msg.to_string())));
            self
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn next(&self, sent: Sent) -> Result<Value> {
            self.sent.lock().unwrap().push(sent);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Transport("no reply queued".to_string())))
        }
    }

    impl Transport for FakeTransport {
        fn post_json(
            &self,
            path: &str,
            body: &Value,
        ) -> impl Future<Output = Result<Value>> + Send {
            let result = self.next(Sent {
                method: "POST",
                path: path.to_string(),
                body: Some(body.clone()),
            });
            async move { result }
        }

        fn get_json(&self, path: &str) -> impl Future<Output = Result<Value>> + Send {
            let result = self.next(Sent {
                method: "GET",
                path: path.to_string(),
                body: None,
            });
            async move { result }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeTransport;
    use super::*;

    fn recording() -> ManualRecording {
        ManualRecording {
            channel: "8.1".to_string(),
            duration: 30,
            format: "mp4".to_string(),
            crf: 23,
            preset: "fast".to_string(),
        }
    }

    #[test]
    fn test_reply_message_fallbacks() {
        assert_eq!(reply_message(&json!({"message": "Stop signal sent."})), "Stop signal sent.");
        assert_eq!(reply_message(&json!({"error": "nope"})), "nope");
        assert_eq!(reply_message(&json!({"ok": true})), r#"{"ok":true}"#);
    }

    #[test]
    fn test_http_transport_trims_base_url() {
        let transport = HttpTransport::new("http://dvr.lan:5000/").unwrap();
        assert_eq!(transport.base_url(), "http://dvr.lan:5000");
        assert_eq!(transport.url("/progress"), "http://dvr.lan:5000/progress");
    }

    #[tokio::test]
    async fn test_wake_validates_before_sending() {
        let transport = FakeTransport::new();
        let api = ConsoleApi::new(transport.clone());

        let err = api.wake("not-a-mac").await.unwrap_err();
        assert!(err.is_validation());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_wake_posts_mac() {
        let transport = FakeTransport::new().reply(json!({"message": "Magic packet sent"}));
        let api = ConsoleApi::new(transport.clone());

        let msg = api.wake("00:11:22:33:44:55").await.unwrap();
        assert_eq!(msg, "Magic packet sent");
        let sent = transport.sent();
        assert_eq!(sent[0].path, "/wol");
        assert_eq!(sent[0].body, Some(json!({"mac": "00:11:22:33:44:55"})));
    }

    #[tokio::test]
    async fn test_record_now_body() {
        let transport = FakeTransport::new().reply(json!({"message": "Recording 8.1 started."}));
        let api = ConsoleApi::new(transport.clone());

        assert_eq!(api.record_now(&recording()).await.unwrap(), "Recording 8.1 started.");
        let body = transport.sent()[0].body.clone().unwrap();
        assert_eq!(
            body,
            json!({"channel": "8.1", "duration": 30, "format": "mp4", "crf": 23, "preset": "fast"})
        );
    }

    #[tokio::test]
    async fn test_schedule_sends_normalised_days() {
        let transport = FakeTransport::new().reply(json!({"message": "Scheduled"}));
        let api = ConsoleApi::new(transport.clone());

        let request = ScheduleRequest {
            recording: recording(),
            time: "20:00".to_string(),
            days: vec!["tuesday".to_string()],
        };
        api.schedule(request).await.unwrap();
        let body = transport.sent()[0].body.clone().unwrap();
        assert_eq!(body["days"], json!(["Tue"]));
        assert_eq!(body["time"], json!("20:00"));
    }

    #[tokio::test]
    async fn test_progress_strips_html() {
        let transport = FakeTransport::new()
            .reply(json!({"html": "<div class='alert alert-secondary'>No active recording</div>"}));
        let api = ConsoleApi::new(transport.clone());

        assert_eq!(api.progress().await.unwrap(), "No active recording");
        assert_eq!(transport.sent()[0].method, "GET");
    }

    #[tokio::test]
    async fn test_auto_categorize_outcome() {
        let transport = FakeTransport::new().reply(json!({
            "success": true,
            "message": "Auto-categorized 4 torrents",
            "count": 4
        }));
        let api = ConsoleApi::new(transport);

        let outcome = api.auto_categorize().await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.count, Some(4));
        assert_eq!(outcome.message, "Auto-categorized 4 torrents");
    }

    #[tokio::test]
    async fn test_recurring_rules_listing() {
        let transport = FakeTransport::new().reply(json!({
            "count": 2,
            "rules": [
                {"id": 1, "title": "Jeopardy!", "channel_number": "8.1", "time": "19:00", "days": ["Mon"]},
                {"id": "7", "title": "News", "days": []}
            ]
        }));
        let api = ConsoleApi::new(transport.clone());

        let rules = api.recurring_rules().await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, Some(RuleId::Number(1)));
        assert_eq!(rules[1].id, Some(RuleId::Text("7".to_string())));
        assert_eq!(transport.sent()[0].method, "GET");
        assert_eq!(transport.sent()[0].path, "/recurring_status");
    }

    #[tokio::test]
    async fn test_recent_recordings_listing() {
        let transport = FakeTransport::new().reply(json!({
            "count": 1,
            "items": [{"id": 4, "title": "Nova", "channel": "OPB", "date": "2024-03-12",
                       "time": "9:00 PM", "status": "scheduled"}]
        }));
        let api = ConsoleApi::new(transport.clone());

        let items = api.recent_recordings().await.unwrap();
        assert_eq!(items[0].title.as_deref(), Some("Nova"));
        assert_eq!(items[0].status.as_deref(), Some("scheduled"));
        assert_eq!(transport.sent()[0].path, "/recent_recordings");
    }

    #[tokio::test]
    async fn test_listing_without_array_is_an_error() {
        let api = ConsoleApi::new(FakeTransport::new().reply(json!({"error": "boom"})));
        let err = api.recurring_rules().await.unwrap_err();
        assert_eq!(err.to_string(), "Error: unexpected reply: boom");
    }

    #[tokio::test]
    async fn test_cancel_bodies() {
        let transport = FakeTransport::new()
            .reply(json!({"message": "Canceled recording: Nova"}))
            .reply(json!({"message": "Canceled recurring series 'News'", "removed_rule_id": 7}))
            .reply(json!({"message": "Recurring series rule not found"}));
        let api = ConsoleApi::new(transport.clone());

        assert_eq!(api.cancel_recording(0).await.unwrap(), "Canceled recording: Nova");
        assert_eq!(
            api.cancel_recurring(&RuleId::Number(7)).await.unwrap(),
            "Canceled recurring series 'News'"
        );
        assert_eq!(
            api.cancel_next_episode(&RuleId::Text("a".to_string()))
                .await
                .unwrap(),
            "Recurring series rule not found"
        );

        let sent = transport.sent();
        assert_eq!(sent[0].path, "/cancel");
        assert_eq!(sent[0].body, Some(json!({"idx": 0})));
        assert_eq!(sent[1].path, "/cancel_recurring");
        assert_eq!(sent[1].body, Some(json!({"rule_id": 7})));
        assert_eq!(sent[2].path, "/cancel_next_episode");
        assert_eq!(sent[2].body, Some(json!({"rule_id": "a"})));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let api = ConsoleApi::new(FakeTransport::new().fail("connection refused"));
        let err = api.stop_recording().await.unwrap_err();
        assert_eq!(err.to_string(), "Error: connection refused");
    }
}
