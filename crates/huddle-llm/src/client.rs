// Claude API streaming client using reqwest-eventsource.
//
// Requests go to the Anthropic Messages API with `stream: true`. The
// Server-Sent Events are parsed into `LlmEvent`s on an mpsc channel;
// `generate` drains that channel under a timeout and folds the stream into a
// typed `Narrative`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use huddle_core::config::{CredentialsConfig, LlmConfig};
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::narrative::{Narrative, NarrativeFailure};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Channel depth between the SSE reader and the collector.
const EVENT_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Stream events
// ---------------------------------------------------------------------------

/// One step of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    Token {
        text: String,
    },
    Complete {
        full_text: String,
        input_tokens: u32,
        output_tokens: u32,
    },
    Error {
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Generator seam
// ---------------------------------------------------------------------------

/// Anything that can turn a prompt into commentary.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Never fails; problems come back as `Narrative::Unavailable`.
    async fn generate(&self, system: &str, prompt: &str, max_tokens: u32) -> Narrative;
}

// ---------------------------------------------------------------------------
// ClaudeClient
// ---------------------------------------------------------------------------

/// Low-level Claude API streaming client.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
    timeout: Duration,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            api_url: ANTHROPIC_API_URL.to_string(),
            timeout,
        }
    }

    /// Point the client at a different Messages endpoint.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Send a message and stream the response as `LlmEvent`s over `tx`.
    ///
    /// Returns when the stream completes, errors, or the receiver is dropped.
    /// Stream failures are reported as `LlmEvent::Error`, not as `Err`.
    pub async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
    ) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            let _ = tx
                .send(LlmEvent::Error {
                    message: "API key not configured".to_string(),
                })
                .await;
            return Ok(());
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "stream": true,
            "system": system,
            "messages": [{ "role": "user", "content": user_content }]
        });

        let request = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = match request.eventsource() {
            Ok(es) => es,
            Err(e) => {
                let _ = tx
                    .send(LlmEvent::Error {
                        message: format!("Failed to create event source: {e}"),
                    })
                    .await;
                return Ok(());
            }
        };

        let mut full_text = String::new();
        let mut input_tokens: u32 = 0;
        let mut output_tokens: u32 = 0;

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("SSE connection opened");
                }
                Ok(Event::Message(msg)) => match msg.event.as_str() {
                    "message_start" => {
                        match parse_input_tokens(&msg.data) {
                            Some(n) => input_tokens = n,
                            None => warn!("failed to parse input_tokens from message_start"),
                        }
                    }
                    "content_block_delta" => {
                        if let Some(text) = parse_delta_text(&msg.data) {
                            full_text.push_str(&text);
                            if tx.send(LlmEvent::Token { text }).await.is_err() {
                                es.close();
                                return Ok(());
                            }
                        }
                    }
                    "message_delta" => {
                        if let Some(n) = parse_output_tokens(&msg.data) {
                            output_tokens = n;
                        }
                    }
                    "message_stop" => {
                        debug!(input_tokens, output_tokens, "message_stop");
                        let _ = tx
                            .send(LlmEvent::Complete {
                                full_text,
                                input_tokens,
                                output_tokens,
                            })
                            .await;
                        es.close();
                        return Ok(());
                    }
                    other => {
                        debug!(event_type = other, "ignoring SSE event");
                    }
                },
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    let _ = tx
                        .send(LlmEvent::Error {
                            message: extract_error_message(&err),
                        })
                        .await;
                    es.close();
                    return Ok(());
                }
            }
        }

        // Stream ended without message_stop.
        let event = if full_text.is_empty() {
            LlmEvent::Error {
                message: "Stream ended unexpectedly without any content".to_string(),
            }
        } else {
            LlmEvent::Complete {
                full_text,
                input_tokens,
                output_tokens,
            }
        };
        let _ = tx.send(event).await;
        Ok(())
    }

    async fn collect(&self, system: &str, prompt: &str, max_tokens: u32) -> Narrative {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

        let reader = self.stream_message(system, prompt, max_tokens, tx);
        let collector = async {
            let mut outcome = None;
            while let Some(event) = rx.recv().await {
                match event {
                    LlmEvent::Token { .. } => {}
                    LlmEvent::Complete {
                        full_text,
                        input_tokens,
                        output_tokens,
                    } => {
                        outcome = Some(if full_text.trim().is_empty() {
                            Narrative::unavailable(NarrativeFailure::EmptyResponse)
                        } else {
                            Narrative::Generated {
                                text: full_text,
                                input_tokens,
                                output_tokens,
                            }
                        });
                    }
                    LlmEvent::Error { message } => {
                        outcome = Some(Narrative::unavailable(NarrativeFailure::Api { message }));
                    }
                }
            }
            outcome
        };

        let (read_result, outcome) = tokio::join!(reader, collector);
        if let Err(e) = read_result {
            return Narrative::unavailable(NarrativeFailure::Api {
                message: e.to_string(),
            });
        }
        outcome.unwrap_or_else(|| Narrative::unavailable(NarrativeFailure::EmptyResponse))
    }
}

#[async_trait]
impl NarrativeGenerator for ClaudeClient {
    async fn generate(&self, system: &str, prompt: &str, max_tokens: u32) -> Narrative {
        match tokio::time::timeout(self.timeout, self.collect(system, prompt, max_tokens)).await {
            Ok(narrative) => {
                match &narrative {
                    Narrative::Generated { output_tokens, .. } => {
                        info!(output_tokens, "narrative generated");
                    }
                    Narrative::Unavailable { reason } => {
                        warn!(%reason, "narrative unavailable");
                    }
                }
                narrative
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "narrative request timed out");
                Narrative::unavailable(NarrativeFailure::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// Either an active Claude client or a disabled stand-in that always
/// reports why it is disabled.
pub enum LlmClient {
    Active(ClaudeClient),
    Disabled(NarrativeFailure),
}

impl LlmClient {
    /// `Active` when narration is enabled and an API key is present.
    pub fn from_config(llm: &LlmConfig, credentials: &CredentialsConfig) -> Self {
        if !llm.enabled {
            return LlmClient::Disabled(NarrativeFailure::Disabled);
        }
        match &credentials.anthropic_api_key {
            Some(key) if !key.trim().is_empty() => LlmClient::Active(ClaudeClient::new(
                key.clone(),
                llm.model.clone(),
                Duration::from_secs(llm.timeout_secs),
            )),
            _ => LlmClient::Disabled(NarrativeFailure::MissingApiKey),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }
}

#[async_trait]
impl NarrativeGenerator for LlmClient {
    async fn generate(&self, system: &str, prompt: &str, max_tokens: u32) -> Narrative {
        match self {
            LlmClient::Active(client) => client.generate(system, prompt, max_tokens).await,
            LlmClient::Disabled(reason) => Narrative::unavailable(reason.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// `message.usage.input_tokens` from a `message_start` event.
pub(crate) fn parse_input_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("message")?
        .get("usage")?
        .get("input_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// `delta.text` from a `content_block_delta` event.
pub(crate) fn parse_delta_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?.get("text")?.as_str().map(str::to_string)
}

/// `usage.output_tokens` from a `message_delta` event.
pub(crate) fn parse_output_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("usage")?
        .get("output_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

fn extract_error_message(err: &reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => {
            format!("API returned status {status}")
        }
        reqwest_eventsource::Error::Transport(e) => format!("Network error: {e}"),
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn llm_config(enabled: bool) -> LlmConfig {
        LlmConfig {
            enabled,
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 600,
            timeout_secs: 30,
        }
    }

    fn credentials(key: Option<&str>) -> CredentialsConfig {
        CredentialsConfig {
            anthropic_api_key: key.map(str::to_string),
            ..Default::default()
        }
    }

    /// Serve one canned HTTP response on a loopback port and return its URL.
    async fn serve_once(response: String, hold: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(hold).await;
        });
        format!("http://{addr}")
    }

    fn sse_response(chunks: &[&str]) -> String {
        let mut body = String::from(concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: text/event-stream\r\n",
            "Cache-Control: no-cache\r\n",
            "\r\n",
            "event: message_start\r\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":21}}}\r\n",
            "\r\n",
        ));
        for chunk in chunks {
            let data = serde_json::json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": { "type": "text_delta", "text": chunk }
            });
            body.push_str(&format!("event: content_block_delta\r\ndata: {data}\r\n\r\n"));
        }
        body.push_str(concat!(
            "event: message_delta\r\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":9}}\r\n",
            "\r\n",
            "event: message_stop\r\n",
            "data: {\"type\":\"message_stop\"}\r\n",
            "\r\n",
        ));
        body
    }

    // -- SSE JSON parsing --

    #[test]
    fn parse_message_start_input_tokens() {
        let data = r#"{
            "type": "message_start",
            "message": { "id": "msg_123", "usage": { "input_tokens": 42, "output_tokens": 0 } }
        }"#;
        assert_eq!(parse_input_tokens(data), Some(42));
        assert_eq!(parse_input_tokens(r#"{"message":{}}"#), None);
        assert_eq!(parse_input_tokens("not json"), None);
    }

    #[test]
    fn parse_content_block_delta_text() {
        let data = r#"{
            "type": "content_block_delta",
            "index": 0,
            "delta": { "type": "text_delta", "text": "Touchdown" }
        }"#;
        assert_eq!(parse_delta_text(data), Some("Touchdown".to_string()));
        assert_eq!(parse_delta_text(r#"{"index":0}"#), None);
        assert_eq!(parse_delta_text("{broken"), None);
    }

    #[test]
    fn parse_message_delta_output_tokens() {
        let data = r#"{
            "type": "message_delta",
            "delta": { "stop_reason": "end_turn" },
            "usage": { "output_tokens": 128 }
        }"#;
        assert_eq!(parse_output_tokens(data), Some(128));
        assert_eq!(parse_output_tokens(r#"{"delta":{}}"#), None);
    }

    // -- from_config --

    #[test]
    fn from_config_with_key_is_active() {
        let client = LlmClient::from_config(&llm_config(true), &credentials(Some("sk-ant-test")));
        assert!(client.is_active());
    }

    #[test]
    fn from_config_without_key_is_disabled() {
        for key in [None, Some(""), Some("   ")] {
            let client = LlmClient::from_config(&llm_config(true), &credentials(key));
            assert!(matches!(
                client,
                LlmClient::Disabled(NarrativeFailure::MissingApiKey)
            ));
        }
    }

    #[test]
    fn from_config_respects_enabled_flag() {
        let client = LlmClient::from_config(&llm_config(false), &credentials(Some("sk-ant-test")));
        assert!(matches!(client, LlmClient::Disabled(NarrativeFailure::Disabled)));
    }

    // -- generate --

    #[tokio::test]
    async fn disabled_client_is_unavailable() {
        let client = LlmClient::Disabled(NarrativeFailure::MissingApiKey);
        let narrative = client.generate("system", "prompt", 100).await;
        assert_eq!(
            narrative,
            Narrative::unavailable(NarrativeFailure::MissingApiKey)
        );
    }

    #[tokio::test]
    async fn empty_api_key_reports_api_failure() {
        let client = ClaudeClient::new(String::new(), "model".to_string(), Duration::from_secs(5));
        let narrative = client.generate("system", "prompt", 100).await;
        assert_eq!(
            narrative,
            Narrative::unavailable(NarrativeFailure::Api {
                message: "API key not configured".to_string()
            })
        );
    }

    #[tokio::test]
    async fn stream_message_forwards_tokens_then_complete() {
        let url = serve_once(
            sse_response(&["Week ", "five"]),
            Duration::from_millis(100),
        )
        .await;
        let client = ClaudeClient::new("sk-test".into(), "m".into(), Duration::from_secs(5))
            .with_api_url(url);

        let (tx, mut rx) = mpsc::channel(16);
        client.stream_message("s", "p", 50, tx).await.unwrap();

        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        assert_eq!(
            events,
            vec![
                LlmEvent::Token { text: "Week ".to_string() },
                LlmEvent::Token { text: "five".to_string() },
                LlmEvent::Complete {
                    full_text: "Week five".to_string(),
                    input_tokens: 21,
                    output_tokens: 9,
                },
            ]
        );
    }

    #[tokio::test]
    async fn generate_collects_streamed_text() {
        let url = serve_once(
            sse_response(&["The Aces ", "are rolling."]),
            Duration::from_millis(100),
        )
        .await;
        let client = ClaudeClient::new("sk-test".into(), "m".into(), Duration::from_secs(5))
            .with_api_url(url);

        let narrative = client.generate("system", "prompt", 200).await;
        assert_eq!(
            narrative,
            Narrative::Generated {
                text: "The Aces are rolling.".to_string(),
                input_tokens: 21,
                output_tokens: 9,
            }
        );
    }

    #[tokio::test]
    async fn generate_maps_error_status() {
        let body = r#"{"error":{"message":"Invalid API key"}}"#;
        let response = format!(
            "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let url = serve_once(response, Duration::from_millis(100)).await;
        let client = ClaudeClient::new("sk-bad".into(), "m".into(), Duration::from_secs(5))
            .with_api_url(url);

        match client.generate("system", "prompt", 200).await {
            Narrative::Unavailable {
                reason: NarrativeFailure::Api { message },
            } => assert!(message.contains("401"), "{message}"),
            other => panic!("expected API failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_times_out() {
        // Accepts the connection but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = ClaudeClient::new("sk-test".into(), "m".into(), Duration::from_millis(200))
            .with_api_url(format!("http://{addr}"));
        let narrative = client.generate("system", "prompt", 200).await;
        assert_eq!(
            narrative,
            Narrative::unavailable(NarrativeFailure::Timeout { secs: 0 })
        );
        assert_eq!(narrative.text_or_offline_notice(), crate::narrative::OFFLINE_NOTICE);
    }
}
