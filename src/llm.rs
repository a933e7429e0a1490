use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn from_env() -> Result<Self> {
        let base_url = dotenv::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:1234/v1".to_string());
        let model =
            dotenv::var("LLM_MODEL").unwrap_or_else(|_| "qwen/qwen3-8b".to_string());
        let api_key = dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
        let timeout_secs = dotenv::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(300);

        // Streams stay open for the whole reply, so only bound the total time
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Streaming chat completion. Text deltas arrive on the returned channel
    /// in order; the channel closes when the reply is complete. A transport
    /// or upstream error is delivered as the last item.
    pub async fn chat_stream(&self, messages: &[Message]) -> Result<mpsc::Receiver<Result<String>>> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.3,
            "stream": true,
        });

        let mut req = self
            .client
            .post(self.endpoint())
            .header("accept", "text/event-stream")
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await.context("LLM request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("LLM returned {}: {}", status, text);
        }

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();
            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(error = %e, "LLM stream interrupted");
                        let _ = tx
                            .send(Err(anyhow::Error::new(e).context("LLM stream interrupted")))
                            .await;
                        return;
                    }
                };
                for event in decoder.push(&chunk) {
                    match event {
                        SseEvent::Delta(text) => {
                            // Receiver dropped: the command gave up on this reply
                            if tx.send(Ok(text)).await.is_err() {
                                return;
                            }
                        }
                        SseEvent::Error(message) => {
                            let _ = tx.send(Err(anyhow::anyhow!("LLM error: {}", message))).await;
                            return;
                        }
                        SseEvent::Done => {
                            debug!("LLM stream finished");
                            return;
                        }
                    }
                }
            }
            debug!("LLM stream closed without [DONE]");
        });

        Ok(rx)
    }
}

/// One decoded server-sent event from an OpenAI-compatible stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Error(String),
    Done,
}

/// Longest SSE line the decoder will buffer before giving up on the stream.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental decoder for `data: {...}` lines. Network chunks may split
/// lines (and UTF-8 sequences) anywhere; only complete lines are decoded.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    max_line: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
        }
    }

    /// Decode every complete line in the buffer. A partial line longer than
    /// the cap is dropped and reported as an `SseEvent::Error`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if line.len() > self.max_line {
                events.push(self.overflow());
                return events;
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = decode_line(line.trim()) {
                events.push(event);
            }
        }
        if self.buffer.len() > self.max_line {
            events.push(self.overflow());
        }
        events
    }

    fn overflow(&mut self) -> SseEvent {
        self.buffer.clear();
        SseEvent::Error(format!("SSE line exceeds {} bytes", self.max_line))
    }
}

fn decode_line(line: &str) -> Option<SseEvent> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    let json: serde_json::Value = serde_json::from_str(payload).ok()?;
    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        let message = err["message"].as_str().unwrap_or("unknown error");
        return Some(SseEvent::Error(message.to_string()));
    }
    let content = json["choices"]
        .get(0)
        .and_then(|c| c["delta"]["content"].as_str())
        .filter(|s| !s.is_empty())?;
    Some(SseEvent::Delta(content.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    #[test]
    fn test_decode_deltas_and_done() {
        let mut decoder = SseDecoder::default();
        let input = format!("{}{}data: [DONE]\n\n", delta_line("Hel"), delta_line("lo"));
        let events = decoder.push(input.as_bytes());
        assert_eq!(
            events,
            vec![
                SseEvent::Delta("Hel".to_string()),
                SseEvent::Delta("lo".to_string()),
                SseEvent::Done
            ]
        );
    }

    #[test]
    fn test_decode_split_chunks() {
        let mut decoder = SseDecoder::default();
        let line = delta_line("é [cite-1]");
        let bytes = line.as_bytes();
        // Split inside the two-byte 'é'
        let split = line.find('é').unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(
            decoder.push(&bytes[split..]),
            vec![SseEvent::Delta("é [cite-1]".to_string())]
        );
    }

    #[test]
    fn test_decode_overlong_line_fails() {
        let mut decoder = SseDecoder::with_max_line(64);
        assert!(decoder.push(b"data: {\"choices\":").is_empty());
        let events = decoder.push(&[b'x'; 64]);
        assert_eq!(
            events,
            vec![SseEvent::Error("SSE line exceeds 64 bytes".to_string())]
        );
        // The oversized partial line is discarded
        assert_eq!(
            decoder.push(delta_line("ok").as_bytes()),
            vec![SseEvent::Delta("ok".to_string())]
        );
    }

    #[test]
    fn test_decode_line_under_cap() {
        let mut decoder = SseDecoder::with_max_line(64);
        assert_eq!(
            decoder.push(delta_line("short").as_bytes()),
            vec![SseEvent::Delta("short".to_string())]
        );
    }

    #[test]
    fn test_decode_skips_noise() {
        let mut decoder = SseDecoder::default();
        let input = ": keep-alive\n\nevent: ping\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\ndata: not json\n";
        assert!(decoder.push(input.as_bytes()).is_empty());
    }

    #[test]
    fn test_decode_error_payload() {
        let mut decoder = SseDecoder::default();
        let input = "data: {\"error\":{\"message\":\"rate limited\"}}\n";
        assert_eq!(
            decoder.push(input.as_bytes()),
            vec![SseEvent::Error("rate limited".to_string())]
        );
    }

    #[test]
    fn test_endpoint_resolution() {
        let client = |base: &str| LlmClient {
            client: reqwest::Client::new(),
            base_url: base.to_string(),
            model: "m".to_string(),
            api_key: None,
        };
        assert_eq!(
            client("http://localhost:1234/v1").endpoint(),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            client("https://api.example.com/").endpoint(),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            client("https://x.io/v1/chat/completions").endpoint(),
            "https://x.io/v1/chat/completions"
        );
    }
}
