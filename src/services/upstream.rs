//! Streaming completion provider
//!
//! Talks to an OpenAI-compatible `chat/completions` endpoint (Groq by
//! default) with `stream: true` and turns its SSE body into text fragments.

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

use crate::config::UpstreamConfig;
use crate::types::UpstreamError;

/// Ordered, forward-only model output.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streaming completion. Errors here happen before any output.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<FragmentStream, UpstreamError>;
}

pub struct GroqProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GroqProvider {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        if config.api_key.is_none() {
            tracing::warn!("⚠️ GROQ_API_KEY not set, upstream calls will be unauthenticated");
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_base),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<FragmentStream, UpstreamError> {
        tracing::debug!(model = %request.model, messages = request.messages.len(), "calling upstream");

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status: status.as_u16(), body });
        }

        let mut bytes = Box::pin(response.bytes_stream());
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::default();
            'read: loop {
                let (events, exhausted) = match bytes.next().await {
                    Some(Ok(chunk)) => (decoder.push(&chunk), false),
                    Some(Err(e)) => {
                        yield Err(UpstreamError::Request(e.to_string()));
                        break 'read;
                    }
                    None => (decoder.finish().into_iter().collect::<Vec<_>>(), true),
                };
                for event in events {
                    match event {
                        SseEvent::Fragment(text) => yield Ok(text),
                        SseEvent::Done => break 'read,
                        SseEvent::Error(message) => {
                            yield Err(UpstreamError::Protocol(message));
                            break 'read;
                        }
                    }
                }
                if exhausted {
                    break 'read;
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Fragment(String),
    Done,
    Error(String),
}

/// Longest line the decoder buffers while waiting for a newline.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Incremental decoder for OpenAI-style `data:` lines.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode intact. A partial line
/// longer than [`MAX_LINE_BYTES`] is discarded and reported as an error.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = parse_line(line.trim_end_matches(['\r', '\n'])) {
                events.push(event);
            }
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            self.buffer.clear();
            events.push(SseEvent::Error(format!(
                "upstream line exceeds {MAX_LINE_BYTES} bytes"
            )));
        }
        events
    }

    /// Decode whatever is left once the body ends without a final newline.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest);
        parse_line(line.trim_end_matches(['\r', '\n']))
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }

    let payload: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => return Some(SseEvent::Error(format!("unparseable chunk: {e}"))),
    };

    if let Some(error) = payload.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Some(SseEvent::Error(message));
    }

    payload["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|content| !content.is_empty())
        .map(|content| SseEvent::Fragment(content.to_string()))
}
