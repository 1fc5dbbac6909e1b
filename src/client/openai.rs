//! OpenAI-compatible streaming completion client
//!
//! Sends `POST {base_url}/chat/completions` with `stream: true` and parses
//! the server-sent event body. Each `data:` event carries a JSON chunk whose
//! `choices[0].delta.content` is the next fragment; `data: [DONE]` ends the
//! stream.

use super::{ChatMessage, CompletionClient, FragmentStream};
use crate::config::ApiConfig;
use crate::error::{ParleyError, Result};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Streaming client for OpenAI-compatible endpoints
///
/// # Examples
///
/// ```
/// use parley::client::OpenAiClient;
/// use parley::config::ApiConfig;
///
/// let config = ApiConfig {
///     api_key: Some("sk-test".to_string()),
///     ..Default::default()
/// };
/// let client = OpenAiClient::new(&config);
/// assert!(client.is_ok());
/// ```
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Request body for `/chat/completions`
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// One streamed chunk
///
/// Some endpoints report failures mid-stream as `{"error": {...}}`.
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    #[serde(default)]
    message: String,
}

impl OpenAiClient {
    /// Create a new client from API configuration
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` when no key is configured, or a client error
    /// if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ParleyError::MissingApiKey)?;

        // Streams may legitimately run for a long time, so only the
        // connection phase is bounded.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ParleyError::Client(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized completion client: base_url={}, model={}",
            config.base_url,
            config.model
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Endpoint used for completions
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn stream_chat(&self, model: &str, messages: &[ChatMessage]) -> Result<FragmentStream> {
        let body = ChatCompletionRequest {
            model,
            messages,
            stream: true,
        };

        tracing::debug!(model, messages = messages.len(), "Sending completion request");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ParleyError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ParleyError::Client(format!(
                "Completion request failed with status {}: {}",
                status, text
            ))
            .into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(parse_sse_stream(response.bytes_stream(), tx));

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

// ---------------------------------------------------------------------------
// SSE parser
// ---------------------------------------------------------------------------

/// Whether the parser should keep reading after an event
#[derive(Debug, PartialEq, Eq)]
enum SseControl {
    Continue,
    Done,
}

/// Parse an SSE byte stream and forward fragments to `fragment_tx`
///
/// Intended to run inside `tokio::spawn`. It consumes the stream until
/// `data: [DONE]`, the end of the body, the first error, or the receiver
/// being dropped. Errors are
/// forwarded as a final `Err` item. Bytes are buffered until a full event
/// has arrived, so multi-byte characters split across chunks decode intact.
pub async fn parse_sse_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
    fragment_tx: mpsc::UnboundedSender<Result<String>>,
) {
    use futures::StreamExt;

    let mut buffer: Vec<u8> = Vec::new();

    tokio::pin!(byte_stream);

    while let Some(chunk_result) = byte_stream.next().await {
        if fragment_tx.is_closed() {
            tracing::debug!("Fragment receiver dropped, abandoning stream");
            return;
        }

        let chunk = match chunk_result {
            Ok(c) => c,
            Err(e) => {
                let _ = fragment_tx.send(Err(ParleyError::Http(e).into()));
                return;
            }
        };

        buffer.extend(chunk.iter().filter(|b| **b != b'\r'));

        // Events are separated by blank lines.
        while let Some(pos) = find_event_boundary(&buffer) {
            let event_block: Vec<u8> = buffer.drain(..pos + 2).take(pos).collect();
            let event = String::from_utf8_lossy(&event_block);
            if process_sse_event(&event, &fragment_tx) == SseControl::Done {
                return;
            }
        }
    }

    if !buffer.is_empty() {
        let event = String::from_utf8_lossy(&buffer).into_owned();
        process_sse_event(&event, &fragment_tx);
    }
}

fn find_event_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Process one SSE event block
fn process_sse_event(
    event_block: &str,
    fragment_tx: &mpsc::UnboundedSender<Result<String>>,
) -> SseControl {
    let data_lines: Vec<&str> = event_block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .collect();

    // Comments (`: keep-alive`) and events without data carry nothing.
    if data_lines.is_empty() {
        return SseControl::Continue;
    }

    let data = data_lines.join("\n");
    if data == "[DONE]" {
        return SseControl::Done;
    }

    match serde_json::from_str::<ChatCompletionChunk>(&data) {
        Ok(ChatCompletionChunk {
            error: Some(error), ..
        }) => {
            let message = format!("Endpoint reported an error: {}", error.message);
            let _ = fragment_tx.send(Err(ParleyError::Stream(message).into()));
            SseControl::Done
        }
        Ok(chunk) => {
            let content = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .unwrap_or_default();
            if !content.is_empty() {
                tracing::trace!(fragment = ?content, "Received chunk");
                if fragment_tx.send(Ok(content)).is_err() {
                    tracing::debug!("Fragment receiver dropped, abandoning stream");
                    return SseControl::Done;
                }
            }
            SseControl::Continue
        }
        Err(e) => {
            let message = format!("Malformed stream chunk: {}", e);
            let _ = fragment_tx.send(Err(ParleyError::Stream(message).into()));
            SseControl::Done
        }
    }
}
