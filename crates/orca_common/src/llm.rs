//! LLM Client - streaming chat completions against OpenAI-compatible endpoints
//!
//! The client is built explicitly from an [`LlmConfig`] and handed to whoever
//! needs it; there is no process-wide instance. API keys are read from the
//! environment variable named in the config, never stored in it.
//!
//! Reasoning models stream two channels: `delta.reasoning_content` (the
//! thinking trace) and `delta.content` (the answer). Both are surfaced as a
//! single iterator of tagged [`StreamChunk`]s.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::env;
use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;
use tracing::{debug, warn};

/// LLM configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    pub base_url: String,

    /// Default model id
    pub model: String,

    /// Environment variable holding the API key; `None` for local servers
    pub api_key_env: Option<String>,

    /// Whole-request timeout, streaming included
    pub timeout_secs: u64,

    /// Ask reasoning models to stream their thinking during code generation
    pub enable_thinking: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.modelscope.cn/v1".to_string(),
            model: "deepseek-ai/DeepSeek-V3.2".to_string(),
            api_key_env: Some("MODELSCOPE_API_KEY".to_string()),
            timeout_secs: 300,
            enable_thinking: true,
        }
    }
}

/// A single chat request (system + user turn)
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub enable_thinking: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            user: user.into(),
            enable_thinking: false,
        }
    }

    pub fn with_thinking(mut self, enable: bool) -> Self {
        self.enable_thinking = enable;
        self
    }

    /// OpenAI-compatible request body with streaming enabled
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system},
                {"role": "user", "content": self.user},
            ],
            "stream": true,
            "enable_thinking": self.enable_thinking,
        })
    }
}

/// One piece of streamed model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "text", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Thinking trace; never part of the answer
    Reasoning(String),
    /// Answer text
    Content(String),
}

impl StreamChunk {
    pub fn text(&self) -> &str {
        match self {
            StreamChunk::Reasoning(text) | StreamChunk::Content(text) => text,
        }
    }
}

/// LLM errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM backend is disabled")]
    Disabled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("LLM returned empty response")]
    EmptyResponse,
}

/// Streamed reply: tagged chunks in arrival order
pub type ChunkStream = Box<dyn Iterator<Item = Result<StreamChunk, LlmError>> + Send>;

/// LLM backend trait
pub trait LlmBackend: Send + Sync {
    /// Start a streaming chat request
    fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError>;
}

/// Dummy backend (always returns disabled error)
pub struct DummyBackend;

impl LlmBackend for DummyBackend {
    fn chat_stream(&self, _request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        Err(LlmError::Disabled)
    }
}

/// Drain a stream, forwarding every chunk to `sink`, and return the answer text
///
/// A stream that ends without a single chunk is `LlmError::EmptyResponse`.
/// Reasoning without content is a valid (empty) answer.
pub fn collect_content(
    stream: ChunkStream,
    sink: &mut dyn FnMut(&StreamChunk),
) -> Result<String, LlmError> {
    let mut content = String::new();
    let mut chunks = 0usize;
    for chunk in stream {
        let chunk = chunk?;
        chunks += 1;
        sink(&chunk);
        if let StreamChunk::Content(text) = &chunk {
            content.push_str(text);
        }
    }
    if chunks == 0 {
        return Err(LlmError::EmptyResponse);
    }
    Ok(content)
}

// =============================================================================
// Server-Sent Events
// =============================================================================

/// Meaning of one SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// A `data:` payload with zero or more non-empty chunks
    Chunks(Vec<StreamChunk>),
    /// The `[DONE]` terminator
    Done,
    /// Blank lines, comments, `event:`/`id:` fields
    Ignored,
}

/// Parse one line of an OpenAI-compatible SSE stream
pub fn parse_sse_line(line: &str) -> Result<SseLine, LlmError> {
    let line = line.trim();
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(SseLine::Ignored);
    };
    let payload = payload.trim_start();

    if payload == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| LlmError::StreamError(format!("Failed to parse chunk: {}", e)))?;

    if let Some(message) = value.get("error").and_then(|e| e.get("message")).and_then(|m| m.as_str()) {
        return Err(LlmError::StreamError(message.to_string()));
    }

    let mut chunks = Vec::new();
    let delta = &value["choices"][0]["delta"];
    if let Some(reasoning) = delta["reasoning_content"].as_str() {
        if !reasoning.is_empty() {
            chunks.push(StreamChunk::Reasoning(reasoning.to_string()));
        }
    }
    if let Some(content) = delta["content"].as_str() {
        if !content.is_empty() {
            chunks.push(StreamChunk::Content(content.to_string()));
        }
    }

    Ok(SseLine::Chunks(chunks))
}

/// Iterator over the chunks of a streaming response body
struct SseStream<R: BufRead> {
    lines: Lines<R>,
    pending: VecDeque<StreamChunk>,
    finished: bool,
}

impl<R: BufRead> SseStream<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            pending: VecDeque::new(),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for SseStream<R> {
    type Item = Result<StreamChunk, LlmError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }
            if self.finished {
                return None;
            }

            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(LlmError::StreamError(format!("Failed to read stream: {}", e))));
                }
                None => {
                    self.finished = true;
                    continue;
                }
            };

            match parse_sse_line(&line) {
                Ok(SseLine::Chunks(chunks)) => self.pending.extend(chunks),
                Ok(SseLine::Done) => {
                    debug!("LLM stream finished");
                    self.finished = true;
                }
                Ok(SseLine::Ignored) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

// =============================================================================
// HTTP Backend
// =============================================================================

/// HTTP OpenAI-compatible backend
pub struct HttpOpenAiBackend {
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl HttpOpenAiBackend {
    /// Create a new HTTP backend from config
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.base_url.trim().is_empty() {
            return Err(LlmError::ConfigError("base_url is required for HTTP backend".to_string()));
        }

        let api_key = match &config.api_key_env {
            Some(env_var) => match env::var(env_var) {
                Ok(key) if !key.trim().is_empty() => Some(key),
                Ok(_) => {
                    return Err(LlmError::ConfigError(format!("API key env var {} is empty", env_var)))
                }
                Err(_) => {
                    return Err(LlmError::ConfigError(format!("API key env var {} not found", env_var)))
                }
            },
            None => None,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs: config.timeout_secs,
            client,
        })
    }
}

impl LlmBackend for HttpOpenAiBackend {
    fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, thinking = request.enable_thinking, "POST {}", url);

        let mut req = self.client.post(&url).json(&request.to_body());
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout_secs)
            } else {
                LlmError::HttpError(format!("Request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            warn!("LLM request rejected with {}", status);
            return Err(LlmError::HttpError(format!("HTTP {}: {}", status, body)));
        }

        Ok(Box::new(SseStream::new(BufReader::new(response))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_dummy_backend_returns_disabled() {
        let request = ChatRequest::new("m", "sys", "hello");
        assert!(matches!(DummyBackend.chat_stream(&request), Err(LlmError::Disabled)));
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest::new("m", "sys", "hi").with_thinking(true).to_body();
        assert_eq!(body["stream"], true);
        assert_eq!(body["enable_thinking"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_parse_sse_both_channels() {
        let line = r#"data: {"choices":[{"delta":{"reasoning_content":"hmm","content":"ok"}}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            SseLine::Chunks(vec![
                StreamChunk::Reasoning("hmm".to_string()),
                StreamChunk::Content("ok".to_string()),
            ])
        );
    }

    #[test]
    fn test_parse_sse_skips_empty_and_null() {
        let line = r#"data: {"choices":[{"delta":{"reasoning_content":null,"content":""}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), SseLine::Chunks(vec![]));
    }

    #[test]
    fn test_parse_sse_done_and_ignored() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseLine::Done);
        assert_eq!(parse_sse_line("").unwrap(), SseLine::Ignored);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseLine::Ignored);
    }

    #[test]
    fn test_parse_sse_invalid_json() {
        assert!(matches!(parse_sse_line("data: {nope"), Err(LlmError::StreamError(_))));
    }

    #[test]
    fn test_parse_sse_error_payload() {
        let line = r#"data: {"error":{"message":"rate limited"}}"#;
        match parse_sse_line(line) {
            Err(LlmError::StreamError(msg)) => assert_eq!(msg, "rate limited"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_sse_stream_stops_at_done() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"reasoning_content\":\"think\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
        );
        let stream: ChunkStream = Box::new(SseStream::new(Cursor::new(body.as_bytes().to_vec())));
        let mut seen = Vec::new();
        let content = collect_content(stream, &mut |c: &StreamChunk| seen.push(c.clone())).unwrap();
        assert_eq!(content, "ab");
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], StreamChunk::Reasoning("think".to_string()));
    }

    #[test]
    fn test_collect_content_empty_stream() {
        let stream: ChunkStream = Box::new(SseStream::new(Cursor::new(b"data: [DONE]\n\n".to_vec())));
        assert!(matches!(
            collect_content(stream, &mut |_: &StreamChunk| {}),
            Err(LlmError::EmptyResponse)
        ));

        let reasoning_only: ChunkStream =
            Box::new(std::iter::once(Ok::<StreamChunk, LlmError>(StreamChunk::Reasoning("hmm".to_string()))));
        assert_eq!(collect_content(reasoning_only, &mut |_: &StreamChunk| {}).unwrap(), "");
    }

    #[test]
    fn test_missing_api_key_env_is_config_error() {
        let config = LlmConfig {
            api_key_env: Some("ORCA_TEST_KEY_THAT_DOES_NOT_EXIST".to_string()),
            ..LlmConfig::default()
        };
        assert!(matches!(HttpOpenAiBackend::new(&config), Err(LlmError::ConfigError(_))));
    }

    #[test]
    fn test_local_backend_without_key() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:11434/v1/".to_string(),
            api_key_env: None,
            ..LlmConfig::default()
        };
        let backend = HttpOpenAiBackend::new(&config).unwrap();
        assert_eq!(backend.base_url, "http://127.0.0.1:11434/v1");
        assert!(backend.api_key.is_none());
    }
}
