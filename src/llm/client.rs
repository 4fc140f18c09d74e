// ============================================================
// Layer 5 — Chat Completion Client
// ============================================================
// LanguageModel implementation for any OpenAI-compatible
// /chat/completions endpoint (OpenAI, OpenRouter, vLLM,
// Ollama, llama.cpp server, ...), over blocking reqwest.
//
// This client makes exactly ONE request per complete() call.
// Retrying is the generation wrapper's job; here we only
// classify what went wrong:
//
//   429, 5xx, timeout, connect failure → TransientUpstream
//   other 4xx, malformed body          → Upstream (permanent)

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::error::{RagError, Result};
use crate::domain::traits::LanguageModel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url:     String,
    pub model:        String,
    #[serde(skip_serializing)]
    pub api_key:      Option<String>,
    pub temperature:  f64,
    pub max_tokens:   u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url:     "https://api.openai.com/v1".to_string(),
            model:        "gpt-4o-mini".to_string(),
            api_key:      None,
            temperature:  0.1,
            max_tokens:   200,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model:       &'a str,
    messages:    [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens:  u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role:    &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct ChatCompletionClient {
    client: HttpClient,
    url:    String,
    config: LlmConfig,
}

impl ChatCompletionClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            client,
            config,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| RagError::config("API key contains invalid header characters"))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

impl LanguageModel for ChatCompletionClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model:       &self.config.model,
            messages:    [ChatMessage { role: "user", content: prompt }],
            temperature: self.config.temperature,
            max_tokens:  self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(classify_status(status, &message));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| RagError::Upstream(format!("malformed completion response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| RagError::Upstream("completion response had no content".to_string()))
    }
}

fn classify_transport(err: reqwest::Error) -> RagError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        RagError::TransientUpstream(format!("request failed: {err}"))
    } else {
        RagError::Upstream(format!("request failed: {err}"))
    }
}

fn classify_status(status: StatusCode, message: &str) -> RagError {
    let detail = format!("{} {}", status.as_u16(), message.trim());
    if status == StatusCode::TOO_MANY_REQUESTS {
        RagError::TransientUpstream(format!("rate limited: {detail}"))
    } else if status.is_server_error() {
        RagError::TransientUpstream(format!("service error: {detail}"))
    } else {
        RagError::Upstream(detail)
    }
}
