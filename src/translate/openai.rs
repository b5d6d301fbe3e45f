// OpenAI chat-completions backend
// Sends one keyed batch per request and asks for a JSON object reply

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{Result, ScriptlocError};
use super::{Batch, BackendError, BatchResponse, RateLimitStatus, TranslationBackend, parse_reset};

const REMAINING_REQUESTS: &str = "x-ratelimit-remaining-requests";
const REMAINING_TOKENS: &str = "x-ratelimit-remaining-tokens";
const RESET_REQUESTS: &str = "x-ratelimit-reset-requests";
const RESET_TOKENS: &str = "x-ratelimit-reset-tokens";
const RETRY_AFTER: &str = "retry-after";

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct OpenAiBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ScriptlocError::Config(format!(
                "Environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl TranslationBackend for OpenAiBackend {
    async fn translate_batch(
        &self,
        system_prompt: &str,
        batch: &Batch,
    ) -> std::result::Result<BatchResponse, BackendError> {
        let payload = serde_json::to_string(batch)
            .map_err(|e| BackendError::Transport(format!("Failed to encode batch: {}", e)))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: payload,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Sending {} blocks to {}", batch.len(), url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited {
                reset: rate_limited_reset(response.headers()),
            });
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Transport(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let rate_limit = rate_limit_from_headers(response.headers());
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::MalformedResponse("Response has no message content".to_string()))?;

        Ok(BatchResponse {
            translations: parse_batch_reply(&content)?,
            rate_limit,
        })
    }
}

/// Decode the model's JSON object reply into a batch.
///
/// Non-string values are kept in their JSON text form.
pub fn parse_batch_reply(content: &str) -> std::result::Result<Batch, BackendError> {
    let value: Value = serde_json::from_str(content.trim())
        .map_err(|e| BackendError::MalformedResponse(format!("Reply is not JSON: {}", e)))?;

    let Value::Object(object) = value else {
        return Err(BackendError::MalformedResponse("Reply is not a JSON object".to_string()));
    };

    Ok(object
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => (key, text),
            other => (key, other.to_string()),
        })
        .collect())
}

/// Budget headers of a successful response, if it carried any
pub fn rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitStatus> {
    let remaining_requests = header_str(headers, REMAINING_REQUESTS).and_then(|v| v.parse().ok());
    let remaining_tokens = header_str(headers, REMAINING_TOKENS).and_then(|v| v.parse().ok());
    if remaining_requests.is_none() && remaining_tokens.is_none() {
        return None;
    }

    Some(RateLimitStatus {
        remaining_requests,
        remaining_tokens,
        reset_requests: header_str(headers, RESET_REQUESTS).map(parse_reset).unwrap_or_default(),
        reset_tokens: header_str(headers, RESET_TOKENS).map(parse_reset).unwrap_or_default(),
    })
}

fn rate_limited_reset(headers: &HeaderMap) -> Duration {
    header_str(headers, RESET_REQUESTS)
        .or_else(|| header_str(headers, RETRY_AFTER))
        .map(parse_reset)
        .unwrap_or_default()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
