// Translation backend architecture
//
// - Backend: the keyed-batch request/response contract
// - OpenAI: chat-completions backend over HTTP
// - Orchestrator: placeholder protection, retries and fallback
// - Rate limit: reset parsing, throttling and the retry policy

pub mod openai;
pub mod orchestrator;
pub mod rate_limit;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use orchestrator::*;
pub use rate_limit::*;

use crate::config::TranslateConfig;
use crate::error::Result;

/// Block contents keyed by their stringified index
pub type Batch = BTreeMap<String, String>;

/// A backend reply: translated values plus whatever rate-limit budget it reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResponse {
    pub translations: Batch,
    pub rate_limit: Option<RateLimitStatus>,
}

impl BatchResponse {
    pub fn new(translations: Batch) -> Self {
        Self {
            translations,
            rate_limit: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("rate limited, budget resets in {reset:?}")]
    RateLimited { reset: Duration },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Main trait for translation services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate every value of `batch`, returning the same keys
    async fn translate_batch(
        &self,
        system_prompt: &str,
        batch: &Batch,
    ) -> std::result::Result<BatchResponse, BackendError>;
}

/// Factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create the default backend (OpenAI chat completions)
    pub fn create_backend(config: &TranslateConfig) -> Result<Arc<dyn TranslationBackend>> {
        Ok(Arc::new(openai::OpenAiBackend::new(config)?))
    }
}
