use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::LlmProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmCompletion {
    pub text: String,
    pub tokens_used: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmCompletion, LlmClientError>;
}

/// Everything needed to build a client for one provider.
#[derive(Clone)]
pub struct LlmClientSpec {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl fmt::Debug for LlmClientSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClientSpec")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

pub trait LlmClientFactory: Send + Sync {
    fn create(&self, spec: &LlmClientSpec) -> Result<Arc<dyn LlmClient>, LlmClientError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmClientError {
    #[error("{provider} api request failed: {message}")]
    ApiRequestFailed {
        provider: LlmProvider,
        message: String,
    },
    #[error("{provider} rate limited")]
    RateLimited { provider: LlmProvider },
    #[error("{provider} invalid response: {message}")]
    InvalidResponse {
        provider: LlmProvider,
        message: String,
    },
    #[error("{0} requires an API key")]
    MissingApiKey(LlmProvider),
    #[error("{provider} misconfigured: {message}")]
    InvalidConfiguration {
        provider: LlmProvider,
        message: String,
    },
}
