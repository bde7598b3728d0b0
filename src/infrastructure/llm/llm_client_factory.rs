use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use super::{AnthropicClient, OllamaClient, OpenAiCompatibleClient};
use crate::application::ports::{LlmClient, LlmClientError, LlmClientFactory, LlmClientSpec};
use crate::domain::LlmProvider;

const OPENWEBUI_API_SUFFIX: &str = "/api";

/// Builds HTTP-backed clients that share one connection pool.
pub struct HttpLlmClientFactory {
    client: Client,
}

impl HttpLlmClientFactory {
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }
}

impl LlmClientFactory for HttpLlmClientFactory {
    fn create(&self, spec: &LlmClientSpec) -> Result<Arc<dyn LlmClient>, LlmClientError> {
        let provider = spec.provider;
        let base_url = resolve_base_url(provider, spec.base_url.as_deref())?;
        let api_key = provider
            .requires_api_key()
            .then(|| require_key(provider, spec.api_key.as_deref()))
            .transpose()?
            .unwrap_or_default();

        tracing::info!(
            provider = %provider,
            model = %spec.model,
            base_url = %base_url,
            "Creating LLM client"
        );

        let client: Arc<dyn LlmClient> = match provider {
            LlmProvider::OpenAi
            | LlmProvider::OpenWebUi
            | LlmProvider::OpenRouter
            | LlmProvider::Perplexity => Arc::new(OpenAiCompatibleClient::new(
                self.client.clone(),
                provider,
                base_url,
                api_key,
                spec.model.clone(),
            )),
            LlmProvider::Anthropic => Arc::new(AnthropicClient::new(
                self.client.clone(),
                base_url,
                api_key,
                spec.model.clone(),
            )),
            LlmProvider::Ollama => Arc::new(OllamaClient::new(
                self.client.clone(),
                base_url,
                spec.model.clone(),
            )),
        };

        Ok(client)
    }
}

/// Custom endpoint if given, else the provider default. Open WebUI serves its
/// completions under `/api`, which is appended when missing.
pub fn resolve_base_url(
    provider: LlmProvider,
    custom: Option<&str>,
) -> Result<String, LlmClientError> {
    let custom = custom
        .map(|url| url.trim().trim_end_matches('/'))
        .filter(|url| !url.is_empty());

    let base = match (custom, provider.default_base_url()) {
        (Some(url), _) => url.to_string(),
        (None, Some(default)) => default.to_string(),
        (None, None) => {
            return Err(LlmClientError::InvalidConfiguration {
                provider,
                message: "a base_url is required".to_string(),
            });
        }
    };

    if provider == LlmProvider::OpenWebUi && !base.ends_with(OPENWEBUI_API_SUFFIX) {
        let adjusted = format!("{base}{OPENWEBUI_API_SUFFIX}");
        tracing::info!(from = %base, to = %adjusted, "Adjusted Open WebUI base URL");
        return Ok(adjusted);
    }

    Ok(base)
}

fn require_key(provider: LlmProvider, api_key: Option<&str>) -> Result<String, LlmClientError> {
    api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .ok_or(LlmClientError::MissingApiKey(provider))
}
