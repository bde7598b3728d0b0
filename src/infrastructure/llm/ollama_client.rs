use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http_response::{ensure_success, estimate_tokens, invalid_response, send_error};
use crate::application::ports::{LlmClient, LlmClientError, LlmCompletion};
use crate::domain::LlmProvider;
use crate::infrastructure::observability::sanitize_prompt;

const PROVIDER: LlmProvider = LlmProvider::Ollama;

/// Non-streaming `/api/generate` client for a local Ollama server.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl OllamaClient {
    pub fn new(client: Client, base_url: String, model: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmCompletion, LlmClientError> {
        tracing::debug!(
            model = %self.model,
            prompt = %sanitize_prompt(prompt),
            "Sending Ollama generate request"
        );

        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| invalid_response(PROVIDER, e.to_string()))?;

        let input_tokens = generated
            .prompt_eval_count
            .unwrap_or_else(|| estimate_tokens(prompt));
        let output_tokens = generated
            .eval_count
            .unwrap_or_else(|| estimate_tokens(&generated.response));

        Ok(LlmCompletion {
            text: generated.response,
            tokens_used: input_tokens.saturating_add(output_tokens),
            input_tokens,
            output_tokens,
        })
    }
}
