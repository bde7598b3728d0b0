use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http_response::{ensure_success, estimate_tokens, invalid_response, send_error};
use crate::application::ports::{LlmClient, LlmClientError, LlmCompletion};
use crate::domain::LlmProvider;
use crate::infrastructure::observability::sanitize_prompt;

/// `/chat/completions` client shared by every OpenAI-dialect provider.
pub struct OpenAiCompatibleClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: Option<u64>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        client: Client,
        provider: LlmProvider,
        base_url: String,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            client,
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmCompletion, LlmClientError> {
        tracing::debug!(
            provider = %self.provider,
            model = %self.model,
            prompt = %sanitize_prompt(prompt),
            "Sending chat completion"
        );

        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| send_error(self.provider, e))?;
        let response = ensure_success(self.provider, response).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| invalid_response(self.provider, e.to_string()))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| invalid_response(self.provider, "empty choices"))?;

        let (input_tokens, output_tokens, tokens_used) = match completion.usage {
            Some(usage) => (
                usage.prompt_tokens,
                usage.completion_tokens,
                usage
                    .total_tokens
                    .unwrap_or(usage.prompt_tokens.saturating_add(usage.completion_tokens)),
            ),
            None => {
                let input = estimate_tokens(prompt);
                let output = estimate_tokens(&text);
                (input, output, input.saturating_add(output))
            }
        };

        Ok(LlmCompletion {
            text,
            tokens_used,
            input_tokens,
            output_tokens,
        })
    }
}
