use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http_response::{ensure_success, invalid_response, send_error};
use crate::application::ports::{LlmClient, LlmClientError, LlmCompletion};
use crate::domain::LlmProvider;
use crate::infrastructure::observability::sanitize_prompt;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: LlmProvider = LlmProvider::Anthropic;

/// Messages API client.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

impl AnthropicClient {
    pub fn new(client: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmCompletion, LlmClientError> {
        tracing::debug!(
            model = %self.model,
            prompt = %sanitize_prompt(prompt),
            "Sending Anthropic message"
        );

        let request_body = MessagesRequest {
            model: &self.model,
            max_tokens,
            temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| send_error(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;

        let message: MessagesResponse = response
            .json()
            .await
            .map_err(|e| invalid_response(PROVIDER, e.to_string()))?;

        let text = message
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| invalid_response(PROVIDER, "no text content block"))?;

        Ok(LlmCompletion {
            text,
            tokens_used: message.usage.input_tokens.saturating_add(message.usage.output_tokens),
            input_tokens: message.usage.input_tokens,
            output_tokens: message.usage.output_tokens,
        })
    }
}
