mod anthropic_client;
mod http_response;
mod llm_client_factory;
mod ollama_client;
mod openai_compatible_client;

pub use anthropic_client::AnthropicClient;
pub use llm_client_factory::{HttpLlmClientFactory, resolve_base_url};
pub use ollama_client::OllamaClient;
pub use openai_compatible_client::OpenAiCompatibleClient;
