use std::fmt;
use std::str::FromStr;

/// The closed set of LLM backends a job can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    OpenAi,
    OpenWebUi,
    OpenRouter,
    Perplexity,
    Anthropic,
    Ollama,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "unsupported LLM provider: {0}. Supported providers: openai, openwebui, openrouter, perplexity, anthropic, ollama"
)]
pub struct UnknownProvider(pub String);

impl LlmProvider {
    pub const ALL: [LlmProvider; 6] = [
        LlmProvider::OpenAi,
        LlmProvider::OpenWebUi,
        LlmProvider::OpenRouter,
        LlmProvider::Perplexity,
        LlmProvider::Anthropic,
        LlmProvider::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::OpenWebUi => "openwebui",
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::Perplexity => "perplexity",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Ollama => "ollama",
        }
    }

    /// Providers speaking the `/chat/completions` dialect.
    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            LlmProvider::OpenAi
                | LlmProvider::OpenWebUi
                | LlmProvider::OpenRouter
                | LlmProvider::Perplexity
        )
    }

    /// Self-hosted inference with no per-token billing.
    pub fn is_local(&self) -> bool {
        matches!(self, LlmProvider::Ollama)
    }

    pub fn requires_api_key(&self) -> bool {
        !self.is_local()
    }

    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenAi => Some("https://api.openai.com/v1"),
            LlmProvider::OpenRouter => Some("https://openrouter.ai/api/v1"),
            LlmProvider::Perplexity => Some("https://api.perplexity.ai"),
            LlmProvider::Anthropic => Some("https://api.anthropic.com"),
            LlmProvider::Ollama => Some("http://localhost:11434"),
            LlmProvider::OpenWebUi => None,
        }
    }
}

impl FromStr for LlmProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        LlmProvider::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
