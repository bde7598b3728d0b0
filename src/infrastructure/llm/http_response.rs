use reqwest::{Response, StatusCode};

use crate::application::ports::LlmClientError;
use crate::domain::LlmProvider;

/// Fallback when a provider omits usage figures.
const CHARS_PER_TOKEN_ESTIMATE: usize = 4;

pub(crate) fn send_error(provider: LlmProvider, e: reqwest::Error) -> LlmClientError {
    LlmClientError::ApiRequestFailed {
        provider,
        message: e.to_string(),
    }
}

/// Maps non-success statuses to errors, keeping the body for diagnosis.
pub(crate) async fn ensure_success(
    provider: LlmProvider,
    response: Response,
) -> Result<Response, LlmClientError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmClientError::RateLimited { provider });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmClientError::ApiRequestFailed {
            provider,
            message: format!("HTTP {}: {}", status, body),
        });
    }

    Ok(response)
}

pub(crate) fn invalid_response(provider: LlmProvider, message: impl Into<String>) -> LlmClientError {
    LlmClientError::InvalidResponse {
        provider,
        message: message.into(),
    }
}

pub(crate) fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / CHARS_PER_TOKEN_ESTIMATE) as u64
}
