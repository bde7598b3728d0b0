use std::time::Duration;

use chunk_analyst::application::ports::{LlmClientError, LlmClientFactory, LlmClientSpec};
use chunk_analyst::domain::LlmProvider;
use chunk_analyst::infrastructure::llm::{HttpLlmClientFactory, resolve_base_url};

fn factory() -> HttpLlmClientFactory {
    HttpLlmClientFactory::new(Duration::from_secs(5)).unwrap()
}

fn spec(provider: LlmProvider, api_key: Option<&str>, base_url: Option<&str>) -> LlmClientSpec {
    LlmClientSpec {
        provider,
        model: "some-model".to_string(),
        api_key: api_key.map(String::from),
        base_url: base_url.map(String::from),
    }
}

#[test]
fn given_no_custom_url_when_resolving_then_provider_default_is_used() {
    assert_eq!(
        resolve_base_url(LlmProvider::OpenRouter, None).unwrap(),
        "https://openrouter.ai/api/v1"
    );
    assert_eq!(
        resolve_base_url(LlmProvider::Ollama, Some("  ")).unwrap(),
        "http://localhost:11434"
    );
}

#[test]
fn given_custom_url_with_trailing_slash_when_resolving_then_slash_is_dropped() {
    assert_eq!(
        resolve_base_url(LlmProvider::OpenAi, Some("http://proxy.local/v1/")).unwrap(),
        "http://proxy.local/v1"
    );
}

#[test]
fn given_openwebui_url_when_resolving_then_api_suffix_is_appended_once() {
    assert_eq!(
        resolve_base_url(LlmProvider::OpenWebUi, Some("http://webui:3000")).unwrap(),
        "http://webui:3000/api"
    );
    assert_eq!(
        resolve_base_url(LlmProvider::OpenWebUi, Some("http://webui:3000/api/")).unwrap(),
        "http://webui:3000/api"
    );
}

#[test]
fn given_openwebui_without_url_when_resolving_then_invalid_configuration() {
    let err = resolve_base_url(LlmProvider::OpenWebUi, None).unwrap_err();

    assert!(matches!(
        err,
        LlmClientError::InvalidConfiguration {
            provider: LlmProvider::OpenWebUi,
            ..
        }
    ));
}

#[test]
fn given_keyed_provider_without_key_when_creating_then_missing_api_key() {
    for provider in [
        LlmProvider::OpenAi,
        LlmProvider::OpenRouter,
        LlmProvider::Perplexity,
        LlmProvider::Anthropic,
    ] {
        let err = factory().create(&spec(provider, None, None)).err();
        assert!(
            matches!(err, Some(LlmClientError::MissingApiKey(p)) if p == provider),
            "{provider} accepted a missing key"
        );
    }

    let blank = factory()
        .create(&spec(LlmProvider::OpenAi, Some("   "), None))
        .err();
    assert!(matches!(blank, Some(LlmClientError::MissingApiKey(_))));
}

#[test]
fn given_ollama_without_key_when_creating_then_client_is_built() {
    assert!(factory().create(&spec(LlmProvider::Ollama, None, None)).is_ok());
}

#[test]
fn given_keyed_providers_with_key_when_creating_then_clients_are_built() {
    assert!(
        factory()
            .create(&spec(LlmProvider::Anthropic, Some("key"), None))
            .is_ok()
    );
    assert!(
        factory()
            .create(&spec(
                LlmProvider::OpenWebUi,
                Some("key"),
                Some("http://webui:3000")
            ))
            .is_ok()
    );
}

#[test]
fn given_spec_with_key_when_debug_printed_then_key_is_redacted() {
    let printed = format!("{:?}", spec(LlmProvider::OpenAi, Some("sk-secret"), None));

    assert!(printed.contains("[REDACTED]"));
    assert!(!printed.contains("sk-secret"));
}
