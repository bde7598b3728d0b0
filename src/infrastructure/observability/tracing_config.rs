/// Configuration for tracing initialization.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
    /// Default filter directive, used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            environment: std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".to_string()),
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            level: "info".to_string(),
        }
    }
}

impl TracingConfig {
    pub fn filter_directive(&self) -> String {
        format!("{},chunk_analyst=debug,tower_http=debug", self.level)
    }
}
