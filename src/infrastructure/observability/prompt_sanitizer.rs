const MAX_VISIBLE_CHARS: usize = 100;

const SECRET_PREFIXES: [&str; 6] = [
    "Bearer ",
    "x-api-key: ",
    "api_key=",
    "password=",
    "secret=",
    "token=",
];

/// Shortens prompt text for debug logs and masks anything that looks like a credential.
pub fn sanitize_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();

    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let total_chars = trimmed.chars().count();
    let visible = if total_chars > MAX_VISIBLE_CHARS {
        let head: String = trimmed.chars().take(MAX_VISIBLE_CHARS).collect();
        format!("{head}... ({total_chars} chars total)")
    } else {
        trimmed.to_string()
    };

    redact_secrets(&visible)
}

fn redact_secrets(text: &str) -> String {
    let mut result = text.to_string();
    for prefix in SECRET_PREFIXES {
        result = redact_after(&result, prefix);
    }
    result
}

/// Replaces the value following every occurrence of `prefix`.
fn redact_after(text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find(prefix) {
        let value_start = idx + prefix.len();
        out.push_str(&rest[..value_start]);
        out.push_str("[REDACTED]");

        let value = &rest[value_start..];
        let value_end = value
            .find(|c: char| c.is_whitespace() || matches!(c, '&' | '"' | '\''))
            .unwrap_or(value.len());
        rest = &value[value_end..];
    }

    out.push_str(rest);
    out
}
