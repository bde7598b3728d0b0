pub const CHUNK_TEXT_PLACEHOLDER: &str = "{chunk_text}";

/// A prompt with a `{chunk_text}` slot that is filled once per chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptTemplateError {
    #[error("prompt template is empty")]
    Empty,
    #[error("prompt template must contain the {{chunk_text}} placeholder")]
    MissingPlaceholder,
}

impl PromptTemplate {
    pub fn parse(template: impl Into<String>) -> Result<Self, PromptTemplateError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(PromptTemplateError::Empty);
        }
        if !template.contains(CHUNK_TEXT_PLACEHOLDER) {
            return Err(PromptTemplateError::MissingPlaceholder);
        }
        Ok(Self(template))
    }

    /// Literal substitution; braces elsewhere in the template are left alone.
    pub fn render(&self, chunk_text: &str) -> String {
        self.0.replace(CHUNK_TEXT_PLACEHOLDER, chunk_text)
    }

    /// The fixed text sent with every chunk.
    pub fn overhead_text(&self) -> String {
        self.0.replace(CHUNK_TEXT_PLACEHOLDER, "")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
