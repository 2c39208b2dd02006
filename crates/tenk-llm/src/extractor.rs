use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::LlmError;
use crate::provider::{CompletionOptions, LlmProvider, Message};
use crate::sanitize::{strip_fences, strip_tags};

static OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap_or_else(|e| unreachable!("object regex: {e}")));

/// Parse `text` as JSON, falling back to the outermost `{...}` span.
///
/// # Errors
///
/// Returns [`LlmError::StructuredParse`] if neither the whole text nor the
/// extracted object deserializes into `T`.
pub fn parse_lenient<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let direct = match serde_json::from_str::<T>(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    let Some(m) = OBJECT_RE.find(text) else {
        return Err(LlmError::StructuredParse(format!(
            "no JSON object in reply: {direct}"
        )));
    };
    serde_json::from_str::<T>(m.as_str())
        .map_err(|e| LlmError::StructuredParse(format!("extracted object: {e}")))
}

/// One-shot structured query: system preamble, user input, JSON reply.
pub struct Extractor<'a, P: LlmProvider> {
    provider: &'a P,
    preamble: Option<String>,
    options: CompletionOptions,
}

impl<'a, P: LlmProvider> Extractor<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            preamble: None,
            options: CompletionOptions::default().json(),
        }
    }

    #[must_use]
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    /// Replace the completion options. The JSON response hint is always kept.
    #[must_use]
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options.json();
        self
    }

    /// # Errors
    ///
    /// Returns an error if the provider fails or the reply cannot be parsed.
    pub async fn extract<T>(&self, input: &str) -> Result<T, LlmError>
    where
        T: DeserializeOwned,
    {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref preamble) = self.preamble {
            messages.push(Message::system(preamble.clone()));
        }
        messages.push(Message::user(input));
        let raw = self.provider.complete(&messages, &self.options).await?;
        let cleaned = strip_fences(&strip_tags(&raw));
        parse_lenient(cleaned.trim())
    }
}
