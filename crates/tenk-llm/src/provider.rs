use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

pub type EmbedFuture = Pin<Box<dyn Future<Output = Result<Vec<f32>, LlmError>> + Send>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Structured-output hint forwarded as `response_format`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// Sampling and transport options for a single completion call.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub response_format: Option<ResponseFormat>,
    /// Overrides the client-wide request timeout when set.
    pub timeout: Option<Duration>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 1024,
            response_format: None,
            timeout: None,
        }
    }
}

impl CompletionOptions {
    #[must_use]
    pub fn new(temperature: f32, top_p: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            top_p,
            max_tokens,
            ..Self::default()
        }
    }

    /// Ask the backend for a JSON object reply.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.response_format = Some(ResponseFormat::JsonObject);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the model and return the sanitized assistant text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the backend answers with a
    /// non-2xx status, or the response carries no completion.
    fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::EmbedUnsupported`] when no embedding model is configured.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    fn supports_embeddings(&self) -> bool;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::system("be brief")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be brief"}"#);
    }

    #[test]
    fn response_format_serializes_as_tagged_object() {
        let json = serde_json::to_string(&ResponseFormat::JsonObject).unwrap();
        assert_eq!(json, r#"{"type":"json_object"}"#);
    }

    #[test]
    fn options_builder_chain() {
        let opts = CompletionOptions::new(0.0, 1.0, 800)
            .json()
            .with_timeout(Duration::from_secs(40));
        assert!(opts.temperature.abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 800);
        assert_eq!(opts.response_format, Some(ResponseFormat::JsonObject));
        assert_eq!(opts.timeout, Some(Duration::from_secs(40)));
    }

    #[test]
    fn default_options_have_no_format_hint() {
        let opts = CompletionOptions::default();
        assert!(opts.response_format.is_none());
        assert!(opts.timeout.is_none());
    }
}
