#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request to {provider} failed with status {status}: {body}")]
    RequestFailure {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: &'static str },

    #[error("structured output parse failed: {0}")]
    StructuredParse(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// HTTP status of an upstream rejection, if this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailure { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
