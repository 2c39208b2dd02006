//! Error types for tenk-index.

/// Errors raised while listing, downloading, indexing or retrieving filings.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading or writing filing files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport error talking to the filing index or a filing host.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// LLM provider error (embedding).
    #[error("LLM error: {0}")]
    Llm(#[from] tenk_llm::LlmError),

    /// Vector store or ingestion failure.
    #[error("memory error: {0}")]
    Memory(#[from] tenk_memory::MemoryError),

    #[error("document error: {0}")]
    Document(#[from] tenk_memory::document::DocumentError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The filing index answered with a non-2xx status.
    #[error("filing index request failed with status {status}: {body}")]
    FilingIndex { status: u16, body: String },

    /// Store unreachable or collection missing.
    #[error("retrieval backend not ready: {0}")]
    NotReady(String),

    /// Integer conversion error.
    #[error("integer conversion failed: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

impl From<tenk_memory::VectorStoreError> for IndexError {
    fn from(e: tenk_memory::VectorStoreError) -> Self {
        Self::Memory(e.into())
    }
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
