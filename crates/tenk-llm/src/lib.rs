//! LLM client abstraction: chat completions, embeddings, and speech-to-text.

pub mod any;
pub mod error;
pub mod extractor;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;
pub mod sanitize;
pub mod stt;
#[cfg(feature = "stt")]
pub mod whisper;

pub use error::LlmError;
pub use provider::{CompletionOptions, LlmProvider, Message, Role};
