use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::error::LlmError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscribeOptions {
    /// ISO-639-1 hint.
    pub language: Option<String>,
    /// Ask the backend for word and segment timings.
    pub word_timestamps: bool,
}

/// One recognized word with offsets in seconds from the start of the audio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f32,
    pub end: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f32,
    pub end: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Transcription {
    pub text: String,
    pub language: Option<String>,
    pub duration_secs: Option<f32>,
    /// Empty unless word timestamps were requested.
    pub words: Vec<WordTiming>,
    pub segments: Vec<Segment>,
}

/// Async trait for speech-to-text backends.
pub trait SpeechToText: Send + Sync {
    /// Transcribe audio bytes into text.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::TranscriptionFailed` if the backend rejects the request.
    fn transcribe(
        &self,
        audio: &[u8],
        filename: Option<&str>,
        options: &TranscribeOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Transcription, LlmError>> + Send + '_>>;
}
