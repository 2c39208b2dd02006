use std::future::Future;
use std::pin::Pin;

use crate::error::LlmError;
use crate::stt::{Segment, SpeechToText, TranscribeOptions, Transcription, WordTiming};

/// OpenAI-compatible `/audio/transcriptions` client.
pub struct WhisperProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl WhisperProvider {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

impl std::fmt::Debug for WhisperProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f32>,
    #[serde(default)]
    words: Vec<WhisperWord>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(serde::Deserialize)]
struct WhisperWord {
    word: String,
    start: f32,
    end: f32,
}

#[derive(serde::Deserialize)]
struct WhisperSegment {
    text: String,
    start: f32,
    end: f32,
}

impl SpeechToText for WhisperProvider {
    fn transcribe(
        &self,
        audio: &[u8],
        filename: Option<&str>,
        options: &TranscribeOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Transcription, LlmError>> + Send + '_>> {
        let audio = audio.to_vec();
        let fname = filename.unwrap_or("audio.wav").to_owned();
        let TranscribeOptions {
            language,
            word_timestamps,
        } = options.clone();
        Box::pin(async move {
            let part = reqwest::multipart::Part::bytes(audio)
                .file_name(fname)
                .mime_str("application/octet-stream")
                .map_err(|e| LlmError::TranscriptionFailed(e.to_string()))?;

            let response_format = if word_timestamps {
                "verbose_json"
            } else {
                "json"
            };
            let mut form = reqwest::multipart::Form::new()
                .text("model", self.model.clone())
                .text("response_format", response_format)
                .part("file", part);
            if word_timestamps {
                form = form
                    .text("timestamp_granularities[]", "word")
                    .text("timestamp_granularities[]", "segment");
            }
            if let Some(ref lang) = language {
                form = form.text("language", lang.clone());
            }

            let url = format!(
                "{}/audio/transcriptions",
                self.base_url.trim_end_matches('/')
            );
            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .multipart(form)
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let mut body = resp.text().await.unwrap_or_default();
                body.truncate(500);
                return Err(LlmError::TranscriptionFailed(format!("{status}: {body}")));
            }

            let parsed: WhisperResponse = resp.json().await?;
            tracing::debug!(
                chars = parsed.text.len(),
                words = parsed.words.len(),
                "transcription complete"
            );
            Ok(Transcription {
                text: parsed.text,
                language: parsed.language.or(language),
                duration_secs: parsed.duration,
                words: parsed
                    .words
                    .into_iter()
                    .map(|w| WordTiming {
                        word: w.word,
                        start: w.start,
                        end: w.end,
                    })
                    .collect(),
                segments: parsed
                    .segments
                    .into_iter()
                    .map(|s| Segment {
                        text: s.text.trim().to_owned(),
                        start: s.start,
                        end: s.end,
                    })
                    .collect(),
            })
        })
    }
}
