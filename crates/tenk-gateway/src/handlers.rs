use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::languages::{
    SUPPORTED_AUDIO_TYPES, SUPPORTED_LANGUAGES, is_supported_audio, primary_subtag,
    resolve_language,
};
use tenk_llm::stt::{Segment, TranscribeOptions, WordTiming};

use super::queue::DashboardRequest;
use super::server::AppState;

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    uptime_secs: u64,
}

#[derive(serde::Serialize)]
struct LanguagesResponse {
    languages: BTreeMap<&'static str, &'static str>,
}

#[derive(serde::Serialize)]
struct TranscribeResponse {
    text: String,
    filename: Option<String>,
    success: bool,
    language: Option<String>,
    duration_secs: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    words: Vec<WordTiming>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    segments: Vec<Segment>,
    file_info: FileInfo,
}

#[derive(serde::Serialize)]
struct FileInfo {
    filename: Option<String>,
    content_type: String,
    size_bytes: usize,
}

#[derive(serde::Deserialize)]
pub(crate) struct HtmlRequest {
    pub user_question: String,
}

#[derive(serde::Serialize)]
struct HtmlResponse {
    html: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "detail": message.into() }))).into_response()
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "whisper-api",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub(crate) async fn languages_handler() -> impl IntoResponse {
    Json(LanguagesResponse {
        languages: SUPPORTED_LANGUAGES.into_iter().collect(),
    })
}

struct Upload {
    content_type: Option<String>,
    filename: Option<String>,
    bytes: Vec<u8>,
}

pub(crate) async fn transcribe_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    let mut language = None;
    let mut word_timestamps = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error(e.status(), e.body_text()),
        };
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let content_type = field.content_type().map(str::to_owned);
                let filename = field.file_name().map(str::to_owned);
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(e) => return error(e.status(), e.body_text()),
                };
                upload = Some(Upload {
                    content_type,
                    filename,
                    bytes,
                });
            }
            Some("language") => match field.text().await {
                Ok(text) if !text.trim().is_empty() => language = Some(text.trim().to_owned()),
                Ok(_) => {}
                Err(e) => return error(e.status(), e.body_text()),
            },
            Some("word_timestamps" | "enable_word_time_offsets") => match field.text().await {
                Ok(text) => match parse_flag(&text) {
                    Some(flag) => word_timestamps = flag,
                    None => {
                        return error(
                            StatusCode::BAD_REQUEST,
                            format!("Invalid word_timestamps value: {}", text.trim()),
                        );
                    }
                },
                Err(e) => return error(e.status(), e.body_text()),
            },
            _ => {}
        }
    }

    let Some(upload) = upload else {
        return error(StatusCode::BAD_REQUEST, "No audio file provided");
    };

    let content_type = upload.content_type.as_deref().unwrap_or("none");
    if !is_supported_audio(content_type) {
        return error(
            StatusCode::BAD_REQUEST,
            format!("Unsupported file type: {content_type}. Supported types: {SUPPORTED_AUDIO_TYPES:?}"),
        );
    }

    let requested = language.or_else(|| state.default_language.clone());
    let code = match requested.as_deref() {
        None => None,
        Some(lang) => match resolve_language(lang) {
            Some(code) => Some(code),
            None => {
                let codes: Vec<&str> = SUPPORTED_LANGUAGES.iter().map(|(c, _)| *c).collect();
                return error(
                    StatusCode::BAD_REQUEST,
                    format!("Unsupported language code: {lang}. Supported languages: {codes:?}"),
                );
            }
        },
    };

    if upload.bytes.is_empty() {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Audio file is empty");
    }

    let Some(ref stt) = state.stt else {
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "speech-to-text backend is not configured",
        );
    };

    tracing::info!(
        filename = upload.filename.as_deref().unwrap_or("-"),
        bytes = upload.bytes.len(),
        language = code.unwrap_or("auto"),
        word_timestamps,
        "transcribing upload"
    );
    let options = TranscribeOptions {
        language: code.map(|c| primary_subtag(c).to_owned()),
        word_timestamps,
    };
    let file_info = FileInfo {
        filename: upload.filename.clone(),
        content_type: content_type.to_owned(),
        size_bytes: upload.bytes.len(),
    };
    match stt
        .transcribe(&upload.bytes, upload.filename.as_deref(), &options)
        .await
    {
        Ok(transcription) => Json(TranscribeResponse {
            text: transcription.text,
            filename: upload.filename,
            success: true,
            language: code.map(str::to_owned),
            duration_secs: transcription.duration_secs,
            words: transcription.words,
            segments: transcription.segments,
            file_info,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!("transcription failed: {e}");
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" | "off" => Some(false),
        "true" | "1" | "yes" | "on" => Some(true),
        _ => None,
    }
}

pub(crate) async fn get_html_handler(
    State(state): State<AppState>,
    Json(payload): Json<HtmlRequest>,
) -> Response {
    let question = payload.user_question.trim();
    if question.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "user_question must not be empty");
    }

    let (request, reply) = DashboardRequest::new(question.to_owned());
    let request_id = request.id;
    tracing::info!(%request_id, "dashboard requested");
    if state.dashboard_tx.send(request).await.is_err() {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "dashboard worker is not running");
    }

    match reply.await {
        Ok(Ok(html)) => Json(HtmlResponse { html }).into_response(),
        Ok(Err(message)) => {
            tracing::warn!(%request_id, "dashboard failed: {message}");
            detail(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
        Err(_) => detail(
            StatusCode::INTERNAL_SERVER_ERROR,
            "dashboard worker dropped the request",
        ),
    }
}
