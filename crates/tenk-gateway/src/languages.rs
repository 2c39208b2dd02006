/// Speech languages accepted by `/transcribe`, as BCP-47 code and display name.
pub const SUPPORTED_LANGUAGES: [(&str, &str); 20] = [
    ("en-US", "English (United States)"),
    ("en-GB", "English (United Kingdom)"),
    ("es-ES", "Spanish (Spain)"),
    ("es-US", "Spanish (United States)"),
    ("fr-FR", "French (France)"),
    ("de-DE", "German (Germany)"),
    ("it-IT", "Italian (Italy)"),
    ("pt-BR", "Portuguese (Brazil)"),
    ("ja-JP", "Japanese (Japan)"),
    ("ko-KR", "Korean (South Korea)"),
    ("zh-CN", "Chinese (Mandarin, Simplified)"),
    ("zh-TW", "Chinese (Mandarin, Traditional)"),
    ("ar-SA", "Arabic (Saudi Arabia)"),
    ("hi-IN", "Hindi (India)"),
    ("ru-RU", "Russian (Russia)"),
    ("nl-NL", "Dutch (Netherlands)"),
    ("sv-SE", "Swedish (Sweden)"),
    ("da-DK", "Danish (Denmark)"),
    ("no-NO", "Norwegian (Norway)"),
    ("fi-FI", "Finnish (Finland)"),
];

pub const SUPPORTED_AUDIO_TYPES: [&str; 10] = [
    "audio/wav",
    "audio/x-wav",
    "audio/flac",
    "audio/x-flac",
    "audio/mpeg",
    "audio/mp3",
    "audio/ogg",
    "audio/webm",
    "audio/amr",
    "audio/3gpp",
];

/// Map a requested language onto a supported code.
///
/// Full codes match case-insensitively. A bare primary subtag (`en`) resolves
/// to the first supported code in that language.
#[must_use]
pub fn resolve_language(requested: &str) -> Option<&'static str> {
    let requested = requested.trim();
    if requested.is_empty() {
        return None;
    }
    if let Some((code, _)) = SUPPORTED_LANGUAGES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(requested))
    {
        return Some(*code);
    }
    if requested.contains('-') {
        return None;
    }
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(code, _)| {
            code.split_once('-')
                .is_some_and(|(primary, _)| primary.eq_ignore_ascii_case(requested))
        })
        .map(|(code, _)| *code)
}

/// `audio/wav; codecs=1` and `AUDIO/WAV` both count as `audio/wav`.
pub(crate) fn is_supported_audio(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    SUPPORTED_AUDIO_TYPES.contains(&essence.as_str())
}

/// ISO-639-1 hint for the recognizer: the primary subtag of a supported code.
pub(crate) fn primary_subtag(code: &str) -> &str {
    code.split_once('-').map_or(code, |(primary, _)| primary)
}
