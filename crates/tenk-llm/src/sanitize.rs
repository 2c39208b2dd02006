//! Cleanup of incidental wrappers that chat models put around their payload.

use std::sync::LazyLock;

use regex::Regex;

static THINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").unwrap_or_else(|e| unreachable!("think regex: {e}"))
});
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json|txt|markdown|html)?").unwrap_or_else(|e| unreachable!("fence regex: {e}"))
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<.*?>").unwrap_or_else(|e| unreachable!("tag regex: {e}")));

/// Remove `<think>...</think>` reasoning blocks.
#[must_use]
pub fn strip_reasoning(text: &str) -> String {
    THINK_RE.replace_all(text, "").into_owned()
}

/// Remove code-fence markers, keeping the fenced content.
#[must_use]
pub fn strip_fences(text: &str) -> String {
    FENCE_RE.replace_all(text, "").into_owned()
}

/// Remove every angle-bracket tag. Only safe on replies that are expected to be JSON.
#[must_use]
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Reasoning blocks and fences stripped, surrounding whitespace trimmed.
#[must_use]
pub fn clean_completion(text: &str) -> String {
    strip_fences(&strip_reasoning(text)).trim().to_owned()
}

/// Collapse any whitespace run into a single space and trim.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
