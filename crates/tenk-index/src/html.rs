//! Filing HTML to plain text.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .unwrap_or_else(|e| unreachable!("script/style regex: {e}"))
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap_or_else(|e| unreachable!("tag regex: {e}")));
static UNSAFE_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9._ -]+").unwrap_or_else(|e| unreachable!("filename regex: {e}"))
});

const MAX_FILENAME_CHARS: usize = 150;

/// Visible text of an HTML document.
///
/// `script` and `style` elements are dropped. Every line is trimmed and split
/// on double spaces; the non-empty pieces are joined with `\n`.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let stripped = SCRIPT_STYLE_RE.replace_all(html, "");
    let raw = extract_text(&stripped);
    normalize_lines(&raw)
}

fn extract_text(html: &str) -> String {
    let soup = scrape_core::Soup::parse(html);
    match soup.find_all("body") {
        Ok(tags) if !tags.is_empty() => tags.iter().map(|t| t.text()).collect(),
        _ => TAG_RE.replace_all(html, "").into_owned(),
    }
}

fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Company name reduced to a portable file name.
#[must_use]
pub fn safe_filename(name: &str) -> String {
    UNSAFE_FILENAME_RE
        .replace_all(name, "_")
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_script_and_style_content() {
        let html = "<html><head><style>body { color: red; }</style></head>\
                    <body><p>Total net sales</p>\n<script>var secret = 1;</script></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Total net sales"));
        assert!(!text.contains("color"));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn splits_on_double_spaces_and_trims_lines() {
        let html = "<html><body><p>  Revenue  $391,035  </p>\n\n<p>Net income</p></body></html>";
        let text = html_to_text(html);
        assert_eq!(text, "Revenue\n$391,035\nNet income");
    }

    #[test]
    fn script_regex_is_case_insensitive() {
        let html = "<body>before<SCRIPT type=\"text/javascript\">alert(1)</SCRIPT>\nafter</body>";
        let text = html_to_text(html);
        assert!(!text.contains("alert"));
        assert!(text.contains("before"));
        assert!(text.contains("after"));
    }

    #[test]
    fn normalize_lines_drops_blank_pieces() {
        assert_eq!(normalize_lines("  a  \n\n   \nb    c"), "a\nb\nc");
    }

    #[test]
    fn empty_html_gives_empty_text() {
        assert_eq!(html_to_text(""), "");
    }

    #[test]
    fn safe_filename_replaces_runs() {
        assert_eq!(safe_filename("AT&T Inc."), "AT_T Inc.");
        assert_eq!(safe_filename("Alphabet Inc. / Google"), "Alphabet Inc. _ Google");
        assert_eq!(safe_filename("Apple Inc."), "Apple Inc.");
    }

    #[test]
    fn safe_filename_truncates_to_150_chars() {
        let long = "A".repeat(400);
        assert_eq!(safe_filename(&long).len(), 150);
    }
}
