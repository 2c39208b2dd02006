use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tenk_llm::LlmError;
use tenk_llm::extractor::parse_lenient;

use super::{QuestionDecomposer, normalize_unique};

/// Placeholder each template carries where the company name belongs.
const COMPANY_TOKEN: &str = "COMPANY_TOKEN";

const TEMPLATE_COUNT: usize = 5;

static NUMBERING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\.\s*").unwrap_or_else(|e| unreachable!("numbering regex: {e}"))
});

const TEMPLATES_SYSTEM_PROMPT: &str = "Return STRICT JSON ONLY: {\"templates\":[\"...\",\"...\",\"...\",\"...\",\"...\"]}. \
Generate five concise, filings-answerable questions (10-K/10-Q). \
Each MUST include the literal token COMPANY_TOKEN where the company name belongs, \
prefer possessive phrasing (e.g., COMPANY_TOKEN's ...). \
Avoid comparisons, explanations, chart names, or markdown. No numbering. \
Prefer explicit time scopes (e.g., last 8 quarters, last 5 fiscal years, most recent fiscal year).";

#[derive(Deserialize)]
struct Companies {
    #[serde(default)]
    companies: Vec<Option<String>>,
}

#[derive(Deserialize)]
struct Templates {
    #[serde(default)]
    templates: Vec<Option<String>>,
}

pub(super) async fn decompose(
    decomposer: &QuestionDecomposer,
    question: &str,
) -> Result<Vec<String>, LlmError> {
    let companies = extract_companies(decomposer, question).await?;
    let templates = canonical_templates(decomposer, question).await?;
    tracing::debug!(
        companies = companies.len(),
        templates = templates.len(),
        "expanding templates"
    );

    let questions = expand(&templates, &companies);
    if questions.is_empty() {
        return Ok(vec![question.to_owned()]);
    }
    Ok(questions)
}

async fn extract_companies(
    decomposer: &QuestionDecomposer,
    question: &str,
) -> Result<Vec<String>, LlmError> {
    let max = decomposer.max_companies;
    let system = format!(
        "Return STRICT JSON ONLY: {{\"companies\": [\"...\", \"...\"]}}. \
         Extract up to {max} PUBLIC company names explicitly or implicitly mentioned. \
         Map brands to canonical parents (e.g., Google -> Alphabet). No extra text."
    );
    let reply = decomposer.ask_json(&system, question).await?;
    Ok(parse_companies(&reply, max))
}

async fn canonical_templates(
    decomposer: &QuestionDecomposer,
    question: &str,
) -> Result<Vec<String>, LlmError> {
    let user = format!(
        "Produce the 5 canonical templates (they will be used identically for each company). \
         Request: {question}"
    );
    let reply = decomposer.ask_json(TEMPLATES_SYSTEM_PROMPT, &user).await?;
    Ok(parse_templates(&reply))
}

fn parse_companies(reply: &str, max: usize) -> Vec<String> {
    match parse_lenient::<Companies>(reply) {
        Ok(parsed) => normalize_unique(parsed.companies.into_iter().flatten(), max),
        Err(e) => {
            tracing::warn!("company list unparseable: {e}");
            Vec::new()
        }
    }
}

fn parse_templates(reply: &str) -> Vec<String> {
    let parsed = match parse_lenient::<Templates>(reply) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("template list unparseable: {e}");
            return Vec::new();
        }
    };
    parsed
        .templates
        .into_iter()
        .flatten()
        .map(|t| {
            let unnumbered = NUMBERING_RE.replace(&t, "");
            unnumbered.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|t| !t.is_empty())
        .take(TEMPLATE_COUNT)
        .collect()
}

/// Template-major expansion: every company for the first template, then the next.
fn expand(templates: &[String], companies: &[String]) -> Vec<String> {
    if companies.is_empty() {
        let stripped = templates.iter().map(|t| {
            t.replace(&format!("{COMPANY_TOKEN} "), "")
                .replace(COMPANY_TOKEN, "")
                .trim()
                .to_owned()
        });
        return normalize_unique(stripped, usize::MAX);
    }

    let expanded = templates
        .iter()
        .flat_map(|t| companies.iter().map(move |c| t.replace(COMPANY_TOKEN, c)));
    normalize_unique(expanded, usize::MAX)
}
