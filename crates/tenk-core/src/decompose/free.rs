use serde::Deserialize;
use tenk_llm::LlmError;
use tenk_llm::extractor::parse_lenient;

use super::{MAX_SUB_QUESTIONS, QuestionDecomposer, normalize_unique};

const SYSTEM_PROMPT: &str = "Return STRICT JSON ONLY: {\"sub_questions\": [\"...\", \"...\"]}. \
You break one financial research question into 5 to 10 focused sub-questions \
that can each be answered from a company's SEC filings (10-K/10-Q). \
Every sub-question must be self-contained: name the company it is about and the metric it asks for. \
Include a year or fiscal period only if the original question contains one. \
No numbering, no markdown, no explanations.";

#[derive(Deserialize)]
struct SubQuestions {
    #[serde(default)]
    sub_questions: Vec<Option<String>>,
}

pub(super) async fn decompose(
    decomposer: &QuestionDecomposer,
    question: &str,
) -> Result<Vec<String>, LlmError> {
    let reply = decomposer.ask_json(SYSTEM_PROMPT, question).await?;
    Ok(parse_sub_questions(&reply))
}

fn parse_sub_questions(reply: &str) -> Vec<String> {
    match parse_lenient::<SubQuestions>(reply) {
        Ok(parsed) => normalize_unique(parsed.sub_questions.into_iter().flatten(), MAX_SUB_QUESTIONS),
        Err(e) => {
            tracing::warn!("sub-question reply unparseable: {e}");
            Vec::new()
        }
    }
}
