//! Question decomposition: one user question in, focused sub-questions out.
//!
//! Two strategies share one entry point. [`DecomposeStrategy::Free`] asks the
//! model for the sub-questions directly. [`DecomposeStrategy::Template`]
//! extracts the companies, asks for five company-agnostic templates, and
//! expands every template for every company.

mod canned;
mod free;
mod template;

pub use canned::canned_questions;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tenk_llm::LlmError;
use tenk_llm::any::AnyProvider;
use tenk_llm::provider::{CompletionOptions, LlmProvider, Message};
use tenk_llm::sanitize::{collapse_whitespace, strip_fences, strip_tags};

/// Upper bound on sub-questions from free decomposition.
pub const MAX_SUB_QUESTIONS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecomposeStrategy {
    #[default]
    Free,
    Template,
}

impl DecomposeStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Template => "template",
        }
    }
}

impl std::fmt::Display for DecomposeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DecomposeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "template" => Ok(Self::Template),
            other => Err(format!("unknown decomposition strategy: {other}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecomposeError {
    /// The completion call itself failed. Unparseable replies are not errors.
    #[error("decomposition LLM call failed: {0}")]
    Upstream(#[from] LlmError),
}

pub struct QuestionDecomposer {
    provider: Arc<AnyProvider>,
    strategy: DecomposeStrategy,
    max_companies: usize,
    options: CompletionOptions,
}

impl QuestionDecomposer {
    #[must_use]
    pub fn new(provider: Arc<AnyProvider>, strategy: DecomposeStrategy) -> Self {
        Self {
            provider,
            strategy,
            max_companies: 4,
            options: CompletionOptions::new(0.0, 1.0, 800)
                .json()
                .with_timeout(Duration::from_secs(40)),
        }
    }

    #[must_use]
    pub fn with_max_companies(mut self, max: usize) -> Self {
        self.max_companies = max;
        self
    }

    /// Replace the completion options. The JSON response hint is always kept.
    #[must_use]
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options.json();
        self
    }

    #[must_use]
    pub fn strategy(&self) -> DecomposeStrategy {
        self.strategy
    }

    /// Decompose with the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns [`DecomposeError::Upstream`] if an LLM call fails or times out.
    pub async fn decompose(&self, question: &str) -> Result<Vec<String>, DecomposeError> {
        self.decompose_with(question, self.strategy).await
    }

    /// Decompose with an explicit strategy.
    ///
    /// Free decomposition may return an empty list when the reply cannot be
    /// parsed. Template expansion always returns at least `[question]`.
    ///
    /// # Errors
    ///
    /// Returns [`DecomposeError::Upstream`] if an LLM call fails or times out.
    pub async fn decompose_with(
        &self,
        question: &str,
        strategy: DecomposeStrategy,
    ) -> Result<Vec<String>, DecomposeError> {
        let questions = match strategy {
            DecomposeStrategy::Free => free::decompose(self, question).await?,
            DecomposeStrategy::Template => template::decompose(self, question).await?,
        };
        tracing::debug!(
            strategy = %strategy,
            count = questions.len(),
            "question decomposed"
        );
        Ok(questions)
    }

    /// One system + user exchange in JSON mode; tags and fences stripped.
    async fn ask_json(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let messages = [Message::system(system), Message::user(user)];
        let raw = complete_within(self.provider.as_ref(), &messages, &self.options).await?;
        Ok(strip_fences(&strip_tags(&raw)).trim().to_owned())
    }
}

/// `complete`, bounded by the per-call timeout when one is set.
pub(crate) async fn complete_within<P: LlmProvider>(
    provider: &P,
    messages: &[Message],
    options: &CompletionOptions,
) -> Result<String, LlmError> {
    match options.timeout {
        Some(limit) => tokio::time::timeout(limit, provider.complete(messages, options))
            .await
            .map_err(|_| {
                LlmError::Other(format!("LLM call timed out after {}s", limit.as_secs()))
            })?,
        None => provider.complete(messages, options).await,
    }
}

/// Whitespace-collapsed, non-empty, case-insensitively unique, first-seen order.
pub(crate) fn normalize_unique<I>(items: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| collapse_whitespace(&item))
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use tenk_llm::mock::MockProvider;

    use super::*;

    #[test]
    fn normalize_unique_dedups_case_insensitively_in_order() {
        let items = vec![
            "What is Apple's revenue?".to_owned(),
            "  what is   apple's revenue? ".to_owned(),
            String::new(),
            "What is Alphabet's revenue?".to_owned(),
        ];
        assert_eq!(
            normalize_unique(items, 10),
            vec!["What is Apple's revenue?", "What is Alphabet's revenue?"]
        );
    }

    #[test]
    fn normalize_unique_caps_after_dedup() {
        let items = (0..20).map(|i| format!("q{}", i % 12));
        assert_eq!(normalize_unique(items, 10).len(), 10);
    }

    #[test]
    fn strategy_parses_and_displays() {
        assert_eq!("template".parse::<DecomposeStrategy>().unwrap(), DecomposeStrategy::Template);
        assert_eq!("FREE".parse::<DecomposeStrategy>().unwrap(), DecomposeStrategy::Free);
        assert!("other".parse::<DecomposeStrategy>().is_err());
        assert_eq!(DecomposeStrategy::Template.to_string(), "template");
    }

    #[tokio::test]
    async fn upstream_failure_is_an_error() {
        let d = QuestionDecomposer::new(
            Arc::new(AnyProvider::Mock(MockProvider::failing())),
            DecomposeStrategy::Free,
        );
        assert!(matches!(
            d.decompose("Compare Apple and Google").await,
            Err(DecomposeError::Upstream(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let d = QuestionDecomposer::new(
            Arc::new(AnyProvider::Mock(MockProvider::default().with_delay(60_000))),
            DecomposeStrategy::Free,
        );
        let err = d.decompose("q").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
