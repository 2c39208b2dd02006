pub mod builder;
pub mod step;
pub mod steps;

pub use builder::Pipeline;
pub use step::Step;
pub use steps::{
    Dashboard, DashboardStep, DecomposeStep, Decomposition, FanOutStep, Request, Retrieved,
};

use crate::coordinator::CoordinatorError;
use crate::decompose::DecomposeError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error(transparent)]
    Decompose(#[from] DecomposeError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("{0}")]
    Custom(String),
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tenk_llm::any::AnyProvider;
    use tenk_llm::mock::MockProvider;

    use super::*;
    use crate::decompose::{DecomposeStrategy, QuestionDecomposer};

    struct Append(&'static str);

    impl Step for Append {
        type Input = String;
        type Output = String;

        fn name(&self) -> &'static str {
            "append"
        }

        async fn run(&self, input: String) -> Result<String, WorkflowError> {
            Ok(format!("{input}{}", self.0))
        }
    }

    struct Count;

    impl Step for Count {
        type Input = String;
        type Output = usize;

        fn name(&self) -> &'static str {
            "count"
        }

        async fn run(&self, input: String) -> Result<usize, WorkflowError> {
            Ok(input.split_whitespace().count())
        }
    }

    struct Fail;

    impl Step for Fail {
        type Input = String;
        type Output = String;

        fn name(&self) -> &'static str {
            "fail"
        }

        async fn run(&self, _input: String) -> Result<String, WorkflowError> {
            Err(WorkflowError::Custom("boom".into()))
        }
    }

    fn decompose_step(mock: MockProvider, fallback: bool) -> DecomposeStep {
        let decomposer = QuestionDecomposer::new(
            Arc::new(AnyProvider::Mock(mock)),
            DecomposeStrategy::Free,
        );
        DecomposeStep::new(Arc::new(decomposer), fallback)
    }

    #[tokio::test]
    async fn chains_heterogeneous_stages() {
        let n = Pipeline::start(Append(" revenue"))
            .step(Append(" growth"))
            .step(Count)
            .run("Apple".into())
            .await
            .unwrap();
        assert_eq!(n, 3);
    }

    #[tokio::test]
    async fn first_error_stops_the_chain() {
        let err = Pipeline::start(Append("x"))
            .step(Fail)
            .step(Count)
            .run(String::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let step = decompose_step(MockProvider::default(), true);
        let err = Pipeline::start(step).run(Request::new("   ")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyQuestion));
    }

    #[tokio::test]
    async fn upstream_failure_uses_canned_questions() {
        let step = decompose_step(MockProvider::failing(), true);
        let out = Pipeline::start(step)
            .run(Request::new("Compare Apple and Google"))
            .await
            .unwrap();
        assert!(out.canned);
        assert_eq!(out.sub_questions.len(), 10);
        assert!(out.sub_questions[0].contains("Apple"));
    }

    #[tokio::test]
    async fn upstream_failure_without_fallback_is_an_error() {
        let step = decompose_step(MockProvider::failing(), false);
        let err = Pipeline::start(step).run(Request::new("q")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Decompose(_)));
    }

    #[tokio::test]
    async fn empty_decomposition_falls_back_to_the_question() {
        let step = decompose_step(MockProvider::with_responses(vec!["no json".into()]), true);
        let out = Pipeline::start(step)
            .run(Request::new("  What did Tesla earn?  "))
            .await
            .unwrap();
        assert!(!out.canned);
        assert_eq!(out.sub_questions, vec!["What did Tesla earn?"]);
    }

    #[tokio::test]
    async fn request_strategy_overrides_default() {
        let mock = MockProvider::with_responses(vec![
            r#"{"companies": ["Apple"]}"#.into(),
            r#"{"templates": ["What is COMPANY_TOKEN's revenue?"]}"#.into(),
        ]);
        let step = decompose_step(mock.clone(), false);
        let out = Pipeline::start(step)
            .run(Request::new("Apple revenue").with_strategy(DecomposeStrategy::Template))
            .await
            .unwrap();
        assert_eq!(out.sub_questions, vec!["What is Apple's revenue?"]);
        assert_eq!(mock.recorded_calls().len(), 2);
    }
}
