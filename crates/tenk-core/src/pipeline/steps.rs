//! The three request stages: decompose, fan out, render.

use std::sync::Arc;

use crate::coordinator::{AgentCoordinator, FanOutReport, Retrieve, WorkerFailure};
use crate::dashboard::DashboardGenerator;
use crate::decompose::{DecomposeStrategy, QuestionDecomposer, canned_questions};

use super::{Step, WorkflowError};

/// A user question entering the workflow.
#[derive(Debug, Clone)]
pub struct Request {
    pub question: String,
    /// Overrides the decomposer's configured strategy for this request.
    pub strategy: Option<DecomposeStrategy>,
}

impl Request {
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            strategy: None,
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: DecomposeStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Decomposition {
    pub question: String,
    pub sub_questions: Vec<String>,
    /// True when the canned question set replaced a failed LLM decomposition.
    pub canned: bool,
}

#[derive(Debug)]
pub struct Retrieved {
    pub question: String,
    pub sub_questions: Vec<String>,
    pub report: FanOutReport,
}

/// Final result of one workflow run.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub question: String,
    pub sub_questions: Vec<String>,
    pub context: String,
    pub failed: Vec<WorkerFailure>,
    pub html: String,
}

pub struct DecomposeStep {
    decomposer: Arc<QuestionDecomposer>,
    fallback_to_canned: bool,
}

impl DecomposeStep {
    #[must_use]
    pub fn new(decomposer: Arc<QuestionDecomposer>, fallback_to_canned: bool) -> Self {
        Self {
            decomposer,
            fallback_to_canned,
        }
    }
}

impl Step for DecomposeStep {
    type Input = Request;
    type Output = Decomposition;

    fn name(&self) -> &'static str {
        "decompose"
    }

    async fn run(&self, input: Request) -> Result<Decomposition, WorkflowError> {
        let question = input.question.trim().to_owned();
        if question.is_empty() {
            return Err(WorkflowError::EmptyQuestion);
        }
        let strategy = input.strategy.unwrap_or(self.decomposer.strategy());

        let (sub_questions, canned) = match self.decomposer.decompose_with(&question, strategy).await {
            Ok(qs) if qs.is_empty() => {
                tracing::warn!("decomposition produced nothing, using the question itself");
                (vec![question.clone()], false)
            }
            Ok(qs) => (qs, false),
            Err(e) if self.fallback_to_canned => {
                tracing::warn!("decomposition failed, using canned questions: {e}");
                (canned_questions(&question), true)
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(count = sub_questions.len(), strategy = %strategy, canned, "sub-questions ready");
        Ok(Decomposition {
            question,
            sub_questions,
            canned,
        })
    }
}

pub struct FanOutStep<R> {
    coordinator: Arc<AgentCoordinator<R>>,
}

impl<R> FanOutStep<R> {
    #[must_use]
    pub fn new(coordinator: Arc<AgentCoordinator<R>>) -> Self {
        Self { coordinator }
    }
}

impl<R: Retrieve> Step for FanOutStep<R> {
    type Input = Decomposition;
    type Output = Retrieved;

    fn name(&self) -> &'static str {
        "fan_out"
    }

    async fn run(&self, input: Decomposition) -> Result<Retrieved, WorkflowError> {
        let report = self.coordinator.fan_out(&input.sub_questions).await?;
        Ok(Retrieved {
            question: input.question,
            sub_questions: input.sub_questions,
            report,
        })
    }
}

pub struct DashboardStep {
    generator: Arc<DashboardGenerator>,
    title: String,
}

impl DashboardStep {
    #[must_use]
    pub fn new(generator: Arc<DashboardGenerator>, title: impl Into<String>) -> Self {
        Self {
            generator,
            title: title.into(),
        }
    }
}

impl Step for DashboardStep {
    type Input = Retrieved;
    type Output = Dashboard;

    fn name(&self) -> &'static str {
        "dashboard"
    }

    async fn run(&self, input: Retrieved) -> Result<Dashboard, WorkflowError> {
        let context = input.report.aggregated_context();
        let html = self.generator.render(&context, &self.title).await;
        Ok(Dashboard {
            question: input.question,
            sub_questions: input.sub_questions,
            context,
            failed: input.report.failed,
            html,
        })
    }
}
