//! Request-time workflow: decompose, retrieve concurrently, render.

use std::sync::Arc;

use tenk_index::retriever::FilingRetriever;

use crate::coordinator::{AgentCoordinator, Retrieve};
use crate::dashboard::DashboardGenerator;
use crate::decompose::{DecomposeStrategy, QuestionDecomposer};
use crate::pipeline::builder::{Chain, Start};
use crate::pipeline::{
    Dashboard, DashboardStep, DecomposeStep, FanOutStep, Pipeline, Request, WorkflowError,
};

type Stages<R> = Pipeline<Chain<Chain<Start<DecomposeStep>, FanOutStep<R>>, DashboardStep>>;

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub title: String,
    pub fallback_to_canned: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            title: "Financial Dashboard".into(),
            fallback_to_canned: true,
        }
    }
}

pub struct Workflow<R = FilingRetriever> {
    stages: Stages<R>,
}

impl<R: Retrieve> Workflow<R> {
    #[must_use]
    pub fn new(
        decomposer: Arc<QuestionDecomposer>,
        coordinator: Arc<AgentCoordinator<R>>,
        generator: Arc<DashboardGenerator>,
        options: WorkflowOptions,
    ) -> Self {
        let stages = Pipeline::start(DecomposeStep::new(decomposer, options.fallback_to_canned))
            .step(FanOutStep::new(coordinator))
            .step(DashboardStep::new(generator, options.title));
        Self { stages }
    }

    /// Run one question with the decomposer's configured strategy.
    ///
    /// # Errors
    ///
    /// See [`Workflow::run_request`].
    pub async fn run(&self, question: &str) -> Result<Dashboard, WorkflowError> {
        self.run_request(Request::new(question)).await
    }

    /// # Errors
    ///
    /// See [`Workflow::run_request`].
    pub async fn run_with_strategy(
        &self,
        question: &str,
        strategy: DecomposeStrategy,
    ) -> Result<Dashboard, WorkflowError> {
        self.run_request(Request::new(question).with_strategy(strategy))
            .await
    }

    /// # Errors
    ///
    /// Fails on an empty question, on a decomposition failure when the canned
    /// fallback is disabled, or when retrieval is not ready or every worker
    /// fails. Dashboard rendering itself never fails.
    pub async fn run_request(&self, request: Request) -> Result<Dashboard, WorkflowError> {
        let dashboard = self.stages.run(request).await?;
        tracing::info!(
            sub_questions = dashboard.sub_questions.len(),
            failed = dashboard.failed.len(),
            html_len = dashboard.html.len(),
            "workflow complete"
        );
        Ok(dashboard)
    }
}
