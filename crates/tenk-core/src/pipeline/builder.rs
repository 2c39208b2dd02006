use std::future::Future;
use std::time::Instant;

use super::WorkflowError;
use super::step::Step;

pub trait Runnable: Send + Sync {
    type Input: Send;
    type Output: Send;

    fn run(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = Result<Self::Output, WorkflowError>> + Send;
}

async fn timed<S: Step>(step: &S, input: S::Input) -> Result<S::Output, WorkflowError> {
    let started = Instant::now();
    let result = step.run(input).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &result {
        Ok(_) => tracing::debug!(step = step.name(), elapsed_ms, "stage complete"),
        Err(e) => tracing::warn!(step = step.name(), elapsed_ms, "stage failed: {e}"),
    }
    result
}

pub struct Start<S>(S);

impl<S: Step> Runnable for Start<S> {
    type Input = S::Input;
    type Output = S::Output;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, WorkflowError> {
        timed(&self.0, input).await
    }
}

pub struct Chain<Prev, Current> {
    prev: Prev,
    current: Current,
}

impl<Prev, Current> Runnable for Chain<Prev, Current>
where
    Prev: Runnable,
    Current: Step<Input = Prev::Output>,
{
    type Input = Prev::Input;
    type Output = Current::Output;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, WorkflowError> {
        let intermediate = self.prev.run(input).await?;
        timed(&self.current, intermediate).await
    }
}

/// Statically typed stage chain: `Pipeline::start(a).step(b).step(c)`.
pub struct Pipeline<S> {
    steps: S,
}

impl Pipeline<()> {
    #[must_use]
    pub fn start<S: Step>(step: S) -> Pipeline<Start<S>> {
        Pipeline { steps: Start(step) }
    }
}

impl<S> Pipeline<S> {
    #[must_use]
    pub fn step<T: Step>(self, step: T) -> Pipeline<Chain<S, T>> {
        Pipeline {
            steps: Chain {
                prev: self.steps,
                current: step,
            },
        }
    }
}

impl<S: Runnable> Pipeline<S> {
    /// # Errors
    ///
    /// Returns the first [`WorkflowError`] raised by a stage; later stages do not run.
    pub async fn run(&self, input: S::Input) -> Result<S::Output, WorkflowError> {
        self.steps.run(input).await
    }
}
