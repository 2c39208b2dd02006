use std::future::Future;

use super::WorkflowError;

/// One stage of a request workflow. Stages are chained with
/// [`Pipeline`](super::Pipeline), the output of one feeding the next.
pub trait Step: Send + Sync {
    type Input: Send;
    type Output: Send;

    /// Short label used in stage timing logs.
    fn name(&self) -> &'static str;

    fn run(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = Result<Self::Output, WorkflowError>> + Send;
}
