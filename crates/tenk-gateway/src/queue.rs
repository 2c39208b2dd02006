use tokio::sync::oneshot;
use uuid::Uuid;

/// One `/get-html` call waiting for the workflow worker.
///
/// The worker answers on `reply` with the rendered HTML or an error message.
#[derive(Debug)]
pub struct DashboardRequest {
    pub id: Uuid,
    pub question: String,
    pub reply: oneshot::Sender<Result<String, String>>,
}

impl DashboardRequest {
    #[must_use]
    pub fn new(question: String) -> (Self, oneshot::Receiver<Result<String, String>>) {
        let (reply, rx) = oneshot::channel();
        let request = Self {
            id: Uuid::new_v4(),
            question,
            reply,
        };
        (request, rx)
    }

    /// Send the outcome back. A caller that already went away is logged.
    pub fn respond(self, outcome: Result<String, String>) {
        if self.reply.send(outcome).is_err() {
            tracing::debug!(request_id = %self.id, "dashboard caller went away before the reply");
        }
    }
}
