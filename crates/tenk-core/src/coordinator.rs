//! Concurrent retrieval fan-out with ordered fan-in.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tenk_index::IndexError;
use tenk_index::retriever::{FilingRetriever, RetrievalResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

/// The retrieval side of the coordinator.
pub trait Retrieve: Send + Sync + 'static {
    /// Resolves once the backing store can answer queries.
    fn ready(&self) -> impl Future<Output = Result<(), IndexError>> + Send;

    fn retrieve(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<RetrievalResult, IndexError>> + Send;
}

impl Retrieve for FilingRetriever {
    async fn ready(&self) -> Result<(), IndexError> {
        FilingRetriever::ready(self).await
    }

    async fn retrieve(&self, query: &str) -> Result<RetrievalResult, IndexError> {
        FilingRetriever::retrieve(self, query).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("retrieval backend not ready: {0}")]
    NotReady(String),

    #[error("all {0} retrieval workers failed")]
    AllWorkersFailed(usize),
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub max_concurrency: usize,
    pub worker_timeout: Duration,
    pub readiness_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            worker_timeout: Duration::from_secs(60),
            readiness_timeout: Duration::from_secs(15),
        }
    }
}

/// A sub-question whose retrieval produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub index: usize,
    pub request_id: Uuid,
    pub query: String,
    pub reason: String,
}

/// Outcome of one fan-out: successes in sub-question order, then failures.
#[derive(Debug, Default)]
pub struct FanOutReport {
    pub results: Vec<RetrievalResult>,
    pub failed: Vec<WorkerFailure>,
}

impl FanOutReport {
    /// Every rendered result, newline-joined, in sub-question order.
    #[must_use]
    pub fn aggregated_context(&self) -> String {
        self.results
            .iter()
            .map(RetrievalResult::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.results.len() + self.failed.len()
    }
}

pub struct AgentCoordinator<R> {
    retriever: Arc<R>,
    config: CoordinatorConfig,
}

impl<R: Retrieve> AgentCoordinator<R> {
    #[must_use]
    pub fn new(retriever: Arc<R>, config: CoordinatorConfig) -> Self {
        Self { retriever, config }
    }

    /// Await the readiness handshake, then retrieve every sub-question.
    ///
    /// A worker that fails, panics or exceeds the worker timeout is recorded
    /// in [`FanOutReport::failed`]; the rest are still aggregated.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotReady`] if the handshake fails or times
    /// out, and [`CoordinatorError::AllWorkersFailed`] if no worker succeeds.
    pub async fn fan_out(&self, questions: &[String]) -> Result<FanOutReport, CoordinatorError> {
        self.await_ready().await?;
        if questions.is_empty() {
            return Ok(FanOutReport::default());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let worker_timeout = self.config.worker_timeout;
        let mut join_set = JoinSet::new();
        let mut request_ids = Vec::with_capacity(questions.len());

        for (index, query) in questions.iter().enumerate() {
            let request_id = Uuid::new_v4();
            request_ids.push(request_id);
            let retriever = Arc::clone(&self.retriever);
            let semaphore = Arc::clone(&semaphore);
            let query = query.clone();

            join_set.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        tracing::debug!(index, %request_id, query = %query, "retrieval dispatched");
                        match tokio::time::timeout(worker_timeout, retriever.retrieve(&query)).await {
                            Ok(Ok(result)) => Ok(result),
                            Ok(Err(e)) => Err(format!("{e:#}")),
                            Err(_) => Err(format!(
                                "timed out after {}s",
                                worker_timeout.as_secs_f64()
                            )),
                        }
                    }
                    Err(e) => Err(format!("semaphore closed: {e}")),
                };
                (index, outcome)
            });
        }

        let total = questions.len();
        let mut slots: Vec<Option<RetrievalResult>> = vec![None; total];
        let mut failed = Vec::new();

        while let Some(joined) = join_set.join_next().await {
            let Ok((index, outcome)) = joined else {
                tracing::warn!("retrieval worker panicked");
                continue;
            };
            match outcome {
                Ok(result) => {
                    tracing::info!(
                        index,
                        request_id = %request_ids[index],
                        passages = result.passages.len(),
                        "retrieval complete"
                    );
                    slots[index] = Some(result);
                }
                Err(reason) => {
                    tracing::warn!(index, request_id = %request_ids[index], "retrieval failed: {reason}");
                    failed.push(WorkerFailure {
                        index,
                        request_id: request_ids[index],
                        query: questions[index].clone(),
                        reason,
                    });
                }
            }
        }

        // A panicked task loses its index; any slot still empty is attributed here.
        for (index, slot) in slots.iter().enumerate() {
            if slot.is_none() && !failed.iter().any(|f| f.index == index) {
                failed.push(WorkerFailure {
                    index,
                    request_id: request_ids[index],
                    query: questions[index].clone(),
                    reason: "worker panicked".into(),
                });
            }
        }
        failed.sort_by_key(|f| f.index);

        let results: Vec<RetrievalResult> = slots.into_iter().flatten().collect();
        if results.is_empty() {
            return Err(CoordinatorError::AllWorkersFailed(total));
        }

        tracing::info!(
            succeeded = results.len(),
            failed = failed.len(),
            "fan-out complete"
        );
        Ok(FanOutReport { results, failed })
    }

    async fn await_ready(&self) -> Result<(), CoordinatorError> {
        match tokio::time::timeout(self.config.readiness_timeout, self.retriever.ready()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CoordinatorError::NotReady(e.to_string())),
            Err(_) => Err(CoordinatorError::NotReady(format!(
                "no answer within {}s",
                self.config.readiness_timeout.as_secs_f64()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tenk_index::retriever::RetrievedPassage;

    use super::*;

    /// Scripted retriever: per-query delay in ms, `fail:` prefix errors, `panic:` prefix panics.
    #[derive(Default)]
    struct ScriptedRetriever {
        delays: HashMap<String, u64>,
        ready_error: Option<String>,
        ready_delay_ms: u64,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedRetriever {
        fn with_delays(delays: &[(&str, u64)]) -> Self {
            Self {
                delays: delays.iter().map(|(q, d)| ((*q).to_owned(), *d)).collect(),
                ..Self::default()
            }
        }
    }

    impl Retrieve for ScriptedRetriever {
        async fn ready(&self) -> Result<(), IndexError> {
            tokio::time::sleep(Duration::from_millis(self.ready_delay_ms)).await;
            match &self.ready_error {
                Some(msg) => Err(IndexError::NotReady(msg.clone())),
                None => Ok(()),
            }
        }

        async fn retrieve(&self, query: &str) -> Result<RetrievalResult, IndexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = self.delays.get(query).copied().unwrap_or(10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            assert!(!query.starts_with("panic:"), "scripted panic");
            if query.starts_with("fail:") {
                return Err(IndexError::Other(format!("scripted failure for {query}")));
            }
            Ok(RetrievalResult {
                query: query.to_owned(),
                passages: vec![RetrievedPassage {
                    text: format!("passage for {query}"),
                    score: 0.9,
                    metadata: std::collections::BTreeMap::new(),
                }],
            })
        }
    }

    fn questions(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn coordinator(
        retriever: ScriptedRetriever,
        config: CoordinatorConfig,
    ) -> AgentCoordinator<ScriptedRetriever> {
        AgentCoordinator::new(Arc::new(retriever), config)
    }

    #[tokio::test(start_paused = true)]
    async fn results_follow_question_order_not_completion_order() {
        let r = ScriptedRetriever::with_delays(&[("a", 300), ("b", 100), ("c", 200)]);
        let report = coordinator(r, CoordinatorConfig::default())
            .fan_out(&questions(&["a", "b", "c"]))
            .await
            .unwrap();

        let order: Vec<_> = report.results.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(report.failed.is_empty());

        let context = report.aggregated_context();
        let a = context.find("Question: a").unwrap();
        let b = context.find("Question: b").unwrap();
        let c = context.find("Question: c").unwrap();
        assert!(a < b && b < c);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_worker_times_out_and_rest_are_aggregated() {
        let r = ScriptedRetriever::with_delays(&[("hang", 3_600_000)]);
        let config = CoordinatorConfig {
            worker_timeout: Duration::from_secs(5),
            ..CoordinatorConfig::default()
        };
        let report = coordinator(r, config)
            .fan_out(&questions(&["x", "hang", "y"]))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
        assert_eq!(report.failed[0].query, "hang");
        assert!(report.failed[0].reason.contains("timed out"));
        assert_eq!(report.dispatched(), 3);
        assert!(!report.aggregated_context().contains("Question: hang"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_and_panicked_workers_are_recorded() {
        let r = ScriptedRetriever::default();
        let report = coordinator(r, CoordinatorConfig::default())
            .fan_out(&questions(&["ok", "fail:one", "panic:two"]))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        let indices: Vec<_> = report.failed.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(report.failed[0].reason.contains("scripted failure"));
        assert_eq!(report.failed[1].reason, "worker panicked");
    }

    #[tokio::test(start_paused = true)]
    async fn all_workers_failing_is_an_error() {
        let r = ScriptedRetriever::default();
        let err = coordinator(r, CoordinatorConfig::default())
            .fan_out(&questions(&["fail:a", "fail:b"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::AllWorkersFailed(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_failure_aborts_before_dispatch() {
        let r = Arc::new(ScriptedRetriever {
            ready_error: Some("collection sec_10k_collection does not exist".into()),
            ..ScriptedRetriever::default()
        });
        let c = AgentCoordinator::new(Arc::clone(&r), CoordinatorConfig::default());
        let err = c.fan_out(&questions(&["a", "b"])).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::NotReady(ref m) if m.contains("does not exist")));
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_timeout_aborts_before_dispatch() {
        let r = Arc::new(ScriptedRetriever {
            ready_delay_ms: 60_000,
            ..ScriptedRetriever::default()
        });
        let c = AgentCoordinator::new(Arc::clone(&r), CoordinatorConfig::default());
        let err = c.fan_out(&questions(&["a"])).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::NotReady(_)));
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        let r = Arc::new(ScriptedRetriever::default());
        let config = CoordinatorConfig {
            max_concurrency: 3,
            ..CoordinatorConfig::default()
        };
        let c = AgentCoordinator::new(Arc::clone(&r), config);
        let qs: Vec<String> = (0..12).map(|i| format!("q{i}")).collect();
        let report = c.fan_out(&qs).await.unwrap();

        assert_eq!(report.results.len(), 12);
        assert!(r.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(r.calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn empty_question_list_is_empty_report() {
        let report = coordinator(ScriptedRetriever::default(), CoordinatorConfig::default())
            .fan_out(&[])
            .await
            .unwrap();
        assert_eq!(report.dispatched(), 0);
        assert_eq!(report.aggregated_context(), "");
    }
}
