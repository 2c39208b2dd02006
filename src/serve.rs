//! `tenk serve`: the HTTP gateway plus the worker that answers `/get-html`.

use std::sync::Arc;

use anyhow::Context;
use tenk_core::AppBuilder;
use tenk_core::coordinator::Retrieve;
use tenk_core::workflow::Workflow;
use tenk_gateway::{DashboardRequest, GatewayServer};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

pub(crate) async fn run(app: AppBuilder) -> anyhow::Result<()> {
    let workflow = Arc::new(app.build_workflow()?);
    let config = app.config();

    let (shutdown_tx, shutdown_rx) = AppBuilder::build_shutdown();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {e}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let (dashboard_tx, dashboard_rx) = mpsc::channel(config.gateway.queue_capacity.max(1));
    let worker = tokio::spawn(dashboard_worker(
        workflow,
        dashboard_rx,
        shutdown_rx.clone(),
    ));

    let server = GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        dashboard_tx,
        shutdown_rx,
    )
    .with_auth(config.gateway.auth_token.clone())
    .with_rate_limit(config.gateway.rate_limit)
    .with_max_body_size(config.gateway.max_upload_size)
    .with_default_language(Some(config.stt.default_language.clone()));

    #[cfg(feature = "stt")]
    let server = match app.build_stt() {
        Ok(stt) => server.with_stt(stt),
        Err(e) => {
            tracing::warn!("/transcribe disabled: {e:#}");
            server
        }
    };

    server.serve().await.context("gateway failed")?;
    worker.await.context("dashboard worker panicked")?;
    Ok(())
}

/// Answer queued dashboard requests until shutdown or until every sender is gone.
///
/// Requests run concurrently; in-flight ones are finished before returning.
pub(crate) async fn dashboard_worker<R: Retrieve>(
    workflow: Arc<Workflow<R>>,
    mut requests: mpsc::Receiver<DashboardRequest>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else { break };
                let workflow = Arc::clone(&workflow);
                in_flight.spawn(async move {
                    let request_id = request.id;
                    tracing::info!(%request_id, question = %request.question, "building dashboard");
                    let outcome = workflow
                        .run(&request.question)
                        .await
                        .map(|dashboard| dashboard.html)
                        .map_err(|e| e.to_string());
                    if let Err(ref message) = outcome {
                        tracing::warn!(%request_id, "dashboard request failed: {message}");
                    }
                    request.respond(outcome);
                });
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("dashboard task failed: {e}");
                }
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!("dashboard task failed: {e}");
        }
    }
    tracing::info!("dashboard worker stopped");
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use tenk_core::coordinator::{AgentCoordinator, CoordinatorConfig};
    use tenk_core::dashboard::DashboardGenerator;
    use tenk_core::decompose::{DecomposeStrategy, QuestionDecomposer};
    use tenk_core::workflow::WorkflowOptions;
    use tenk_index::retriever::{FilingRetriever, RetrievalConfig};
    use tenk_llm::any::AnyProvider;
    use tenk_llm::mock::MockProvider;
    use tenk_memory::{InMemoryVectorStore, VectorPoint, VectorStore};

    use super::*;

    async fn workflow(collection: &str) -> Arc<Workflow> {
        let mock = MockProvider::with_responses(vec![
            r#"{"sub_questions": ["What is Apple's revenue?", "What is Google's revenue?"]}"#
                .into(),
        ])
        .with_embedding(vec![0.0, 1.0]);
        let provider = Arc::new(AnyProvider::Mock(mock));

        let store = Arc::new(InMemoryVectorStore::new());
        store.ensure_collection("filings", 2).await.unwrap();
        store
            .upsert(
                "filings",
                vec![VectorPoint {
                    id: "Apple_0".into(),
                    vector: vec![0.0, 1.0],
                    payload: HashMap::from([(
                        "content".to_owned(),
                        serde_json::json!("Net sales of $391 billion"),
                    )]),
                }],
            )
            .await
            .unwrap();
        let store: Arc<dyn VectorStore> = store;

        let retriever = FilingRetriever::new(
            store,
            Arc::clone(&provider),
            RetrievalConfig {
                collection: collection.into(),
                limit: 4,
                score_threshold: 0.1,
            },
        );
        Arc::new(Workflow::new(
            Arc::new(QuestionDecomposer::new(
                Arc::clone(&provider),
                DecomposeStrategy::Free,
            )),
            Arc::new(AgentCoordinator::new(
                Arc::new(retriever),
                CoordinatorConfig::default(),
            )),
            Arc::new(DashboardGenerator::new(provider)),
            WorkflowOptions::default(),
        ))
    }

    #[tokio::test]
    async fn worker_answers_queued_requests() {
        let (tx, rx) = mpsc::channel(2);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(dashboard_worker(workflow("filings").await, rx, shutdown_rx));

        let (request, reply) = DashboardRequest::new("Compare Apple and Google".into());
        tx.send(request).await.unwrap();
        let html = reply.await.unwrap().unwrap();
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("Net sales of $391 billion"));

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn worker_reports_workflow_errors() {
        let (tx, rx) = mpsc::channel(2);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(dashboard_worker(workflow("missing").await, rx, shutdown_rx));

        let (request, reply) = DashboardRequest::new("Compare Apple and Google".into());
        tx.send(request).await.unwrap();
        let message = reply.await.unwrap().unwrap_err();
        assert!(message.contains("not ready"));
    }

    #[tokio::test]
    async fn worker_stops_on_shutdown() {
        let (_tx, rx) = mpsc::channel::<DashboardRequest>(2);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(dashboard_worker(workflow("filings").await, rx, shutdown_rx));
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
    }
}
