//! Similarity retrieval over indexed filing chunks.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::sync::Arc;

use serde::Serialize;
use tenk_llm::any::AnyProvider;
use tenk_llm::provider::LlmProvider;
use tenk_memory::VectorStore;

use crate::error::{IndexError, Result};

const CONTENT_KEY: &str = "content";

/// Retrieval configuration.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub collection: String,
    /// Passages per query.
    pub limit: u64,
    /// Minimum cosine similarity to accept.
    pub score_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection: "sec_10k_collection".into(),
            limit: 4,
            score_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub score: f32,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Passages for one query, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub query: String,
    pub passages: Vec<RetrievedPassage>,
}

impl RetrievalResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// One row per passage: metadata columns in key order, then `page_content`.
    #[must_use]
    pub fn to_table(&self) -> String {
        if self.passages.is_empty() {
            return String::new();
        }
        let columns: BTreeSet<&str> = self
            .passages
            .iter()
            .flat_map(|p| p.metadata.keys().map(String::as_str))
            .collect();

        let mut out = String::new();
        for col in &columns {
            let _ = write!(out, "{col} | ");
        }
        out.push_str("page_content");

        for passage in &self.passages {
            out.push('\n');
            for col in &columns {
                let cell = passage.metadata.get(*col).map(cell_text).unwrap_or_default();
                let _ = write!(out, "{cell} | ");
            }
            out.push_str(&passage.text.replace('\n', " "));
        }
        out
    }

    /// Query heading followed by the passage table.
    #[must_use]
    pub fn render(&self) -> String {
        if self.passages.is_empty() {
            return format!("Question: {}\n(no matching passages)", self.query);
        }
        format!("Question: {}\n{}", self.query, self.to_table())
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Embeds a query and searches the filing collection.
#[derive(Clone)]
pub struct FilingRetriever {
    store: Arc<dyn VectorStore>,
    provider: Arc<AnyProvider>,
    config: RetrievalConfig,
}

impl FilingRetriever {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<AnyProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Returns an error if embedding or the vector search fails.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        let vector = self.provider.embed(query).await?;
        let hits = self
            .store
            .search(
                &self.config.collection,
                vector,
                self.config.limit,
                Some(self.config.score_threshold),
            )
            .await?;

        let passages: Vec<RetrievedPassage> = hits
            .into_iter()
            .filter(|h| h.score >= self.config.score_threshold)
            .map(|h| {
                let mut metadata: BTreeMap<String, serde_json::Value> =
                    h.payload.into_iter().collect();
                let text = metadata
                    .remove(CONTENT_KEY)
                    .map(|v| cell_text(&v))
                    .unwrap_or_default();
                RetrievedPassage {
                    text,
                    score: h.score,
                    metadata,
                }
            })
            .collect();

        tracing::debug!(query, hits = passages.len(), "retrieval complete");
        Ok(RetrievalResult {
            query: query.to_owned(),
            passages,
        })
    }

    /// Readiness probe: the store answers and the collection exists.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotReady`] otherwise.
    pub async fn ready(&self) -> Result<()> {
        match self.store.collection_exists(&self.config.collection).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(IndexError::NotReady(format!(
                "collection {} does not exist",
                self.config.collection
            ))),
            Err(e) => Err(IndexError::NotReady(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;
    use tenk_llm::mock::MockProvider;
    use tenk_memory::{InMemoryVectorStore, VectorPoint};

    use super::*;

    fn point(id: &str, vector: Vec<f32>, company: &str, content: &str) -> VectorPoint {
        VectorPoint {
            id: id.into(),
            vector,
            payload: HashMap::from([
                ("company".into(), json!(company)),
                ("chunk".into(), json!(0)),
                ("filename".into(), json!(format!("{company}.txt"))),
                ("content".into(), json!(content)),
            ]),
        }
    }

    async fn seeded_store() -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        store.ensure_collection("sec_10k_collection", 2).await.unwrap();
        store
            .upsert(
                "sec_10k_collection",
                vec![
                    point("1", vec![1.0, 0.0], "Apple Inc", "iPhone net sales"),
                    point("2", vec![1.0, 0.5], "Alphabet Inc", "Search advertising"),
                    point("3", vec![0.0, 1.0], "Tesla Inc", "Vehicle deliveries"),
                    point("4", vec![-1.0, 0.0], "Opposite Co", "never returned"),
                ],
            )
            .await
            .unwrap();
        store
    }

    fn retriever(store: Arc<InMemoryVectorStore>, limit: u64) -> FilingRetriever {
        FilingRetriever::new(
            store,
            Arc::new(AnyProvider::Mock(
                MockProvider::default().with_embedding(vec![1.0, 0.0]),
            )),
            RetrievalConfig {
                limit,
                ..RetrievalConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn retrieve_orders_by_score_and_applies_threshold() {
        let r = retriever(seeded_store().await, 10);
        let result = r.retrieve("Apple revenue").await.unwrap();

        let companies: Vec<_> = result
            .passages
            .iter()
            .map(|p| p.metadata["company"].as_str().unwrap())
            .collect();
        assert_eq!(companies, vec!["Apple Inc", "Alphabet Inc"]);
        assert!(result.passages.iter().all(|p| p.score >= 0.1));
        assert_eq!(result.passages[0].text, "iPhone net sales");
        assert!(!result.passages[0].metadata.contains_key("content"));
    }

    #[tokio::test]
    async fn retrieve_respects_limit() {
        let r = retriever(seeded_store().await, 1);
        let result = r.retrieve("q").await.unwrap();
        assert_eq!(result.passages.len(), 1);
    }

    #[tokio::test]
    async fn ready_requires_collection() {
        let r = retriever(Arc::new(InMemoryVectorStore::new()), 4);
        assert!(matches!(r.ready().await, Err(IndexError::NotReady(_))));

        let r = retriever(seeded_store().await, 4);
        assert!(r.ready().await.is_ok());
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let r = FilingRetriever::new(
            seeded_store().await,
            Arc::new(AnyProvider::Mock(MockProvider::default())),
            RetrievalConfig::default(),
        );
        assert!(matches!(r.retrieve("q").await, Err(IndexError::Llm(_))));
    }

    #[test]
    fn to_table_lists_metadata_then_content() {
        let result = RetrievalResult {
            query: "q".into(),
            passages: vec![RetrievedPassage {
                text: "line one\nline two".into(),
                score: 0.9,
                metadata: BTreeMap::from([
                    ("company".into(), json!("Apple Inc")),
                    ("chunk".into(), json!(3)),
                ]),
            }],
        };
        assert_eq!(
            result.to_table(),
            "chunk | company | page_content\n3 | Apple Inc | line one line two"
        );
        assert!(result.render().starts_with("Question: q\n"));
    }

    #[test]
    fn empty_result_renders_placeholder() {
        let result = RetrievalResult {
            query: "q".into(),
            passages: vec![],
        };
        assert!(result.is_empty());
        assert_eq!(result.to_table(), "");
        assert_eq!(result.render(), "Question: q\n(no matching passages)");
    }
}
