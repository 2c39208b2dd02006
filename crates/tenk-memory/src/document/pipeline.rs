use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tenk_llm::provider::EmbedFuture;

use super::{Document, DocumentError, DocumentLoader, TextSplitter};
use crate::vector_store::{VectorPoint, VectorStore};

pub type EmbedFn = Box<dyn Fn(&str) -> EmbedFuture + Send + Sync>;

/// Split, embed and upsert documents into one collection.
pub struct IngestionPipeline {
    splitter: TextSplitter,
    store: Arc<dyn VectorStore>,
    collection: String,
    embed_fn: EmbedFn,
}

impl IngestionPipeline {
    pub fn new(
        splitter: TextSplitter,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        embed_fn: EmbedFn,
    ) -> Self {
        Self {
            splitter,
            store,
            collection: collection.into(),
            embed_fn,
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ingest a document: split -> embed -> upsert. Returns chunk count.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or storage fails.
    pub async fn ingest(&self, document: Document) -> Result<usize, DocumentError> {
        let chunks = self.splitter.split(&document);
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut points = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let vector = (self.embed_fn)(&chunk.content).await?;
            let payload: HashMap<String, serde_json::Value> = HashMap::from([
                ("chunk_id".to_owned(), json!(chunk.key())),
                ("company".to_owned(), json!(chunk.metadata.company)),
                ("chunk".to_owned(), json!(chunk.chunk_index)),
                ("filename".to_owned(), json!(chunk.metadata.filename)),
                ("content".to_owned(), json!(chunk.content)),
            ]);
            points.push(VectorPoint {
                id: chunk.point_id().to_string(),
                vector,
                payload,
            });
        }

        let count = points.len();
        self.store.upsert(&self.collection, points).await?;
        tracing::debug!(
            company = %document.metadata.company,
            chunks = count,
            "document ingested"
        );

        Ok(count)
    }

    /// # Errors
    ///
    /// Returns an error if loading, embedding, or storage fails.
    pub async fn load_and_ingest(
        &self,
        loader: &(dyn DocumentLoader + '_),
        path: &std::path::Path,
    ) -> Result<usize, DocumentError> {
        let documents = loader.load(path).await?;
        let mut total = 0;
        for doc in documents {
            total += self.ingest(doc).await?;
        }
        Ok(total)
    }
}
