//! Directory indexing orchestrator: list → chunk → embed → store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tenk_llm::any::AnyProvider;
use tenk_llm::provider::LlmProvider;
use tenk_memory::VectorStore;
use tenk_memory::document::{IngestionPipeline, SplitterConfig, TextLoader, TextSplitter};

use crate::error::Result;

/// Summary of an indexing run.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub chunks_created: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Chunks every company text file in a directory into the vector store.
pub struct FilingIndexer {
    store: Arc<dyn VectorStore>,
    provider: Arc<AnyProvider>,
    collection: String,
    splitter: SplitterConfig,
}

impl FilingIndexer {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<AnyProvider>,
        collection: impl Into<String>,
        splitter: SplitterConfig,
    ) -> Self {
        Self {
            store,
            provider,
            collection: collection.into(),
            splitter,
        }
    }

    /// Index every `.txt` file under `dir` (non-recursive).
    ///
    /// The collection is created on first use, sized from a probe embedding.
    /// A file that fails is recorded in the report and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read, or the embedding
    /// probe or collection setup fails.
    pub async fn index_dir(&self, dir: &Path) -> Result<IndexReport> {
        let start = std::time::Instant::now();
        let mut report = IndexReport::default();

        let probe = self.provider.embed("probe").await?;
        let vector_size = u64::try_from(probe.len())?;
        self.store
            .ensure_collection(&self.collection, vector_size)
            .await?;

        let files = list_text_files(dir).await?;
        let total = files.len();
        tracing::info!(total, collection = %self.collection, "indexing started");

        let pipeline = IngestionPipeline::new(
            TextSplitter::new(self.splitter),
            Arc::clone(&self.store),
            self.collection.clone(),
            Box::new(self.provider.embed_fn()),
        );
        let loader = TextLoader::default();

        for (i, path) in files.iter().enumerate() {
            report.files_scanned += 1;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match pipeline.load_and_ingest(&loader, path).await {
                Ok(created) => {
                    if created > 0 {
                        report.files_indexed += 1;
                    }
                    report.chunks_created += created;
                    tracing::info!(
                        file = %name,
                        progress = format_args!("{}/{total}", i + 1),
                        created,
                    );
                }
                Err(e) => {
                    tracing::warn!(file = %name, "indexing failed: {e:#}");
                    report.errors.push(format!("{name}: {e:#}"));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        Ok(report)
    }
}

async fn list_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file()
            && path.extension().is_some_and(|ext| ext == "txt")
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
