//! Application bootstrap: config resolution, provider, store and workflow construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tenk_index::fetcher::{FetcherConfig, FilingFetcher};
use tenk_index::filings::{FilingIndexClient, FilingIndexConfig};
use tenk_index::indexer::FilingIndexer;
use tenk_index::retriever::FilingRetriever;
use tenk_llm::any::AnyProvider;
use tenk_llm::openai::OpenAiProvider;
use tenk_llm::provider::CompletionOptions;
use tenk_memory::document::SplitterConfig;
use tenk_memory::{InMemoryVectorStore, QdrantOps, VectorStore};
use tokio::sync::watch;

use crate::config::{Config, StoreBackend, resolve_config_path};
use crate::coordinator::{self, AgentCoordinator};
use crate::dashboard::DashboardGenerator;
use crate::decompose::QuestionDecomposer;
use crate::vault::{EnvVaultProvider, VaultProvider};
use crate::workflow::{Workflow, WorkflowOptions};

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Resolve the config path, load and validate the config, resolve secrets
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or invalid.
    pub async fn from_env(cli_config: Option<&Path>) -> anyhow::Result<Self> {
        Self::with_vault(cli_config, &EnvVaultProvider).await
    }

    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or invalid, or the
    /// vault fails.
    pub async fn with_vault(
        cli_config: Option<&Path>,
        vault: &dyn VaultProvider,
    ) -> anyhow::Result<Self> {
        let config_path = resolve_config_path(cli_config);
        let mut config = Config::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        config.validate()?;
        config.resolve_secrets(vault).await?;
        tracing::debug!(path = %config_path.display(), "configuration loaded");
        Ok(Self {
            config,
            config_path,
        })
    }

    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            config_path: PathBuf::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Chat and embedding client. The embedding endpoint falls back to the
    /// chat endpoint and key when not configured separately.
    ///
    /// # Errors
    ///
    /// Returns an error if `TENK_LLM_API_KEY` is not set.
    pub fn build_provider(&self) -> anyhow::Result<Arc<AnyProvider>> {
        let llm = &self.config.llm;
        let Some(key) = self.config.secrets.llm_api_key.as_ref() else {
            bail!("TENK_LLM_API_KEY not found in vault");
        };

        let mut provider = OpenAiProvider::new(
            key.expose().to_owned(),
            llm.base_url.clone(),
            llm.model.clone(),
            Some(llm.embedding_model.clone()),
        );
        let embedding_key = self
            .config
            .secrets
            .embedding_api_key
            .as_ref()
            .map(|s| s.expose().to_owned());
        if let Some(ref base) = llm.embedding_base_url {
            provider = provider.with_embedding_endpoint(base.clone(), embedding_key);
        } else if embedding_key.is_some() {
            provider = provider.with_embedding_endpoint(llm.base_url.clone(), embedding_key);
        }

        tracing::info!(model = %llm.model, base_url = %llm.base_url, "LLM provider ready");
        Ok(Arc::new(AnyProvider::OpenAi(provider)))
    }

    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn build_store(&self) -> anyhow::Result<Arc<dyn VectorStore>> {
        let memory = &self.config.memory;
        let store: Arc<dyn VectorStore> = match memory.backend {
            StoreBackend::Qdrant => Arc::new(
                QdrantOps::new(&memory.qdrant_url)
                    .with_context(|| format!("connecting to Qdrant at {}", memory.qdrant_url))?,
            ),
            StoreBackend::InMemory => {
                tracing::warn!("using the in-memory vector store; nothing is persisted");
                Arc::new(InMemoryVectorStore::new())
            }
        };
        tracing::info!(backend = memory.backend.as_str(), "vector store ready");
        Ok(store)
    }

    #[must_use]
    pub fn build_retriever(
        &self,
        store: Arc<dyn VectorStore>,
        provider: Arc<AnyProvider>,
    ) -> FilingRetriever {
        FilingRetriever::new(store, provider, self.config.retrieval.to_retriever_config())
    }

    #[must_use]
    pub fn build_decomposer(&self, provider: Arc<AnyProvider>) -> QuestionDecomposer {
        let cfg = &self.config.decompose;
        QuestionDecomposer::new(provider, cfg.strategy)
            .with_max_companies(cfg.max_companies)
            .with_options(
                CompletionOptions::new(0.0, 1.0, cfg.max_tokens)
                    .with_timeout(Duration::from_secs(cfg.timeout_secs)),
            )
    }

    #[must_use]
    pub fn build_dashboard(&self, provider: Arc<AnyProvider>) -> DashboardGenerator {
        let cfg = &self.config.dashboard;
        DashboardGenerator::new(provider)
            .with_options(
                CompletionOptions::new(0.2, 0.9, cfg.max_tokens)
                    .with_timeout(Duration::from_secs(cfg.timeout_secs)),
            )
            .with_output_path(cfg.output_path.clone())
    }

    #[must_use]
    pub fn build_coordinator(&self, retriever: FilingRetriever) -> AgentCoordinator<FilingRetriever> {
        let cfg = &self.config.coordinator;
        AgentCoordinator::new(
            Arc::new(retriever),
            coordinator::CoordinatorConfig {
                max_concurrency: cfg.max_concurrency,
                worker_timeout: Duration::from_secs(cfg.worker_timeout_secs),
                readiness_timeout: Duration::from_secs(cfg.readiness_timeout_secs),
            },
        )
    }

    /// The full request workflow over the configured store.
    ///
    /// The in-memory backend is refused here: it lives inside one process, so
    /// `serve` and `ask` would never see what `ingest` wrote and every request
    /// would fail the readiness check.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider or store cannot be built, or the
    /// in-memory backend is configured.
    pub fn build_workflow(&self) -> anyhow::Result<Workflow> {
        if self.config.memory.backend == StoreBackend::InMemory {
            bail!(
                "memory.backend = \"in-memory\" starts empty in every process; \
                 set memory.backend = \"qdrant\" to answer questions over ingested filings"
            );
        }
        let provider = self.build_provider()?;
        let store = self.build_store()?;
        let retriever = self.build_retriever(store, Arc::clone(&provider));
        Ok(Workflow::new(
            Arc::new(self.build_decomposer(Arc::clone(&provider))),
            Arc::new(self.build_coordinator(retriever)),
            Arc::new(self.build_dashboard(provider)),
            WorkflowOptions {
                title: self.config.dashboard.title.clone(),
                fallback_to_canned: self.config.decompose.fallback_to_canned,
            },
        ))
    }

    /// # Errors
    ///
    /// Returns an error if `TENK_FILING_API_KEY` is not set.
    pub fn build_filing_client(&self) -> anyhow::Result<FilingIndexClient> {
        let Some(key) = self.config.secrets.filing_api_key.as_ref() else {
            bail!("TENK_FILING_API_KEY not found in vault");
        };
        let ingest = &self.config.ingest;
        Ok(FilingIndexClient::new(
            tenk_llm::http::default_client(),
            key.expose(),
            FilingIndexConfig {
                base_url: ingest.filing_index_url.clone(),
                form_type: ingest.form_type.clone(),
                page_size: ingest.page_size,
                page_delay: Duration::from_millis(ingest.page_delay_ms),
                max_pages: ingest.max_pages,
            },
        ))
    }

    #[must_use]
    pub fn build_fetcher(&self) -> FilingFetcher {
        let ingest = &self.config.ingest;
        FilingFetcher::new(
            tenk_llm::http::default_client(),
            FetcherConfig {
                user_agent: ingest.user_agent.clone(),
                timeout: Duration::from_secs(ingest.fetch_timeout_secs),
                concurrency: ingest.fetch_concurrency,
            },
        )
    }

    #[must_use]
    pub fn build_indexer(
        &self,
        store: Arc<dyn VectorStore>,
        provider: Arc<AnyProvider>,
    ) -> FilingIndexer {
        FilingIndexer::new(
            store,
            provider,
            self.config.retrieval.collection.clone(),
            SplitterConfig {
                chunk_size: self.config.ingest.chunk_size,
                chunk_overlap: self.config.ingest.chunk_overlap,
            },
        )
    }

    /// Whisper client for `/transcribe`. Uses the speech key, falling back to
    /// the LLM key.
    ///
    /// # Errors
    ///
    /// Returns an error if neither key is set.
    #[cfg(feature = "stt")]
    pub fn build_stt(&self) -> anyhow::Result<Arc<dyn tenk_llm::stt::SpeechToText>> {
        let secrets = &self.config.secrets;
        let Some(key) = secrets.stt_api_key.as_ref().or(secrets.llm_api_key.as_ref()) else {
            bail!("TENK_STT_API_KEY not found in vault");
        };
        let stt = &self.config.stt;
        tracing::info!(model = %stt.model, base_url = %stt.base_url, "speech-to-text ready");
        Ok(Arc::new(tenk_llm::whisper::WhisperProvider::new(
            tenk_llm::http::default_client(),
            key.expose(),
            stt.base_url.clone(),
            stt.model.clone(),
        )))
    }

    #[must_use]
    pub fn build_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }
}
