use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::decompose::DecomposeStrategy;
use crate::vault::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub decompose: DecomposeConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// OpenAI-compatible chat and embedding endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Separate embeddings host; the chat `base_url` when unset.
    #[serde(default)]
    pub embedding_base_url: Option<String>,
}

fn default_llm_base_url() -> String {
    "https://api.tandemn.com/api/v1".into()
}

fn default_llm_model() -> String {
    "Qwen/Qwen3-32B-AWQ".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            embedding_model: default_embedding_model(),
            embedding_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SttConfig {
    #[serde(default = "default_stt_base_url")]
    pub base_url: String,
    #[serde(default = "default_stt_model")]
    pub model: String,
    /// Used when an upload carries no `language` field.
    #[serde(default = "default_stt_language")]
    pub default_language: String,
}

fn default_stt_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_stt_model() -> String {
    "whisper-1".into()
}

fn default_stt_language() -> String {
    "en-US".into()
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: default_stt_base_url(),
            model: default_stt_model(),
            default_language: default_stt_language(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecomposeConfig {
    #[serde(default)]
    pub strategy: DecomposeStrategy,
    #[serde(default = "default_max_companies")]
    pub max_companies: usize,
    #[serde(default = "default_decompose_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_decompose_max_tokens")]
    pub max_tokens: u32,
    /// Serve the canned question set when the LLM call fails.
    #[serde(default = "default_true")]
    pub fallback_to_canned: bool,
}

fn default_max_companies() -> usize {
    4
}

fn default_decompose_timeout() -> u64 {
    40
}

fn default_decompose_max_tokens() -> u32 {
    800
}

fn default_true() -> bool {
    true
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            strategy: DecomposeStrategy::default(),
            max_companies: default_max_companies(),
            timeout_secs: default_decompose_timeout(),
            max_tokens: default_decompose_max_tokens(),
            fallback_to_canned: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    #[serde(default = "default_retrieval_limit")]
    pub limit: u64,
}

fn default_collection() -> String {
    "sec_10k_collection".into()
}

fn default_score_threshold() -> f32 {
    0.1
}

fn default_retrieval_limit() -> u64 {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            score_threshold: default_score_threshold(),
            limit: default_retrieval_limit(),
        }
    }
}

impl RetrievalConfig {
    #[must_use]
    pub fn to_retriever_config(&self) -> tenk_index::retriever::RetrievalConfig {
        tenk_index::retriever::RetrievalConfig {
            collection: self.collection.clone(),
            limit: self.limit,
            score_threshold: self.score_threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_worker_timeout")]
    pub worker_timeout_secs: u64,
    #[serde(default = "default_readiness_timeout")]
    pub readiness_timeout_secs: u64,
}

fn default_max_concurrency() -> usize {
    10
}

fn default_worker_timeout() -> u64 {
    60
}

fn default_readiness_timeout() -> u64 {
    15
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            worker_timeout_secs: default_worker_timeout(),
            readiness_timeout_secs: default_readiness_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_title")]
    pub title: String,
    #[serde(default = "default_dashboard_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_dashboard_max_tokens")]
    pub max_tokens: u32,
    /// Where the rendered page is also written. `None` skips the write.
    #[serde(default = "default_dashboard_output")]
    pub output_path: Option<PathBuf>,
}

fn default_dashboard_title() -> String {
    "Financial Dashboard".into()
}

fn default_dashboard_timeout() -> u64 {
    90
}

fn default_dashboard_max_tokens() -> u32 {
    3500
}

#[allow(clippy::unnecessary_wraps)]
fn default_dashboard_output() -> Option<PathBuf> {
    Some(PathBuf::from("dashboard.html"))
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: default_dashboard_title(),
            timeout_secs: default_dashboard_timeout(),
            max_tokens: default_dashboard_max_tokens(),
            output_path: default_dashboard_output(),
        }
    }
}

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    #[default]
    Qdrant,
    InMemory,
}

impl StoreBackend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qdrant => "qdrant",
            Self::InMemory => "in-memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            qdrant_url: default_qdrant_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    #[serde(default = "default_filing_index_url")]
    pub filing_index_url: String,
    #[serde(default = "default_form_type")]
    pub form_type: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// EDGAR rejects anonymous clients; include a contact address.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
    #[serde(default = "default_text_dir")]
    pub text_dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_filing_index_url() -> String {
    "https://api.sec-api.io".into()
}

fn default_form_type() -> String {
    "10-K".into()
}

fn default_page_size() -> u32 {
    200
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_fetch_concurrency() -> usize {
    10
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("tenk/", env!("CARGO_PKG_VERSION"), " (research@example.com)").into()
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("all_10k.json")
}

fn default_text_dir() -> PathBuf {
    PathBuf::from("sec_texts_by_company")
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            filing_index_url: default_filing_index_url(),
            form_type: default_form_type(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            max_pages: None,
            fetch_concurrency: default_fetch_concurrency(),
            fetch_timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            manifest_path: default_manifest_path(),
            text_dir: default_text_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Requests per IP per minute; 0 disables the limit.
    #[serde(default = "default_gateway_rate_limit")]
    pub rate_limit: u32,
    #[serde(default = "default_gateway_max_upload")]
    pub max_upload_size: usize,
    /// Pending `/get-html` requests before callers wait.
    #[serde(default = "default_gateway_queue")]
    pub queue_capacity: usize,
}

fn default_gateway_bind() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    8002
}

fn default_gateway_rate_limit() -> u32 {
    120
}

fn default_gateway_max_upload() -> usize {
    25 * 1024 * 1024
}

fn default_gateway_queue() -> usize {
    16
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            auth_token: None,
            rate_limit: default_gateway_rate_limit(),
            max_upload_size: default_gateway_max_upload(),
            queue_capacity: default_gateway_queue(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ResolvedSecrets {
    pub llm_api_key: Option<Secret>,
    pub embedding_api_key: Option<Secret>,
    pub stt_api_key: Option<Secret>,
    pub filing_api_key: Option<Secret>,
}
