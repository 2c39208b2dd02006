use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_request();
        self.apply_env_overrides_serving();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("TENK_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("TENK_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("TENK_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("TENK_EMBEDDING_BASE_URL") {
            self.llm.embedding_base_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = std::env::var("TENK_STT_BASE_URL") {
            self.stt.base_url = v;
        }
        if let Ok(v) = std::env::var("TENK_STT_MODEL") {
            self.stt.model = v;
        }
    }

    fn apply_env_overrides_request(&mut self) {
        if let Ok(v) = std::env::var("TENK_DECOMPOSE_STRATEGY") {
            if let Ok(strategy) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.decompose.strategy = strategy;
            } else {
                tracing::warn!("ignoring invalid TENK_DECOMPOSE_STRATEGY value: {v}");
            }
        }
        if let Ok(v) = std::env::var("TENK_DECOMPOSE_MAX_COMPANIES")
            && let Ok(n) = v.parse::<usize>()
        {
            self.decompose.max_companies = n;
        }
        if let Ok(v) = std::env::var("TENK_RETRIEVAL_COLLECTION") {
            self.retrieval.collection = v;
        }
        if let Ok(v) = std::env::var("TENK_RETRIEVAL_SCORE_THRESHOLD")
            && let Ok(threshold) = v.parse::<f32>()
        {
            self.retrieval.score_threshold = threshold;
        }
        if let Ok(v) = std::env::var("TENK_RETRIEVAL_LIMIT")
            && let Ok(limit) = v.parse::<u64>()
        {
            self.retrieval.limit = limit;
        }
        if let Ok(v) = std::env::var("TENK_COORDINATOR_MAX_CONCURRENCY")
            && let Ok(n) = v.parse::<usize>()
        {
            self.coordinator.max_concurrency = n;
        }
        if let Ok(v) = std::env::var("TENK_COORDINATOR_WORKER_TIMEOUT")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.coordinator.worker_timeout_secs = secs;
        }
        if let Ok(v) = std::env::var("TENK_DASHBOARD_OUTPUT") {
            self.dashboard.output_path = Some(v).filter(|s| !s.is_empty()).map(PathBuf::from);
        }
    }

    fn apply_env_overrides_serving(&mut self) {
        if let Ok(v) = std::env::var("TENK_MEMORY_BACKEND") {
            if let Ok(backend) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.memory.backend = backend;
            } else {
                tracing::warn!("ignoring invalid TENK_MEMORY_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("TENK_QDRANT_URL") {
            self.memory.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("TENK_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("TENK_GATEWAY_PORT")
            && let Ok(port) = v.parse::<u16>()
        {
            self.gateway.port = port;
        }
        if let Ok(v) = std::env::var("TENK_GATEWAY_RATE_LIMIT")
            && let Ok(limit) = v.parse::<u32>()
        {
            self.gateway.rate_limit = limit;
        }
        if let Ok(v) = std::env::var("TENK_INGEST_TEXT_DIR") {
            self.ingest.text_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TENK_INGEST_USER_AGENT") {
            self.ingest.user_agent = v;
        }
    }
}
