mod env;
mod types;


pub use types::*;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

use crate::vault::{Secret, VaultProvider};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve API keys and the gateway token through the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        if let Some(val) = vault.get_secret("TENK_LLM_API_KEY").await? {
            self.secrets.llm_api_key = Some(Secret::new(val));
        }
        if let Some(val) = vault.get_secret("TENK_EMBEDDING_API_KEY").await? {
            self.secrets.embedding_api_key = Some(Secret::new(val));
        }
        if let Some(val) = vault.get_secret("TENK_STT_API_KEY").await? {
            self.secrets.stt_api_key = Some(Secret::new(val));
        }
        if let Some(val) = vault.get_secret("TENK_FILING_API_KEY").await? {
            self.secrets.filing_api_key = Some(Secret::new(val));
        }
        if let Some(val) = vault.get_secret("TENK_GATEWAY_TOKEN").await? {
            self.gateway.auth_token = Some(val);
        }
        Ok(())
    }

    /// Reject settings that would break chunking, fan-out, or retrieval.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ingest.chunk_size == 0 {
            bail!("ingest.chunk_size must be greater than 0");
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            bail!(
                "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
                self.ingest.chunk_overlap,
                self.ingest.chunk_size
            );
        }
        if self.coordinator.max_concurrency == 0 {
            bail!("coordinator.max_concurrency must be greater than 0");
        }
        if self.ingest.fetch_concurrency == 0 {
            bail!("ingest.fetch_concurrency must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.retrieval.score_threshold) {
            bail!(
                "retrieval.score_threshold must be within [0, 1], got {}",
                self.retrieval.score_threshold
            );
        }
        if self.retrieval.limit == 0 {
            bail!("retrieval.limit must be greater than 0");
        }
        if self.decompose.max_companies == 0 {
            bail!("decompose.max_companies must be greater than 0");
        }
        Ok(())
    }
}

/// Config path priority: explicit `--config`, then `TENK_CONFIG`, then
/// `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("TENK_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}
