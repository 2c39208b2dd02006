//! Filing index API client and the JSON manifest it produces.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{IndexError, Result};

/// One filing as listed by the index API. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingRecord {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub form_type: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub filed_at: Option<String>,
    #[serde(default)]
    pub link_to_filing_details: Option<String>,
}

#[derive(Deserialize)]
struct FilingsPage {
    #[serde(default)]
    filings: Vec<FilingRecord>,
}

/// Client configuration for [`FilingIndexClient`].
#[derive(Debug, Clone)]
pub struct FilingIndexConfig {
    pub base_url: String,
    pub form_type: String,
    pub page_size: u32,
    pub page_delay: Duration,
    /// Stop after this many pages even if more are available.
    pub max_pages: Option<usize>,
}

impl Default for FilingIndexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sec-api.io".into(),
            form_type: "10-K".into(),
            page_size: 200,
            page_delay: Duration::from_millis(500),
            max_pages: None,
        }
    }
}

/// Pages through the filing query API.
pub struct FilingIndexClient {
    client: reqwest::Client,
    api_key: String,
    config: FilingIndexConfig,
}

impl std::fmt::Debug for FilingIndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilingIndexClient")
            .field("api_key", &"<redacted>")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FilingIndexClient {
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, config: FilingIndexConfig) -> Self {
        let mut config = config;
        while config.base_url.ends_with('/') {
            config.base_url.pop();
        }
        Self {
            client,
            api_key: api_key.into(),
            config,
        }
    }

    /// Fetch one page starting at offset `from`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::FilingIndex`] on a non-2xx answer, or a transport
    /// or JSON error.
    pub async fn fetch_page(&self, from: u64) -> Result<Vec<FilingRecord>> {
        let body = json!({
            "query": { "query_string": { "query": format!("formType:\"{}\"", self.config.form_type) } },
            "from": from,
            "size": self.config.page_size,
            "sort": [{ "filedAt": { "order": "desc" } }],
        });

        let response = self
            .client
            .post(format!("{}/", self.config.base_url))
            .query(&[("token", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!("filing index error {status}: {text}");
            return Err(IndexError::FilingIndex {
                status: status.as_u16(),
                body: text,
            });
        }

        let page: FilingsPage = serde_json::from_str(&text)?;
        Ok(page.filings)
    }

    /// Page through the index until an empty page or `max_pages`.
    ///
    /// # Errors
    ///
    /// Fails on the first page that cannot be fetched.
    pub async fn fetch_all(&self) -> Result<Vec<FilingRecord>> {
        let mut records = Vec::new();
        let mut from = 0u64;
        let mut pages = 0usize;

        loop {
            if self.config.max_pages.is_some_and(|max| pages >= max) {
                tracing::info!(pages, "page limit reached");
                break;
            }
            let page = self.fetch_page(from).await?;
            if page.is_empty() {
                break;
            }
            pages += 1;
            tracing::info!(
                page = pages,
                rows = page.len(),
                total = records.len() + page.len(),
                "filing page fetched"
            );
            records.extend(page);
            from += u64::from(self.config.page_size);
            tokio::time::sleep(self.config.page_delay).await;
        }

        Ok(records)
    }
}

/// Write the filing list as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns an IO or JSON error.
pub async fn save_manifest(path: &Path, records: &[FilingRecord]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// # Errors
///
/// Returns an IO or JSON error.
pub async fn load_manifest(path: &Path) -> Result<Vec<FilingRecord>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
