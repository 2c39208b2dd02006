//! Bounded-concurrency filing downloader.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{IndexError, Result};
use crate::filings::FilingRecord;
use crate::html::{html_to_text, safe_filename};

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("tenk/", env!("CARGO_PKG_VERSION")).into(),
            timeout: Duration::from_secs(30),
            concurrency: 10,
        }
    }
}

/// Outcome of a download run.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub saved: Vec<PathBuf>,
    /// Records without a detail link, plus older filings of a company that
    /// already has one queued.
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Downloads filing pages and writes one text file per company.
#[derive(Clone)]
pub struct FilingFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
    semaphore: Arc<Semaphore>,
}

impl FilingFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client, config: FetcherConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            client,
            config,
            semaphore,
        }
    }

    /// Download every linked filing into `out_dir`. Individual failures are
    /// logged and collected; the run itself only fails if `out_dir` cannot be
    /// created.
    ///
    /// Records are expected newest first. Only the first record per output
    /// file is downloaded.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the output directory cannot be created.
    pub async fn fetch_all(&self, records: &[FilingRecord], out_dir: &Path) -> Result<FetchReport> {
        tokio::fs::create_dir_all(out_dir).await?;

        let mut report = FetchReport::default();
        let mut join_set = JoinSet::new();
        let mut queued = HashSet::new();

        for record in records {
            let Some(url) = record.link_to_filing_details.clone().filter(|u| !u.is_empty()) else {
                report.skipped += 1;
                continue;
            };
            let company = record
                .company_name
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Unknown".to_owned());
            let out_path = out_dir.join(format!("{}.txt", safe_filename(&company)));
            if !queued.insert(out_path.clone()) {
                tracing::debug!(company = %company, "skipping older filing");
                report.skipped += 1;
                continue;
            }
            let fetcher = self.clone();
            let semaphore = Arc::clone(&self.semaphore);

            join_set.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => fetcher.fetch_one(&url, &out_path).await,
                    Err(e) => Err(IndexError::Other(format!("semaphore closed: {e}"))),
                };
                (company, out_path, outcome)
            });
        }

        let total = join_set.len();
        while let Some(result) = join_set.join_next().await {
            let Ok((company, path, outcome)) = result else {
                tracing::warn!("filing download task panicked");
                report.errors.push("download task panicked".into());
                continue;
            };
            match outcome {
                Ok(()) => {
                    tracing::info!(
                        company = %company,
                        path = %path.display(),
                        progress = format_args!("{}/{total}", report.saved.len() + report.errors.len() + 1),
                        "filing saved"
                    );
                    report.saved.push(path);
                }
                Err(e) => {
                    tracing::warn!(company = %company, "filing download failed: {e:#}");
                    report.errors.push(format!("{company}: {e}"));
                }
            }
        }

        Ok(report)
    }

    async fn fetch_one(&self, url: &str, out_path: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .timeout(self.config.timeout)
            .send()
            .await?
            .error_for_status()?;
        let html = response.text().await?;
        let text = tokio::task::spawn_blocking(move || html_to_text(&html))
            .await
            .map_err(|e| IndexError::Other(format!("html extraction task failed: {e}")))?;
        tokio::fs::write(out_path, text).await?;
        Ok(())
    }
}
