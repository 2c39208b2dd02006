//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

/// Create a shared HTTP client with standard tenk configuration.
///
/// Config: 30s connect timeout, 120s request timeout, rustls TLS,
/// `tenk/{version}` user-agent, redirect limit 10. Individual requests may
/// tighten the timeout with `RequestBuilder::timeout`.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("tenk/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("default HTTP client construction failed: {e}, using bare client");
            reqwest::Client::new()
        })
}
