//! Background re-fetching of invalidated public pages.

use crate::metrics;
use reqwest::Url;
use reqwest::header::CACHE_CONTROL;
use revalidator_core::config::SiteConfig;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Path prefixes that are never warmed.
const SKIPPED_PREFIXES: [&str; 2] = ["/admin", "/api"];

/// Fetches freshly invalidated pages so the next visitor gets a rendered copy.
#[derive(Clone, Debug)]
pub struct PageWarmer {
    http: reqwest::Client,
    base_url: Url,
}

impl PageWarmer {
    /// Build a warmer when warming is enabled and a base URL is configured.
    pub fn from_config(config: &SiteConfig) -> reqwest::Result<Option<Self>> {
        let base_url = match (&config.base_url, config.warm_pages) {
            (Some(base_url), true) => base_url,
            _ => return Ok(None),
        };
        let Ok(base_url) = Url::parse(base_url) else {
            warn!(base_url = %base_url, "site.base_url is not a valid URL, page warming disabled");
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Some(Self { http, base_url }))
    }

    /// Whether `path` is a public page worth warming.
    pub fn is_warmable(path: &str) -> bool {
        !SKIPPED_PREFIXES
            .iter()
            .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")))
    }

    /// URL of `path` under the base URL. Always on the base host, keeping any base path prefix.
    pub fn page_url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
        url
    }

    /// Fetch each warmable path once. Returns how many fetches got a 2xx.
    pub async fn warm(&self, paths: &[String]) -> usize {
        let mut warmed = 0;
        for path in paths.iter().filter(|p| Self::is_warmable(p)) {
            let url = self.page_url(path);

            match self
                .http
                .get(url)
                .header(CACHE_CONTROL, "no-store")
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!(path = %path, status = response.status().as_u16(), "Page warmed");
                    metrics::PAGES_WARMED.with_label_values(&["success"]).inc();
                    warmed += 1;
                }
                Ok(response) => {
                    warn!(path = %path, status = response.status().as_u16(), "Page warm returned error status");
                    metrics::PAGES_WARMED.with_label_values(&["failure"]).inc();
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Page warm failed");
                    metrics::PAGES_WARMED.with_label_values(&["failure"]).inc();
                }
            }
        }
        warmed
    }

    /// Warm `paths` on a spawned task.
    pub fn spawn(&self, paths: Vec<String>) -> JoinHandle<usize> {
        let warmer = self.clone();
        tokio::spawn(async move { warmer.warm(&paths).await })
    }
}
