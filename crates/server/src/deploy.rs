//! Deploy hook forwarding.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use reqwest::Url;
use revalidator_core::config::SiteConfig;
use serde::Serialize;
use tracing::{info, warn};

/// Result of a deploy hook call that the upstream accepted.
#[derive(Clone, Debug, Serialize)]
pub struct DeployOutcome {
    /// Status returned by the deploy hook.
    pub upstream_status: u16,
}

/// POSTs to the configured deploy hook to rebuild the site.
#[derive(Clone)]
pub struct DeployHook {
    http: reqwest::Client,
    url: Option<Url>,
}

impl DeployHook {
    pub fn from_config(config: &SiteConfig) -> reqwest::Result<Self> {
        let url = config
            .deploy_hook_url
            .as_deref()
            .and_then(|url| match Url::parse(url) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, "site.deploy_hook_url is not a valid URL, deploy hook disabled");
                    None
                }
            });
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { http, url })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Trigger the hook.
    ///
    /// Not configured is `Unavailable`; a transport failure or non-2xx reply is `Upstream`.
    pub async fn trigger(&self) -> ApiResult<DeployOutcome> {
        let Some(url) = &self.url else {
            metrics::DEPLOY_HOOKS.with_label_values(&["unconfigured"]).inc();
            return Err(ApiError::Unavailable(
                "no deploy hook URL configured".to_string(),
            ));
        };

        let response = match self.http.post(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::DEPLOY_HOOKS.with_label_values(&["failure"]).inc();
                // The hook URL embeds its own credential; never log it.
                return Err(ApiError::Upstream(format!(
                    "deploy hook request failed: {}",
                    e.without_url()
                )));
            }
        };

        let status = response.status();
        if !status.is_success() {
            metrics::DEPLOY_HOOKS.with_label_values(&["failure"]).inc();
            return Err(ApiError::Upstream(format!(
                "deploy hook returned {}",
                status.as_u16()
            )));
        }

        metrics::DEPLOY_HOOKS.with_label_values(&["success"]).inc();
        info!(status = status.as_u16(), "Deploy hook triggered");
        Ok(DeployOutcome {
            upstream_status: status.as_u16(),
        })
    }

    /// Trigger on a spawned task, logging the outcome.
    pub fn spawn_trigger(&self) -> tokio::task::JoinHandle<()> {
        let hook = self.clone();
        tokio::spawn(async move {
            if let Err(e) = hook.trigger().await {
                warn!(error = %e, "Background deploy hook failed");
            }
        })
    }
}

impl std::fmt::Debug for DeployHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployHook")
            .field("configured", &self.is_configured())
            .finish()
    }
}
