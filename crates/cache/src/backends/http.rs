//! HTTP purge-forwarding backend.
//!
//! Each invalidation becomes one `POST {endpoint}` with a JSON body
//! `{"type": "path" | "tag", "value": "..."}`. Any 2xx response counts as
//! success.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheInvalidator;
use async_trait::async_trait;
use reqwest::Url;
use revalidator_core::TargetKind;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Maximum upstream error body kept in error messages.
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct PurgeRequest<'a> {
    #[serde(rename = "type")]
    kind: TargetKind,
    value: &'a str,
}

/// Forwards invalidations to an upstream purge endpoint.
pub struct HttpBackend {
    http: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> CacheResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CacheError::Config(format!("invalid backend endpoint: {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn purge(&self, kind: TargetKind, value: &str) -> CacheResult<()> {
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .json(&PurgeRequest { kind, value });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
            return Err(CacheError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "Purge accepted");
        Ok(())
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl CacheInvalidator for HttpBackend {
    async fn invalidate_path(&self, path: &str) -> CacheResult<()> {
        self.purge(TargetKind::Path, path).await
    }

    async fn invalidate_tag(&self, tag: &str) -> CacheResult<()> {
        self.purge(TargetKind::Tag, tag).await
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
