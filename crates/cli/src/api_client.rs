use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    secret: String,
}

impl ApiClient {
    pub fn new(base_url: &str, secret: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid server URL")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            secret: secret.to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("failed to build API URL")
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Revalidate a single path, a single tag, or both.
    pub async fn revalidate(
        &self,
        path: Option<&str>,
        tag: Option<&str>,
    ) -> Result<RevalidateResponse> {
        let url = self.url("/api/revalidate")?;
        let body = RevalidateRequest {
            secret: &self.secret,
            path,
            tag,
        };
        self.send_json(self.http.post(url).json(&body)).await
    }

    /// Revalidate a named scope (`deletions`, `nuclear`, `rebuild`).
    pub async fn revalidate_scope(&self, scope: &str) -> Result<RevalidateResponse> {
        let url = self.url(&format!("/api/revalidate/{scope}"))?;
        let body = SecretRequest {
            secret: &self.secret,
        };
        self.send_json(self.http.post(url).json(&body)).await
    }

    /// Revalidate every page that renders one content entity.
    pub async fn revalidate_content(
        &self,
        entity: &str,
        slug: Option<&str>,
    ) -> Result<RevalidateResponse> {
        let url = self.url("/api/revalidate/content")?;
        let body = ContentRequest {
            secret: &self.secret,
            entity,
            slug,
        };
        self.send_json(self.http.post(url).json(&body)).await
    }

    pub async fn deploy(&self) -> Result<DeployResponse> {
        let url = self.url("/api/deploy")?;
        let body = SecretRequest {
            secret: &self.secret,
        };
        self.send_json(self.http.post(url).json(&body)).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.url("/api/health")?;
        self.send_json(self.http.get(url)).await
    }
}

#[derive(Debug, Serialize)]
struct RevalidateRequest<'a> {
    secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SecretRequest<'a> {
    secret: &'a str,
}

#[derive(Debug, Serialize)]
struct ContentRequest<'a> {
    secret: &'a str,
    entity: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct RevalidateResponse {
    pub success: bool,
    pub revalidated: bool,
    pub message: String,
    pub error: Option<String>,
    pub status: String,
    #[serde(default)]
    pub outcomes: Vec<OutcomeResponse>,
    pub now: i64,
}

#[derive(Debug, Deserialize)]
pub struct OutcomeResponse {
    pub target: TargetResponse,
    pub succeeded: bool,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TargetResponse {
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct DeployResponse {
    pub success: bool,
    pub message: String,
    pub upstream_status: u16,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
}
