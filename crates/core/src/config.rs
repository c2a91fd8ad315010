//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variables older deployments used for the secret, in lookup order.
pub const LEGACY_SECRET_VARS: [&str; 2] = ["REVALIDATION_SECRET", "NEXT_PUBLIC_REVALIDATION_SECRET"];

/// Secrets shorter than this are accepted with a warning.
const MIN_RECOMMENDED_SECRET_LEN: usize = 16;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, ensure this endpoint is network-restricted
    /// to authorized Prometheus scraper IPs only at the infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Revalidation secret configuration.
///
/// The secret is resolved once at startup. `previous_secrets` keeps callers
/// working while a rotated secret is rolled out to them.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RevalidationConfig {
    /// Shared secret callers must present.
    #[serde(default)]
    pub secret: String,
    /// Secrets that are still accepted during a rotation.
    #[serde(default)]
    pub previous_secrets: Vec<String>,
}

impl fmt::Debug for RevalidationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevalidationConfig")
            .field("secret", &"<redacted>")
            .field("previous_secrets", &self.previous_secrets.len())
            .finish()
    }
}

impl RevalidationConfig {
    /// Create a test configuration whose secret is `correct`.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            secret: "correct".to_string(),
            previous_secrets: Vec::new(),
        }
    }

    /// Fill an unset secret from the legacy environment variable names.
    ///
    /// Returns the name of the variable that supplied the secret, if any.
    /// A configured secret always wins.
    pub fn apply_legacy_env<F>(&mut self, lookup: F) -> Option<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.secret.is_empty() {
            return None;
        }

        for var in LEGACY_SECRET_VARS {
            if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                self.secret = value;
                return Some(var);
            }
        }
        None
    }

    /// Validate the secret configuration.
    /// Returns warnings for weak but usable settings.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        if self.secret.is_empty() {
            return Err("revalidation.secret is required. \
                 Set REVALIDATOR_REVALIDATION__SECRET or revalidation.secret in the config file."
                .to_string());
        }

        let mut warnings = Vec::new();
        if self.secret.len() < MIN_RECOMMENDED_SECRET_LEN {
            warnings.push(format!(
                "revalidation.secret is only {} characters; \
                 at least {} random characters are recommended.",
                self.secret.len(),
                MIN_RECOMMENDED_SECRET_LEN
            ));
        }
        if self.previous_secrets.iter().any(|s| s.is_empty()) {
            warnings.push("revalidation.previous_secrets contains an empty entry; it is ignored.".to_string());
        }
        Ok(warnings)
    }
}

/// Cache backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-process tagged page cache.
    Memory,
    /// Forward each invalidation to an upstream purge endpoint.
    Http {
        /// Purge endpoint URL (e.g., "https://site.example.com/api/purge").
        endpoint: String,
        /// Bearer token sent to the endpoint.
        /// WARNING: Prefer env vars over storing secrets in config files.
        token: Option<String>,
        /// Per-call timeout in seconds.
        #[serde(default = "default_backend_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_backend_timeout_secs() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Memory
    }
}

impl BackendConfig {
    /// Validate backend configuration.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Memory => Ok(()),
            Self::Http {
                endpoint,
                timeout_secs,
                ..
            } => {
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    return Err(format!(
                        "backend.endpoint must start with http:// or https://, got '{endpoint}'"
                    ));
                }
                if *timeout_secs == 0 {
                    return Err("backend.timeout_secs must be at least 1".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Public site configuration used for page warming and deploy hooks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the rendered site (e.g., "https://studio.example.com").
    pub base_url: Option<String>,
    /// Deploy hook URL that rebuilds the site when POSTed to.
    pub deploy_hook_url: Option<String>,
    /// Re-fetch invalidated public pages in the background.
    #[serde(default)]
    pub warm_pages: bool,
    /// Trigger the deploy hook after a successful nuclear revalidation.
    #[serde(default)]
    pub deploy_on_nuclear: bool,
    /// Timeout for warm fetches and deploy hook calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            deploy_hook_url: None,
            warm_pages: false,
            deploy_on_nuclear: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SiteConfig {
    /// Outbound request timeout.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Validate site configuration.
    /// Returns warnings for settings that will have no effect.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        for (name, url) in [
            ("site.base_url", &self.base_url),
            ("site.deploy_hook_url", &self.deploy_hook_url),
        ] {
            if let Some(url) = url
                && !url.starts_with("http://")
                && !url.starts_with("https://")
            {
                return Err(format!("{name} must start with http:// or https://"));
            }
        }

        if self.warm_pages && self.base_url.is_none() {
            warnings.push("site.warm_pages is enabled but site.base_url is not set; pages will not be warmed.".to_string());
        }
        if self.deploy_on_nuclear && self.deploy_hook_url.is_none() {
            warnings.push("site.deploy_on_nuclear is enabled but site.deploy_hook_url is not set.".to_string());
        }

        Ok(warnings)
    }
}

/// Rate limiting configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable per-IP rate limiting of /api routes (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Requests allowed per minute per client IP.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Burst size allowed above the steady rate.
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
    /// Maximum tracked client IPs before new ones are rejected.
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
    /// Seconds after which an idle client entry is evicted.
    #[serde(default = "default_entry_ttl_secs")]
    pub entry_ttl_secs: u64,
    /// Seconds between stale entry cleanups.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Proxies whose X-Forwarded-For / X-Real-IP headers are trusted.
    /// Empty (default) trusts none; ["*"] trusts all.
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_burst_size() -> u32 {
    10
}

fn default_max_entries() -> u32 {
    100_000
}

fn default_entry_ttl_secs() -> u64 {
    600
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_minute: default_requests_per_minute(),
            burst_size: default_burst_size(),
            max_entries: default_max_entries(),
            entry_ttl_secs: default_entry_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    /// Validate rate limit configuration for dangerous settings.
    /// Returns warnings for configs that are insecure but allowed,
    /// and errors for configs that are unsafe and should be rejected.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if !self.enabled {
            return Ok(warnings);
        }

        // Zero would make tokio::time::interval panic
        if self.cleanup_interval_secs == 0 {
            return Err("rate_limit.cleanup_interval_secs cannot be 0. \
                 Use a value >= 1 second."
                .to_string());
        }

        if self.trusted_proxies.len() == 1 && self.trusted_proxies[0] == "*" {
            warnings.push(
                "rate_limit.trusted_proxies=['*'] trusts ALL forwarded headers. \
                 This allows clients to spoof their IP address and bypass rate limits."
                    .to_string(),
            );
        }

        if self.entry_ttl_secs < 120 {
            warnings.push(format!(
                "rate_limit.entry_ttl_secs={} is very short. \
                 Entries may be evicted before rate limits reset. \
                 Recommended minimum: 120 seconds.",
                self.entry_ttl_secs
            ));
        }

        Ok(warnings)
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Revalidation secret configuration.
    #[serde(default)]
    pub revalidation: RevalidationConfig,
    /// Cache backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Public site configuration.
    #[serde(default)]
    pub site: SiteConfig,
    /// Rate limiting configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses the memory backend and the secret `correct`.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            revalidation: RevalidationConfig::for_testing(),
            backend: BackendConfig::Memory,
            site: SiteConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Validate every section. Returns collected warnings, or the first error.
    pub fn validate(&self) -> crate::Result<Vec<String>> {
        let mut warnings = self.revalidation.validate().map_err(crate::Error::Config)?;
        self.backend.validate().map_err(crate::Error::Config)?;
        warnings.extend(self.site.validate().map_err(crate::Error::Config)?);
        warnings.extend(self.rate_limit.validate().map_err(crate::Error::Config)?);
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testing_config_is_valid() {
        let warnings = AppConfig::for_testing().validate().unwrap();
        // "correct" is shorter than the recommended length
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("revalidation.secret"));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let mut config = AppConfig::for_testing();
        config.revalidation.secret.clear();
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn legacy_env_fills_missing_secret_in_order() {
        let mut config = RevalidationConfig::default();
        let used = config.apply_legacy_env(|name| match name {
            "REVALIDATION_SECRET" => None,
            "NEXT_PUBLIC_REVALIDATION_SECRET" => Some("from-public".to_string()),
            _ => None,
        });
        assert_eq!(used, Some("NEXT_PUBLIC_REVALIDATION_SECRET"));
        assert_eq!(config.secret, "from-public");

        let mut config = RevalidationConfig::default();
        let used = config.apply_legacy_env(|_| Some("first".to_string()));
        assert_eq!(used, Some("REVALIDATION_SECRET"));
        assert_eq!(config.secret, "first");
    }

    #[test]
    fn legacy_env_never_overrides_configured_secret() {
        let mut config = RevalidationConfig::for_testing();
        let used = config.apply_legacy_env(|_| Some("other".to_string()));
        assert!(used.is_none());
        assert_eq!(config.secret, "correct");
    }

    #[test]
    fn revalidation_debug_redacts_secret() {
        let config = RevalidationConfig::for_testing();
        assert!(!format!("{config:?}").contains("correct"));
    }

    #[test]
    fn http_backend_requires_scheme() {
        let backend = BackendConfig::Http {
            endpoint: "purge.example.com".to_string(),
            token: None,
            timeout_secs: 5,
        };
        assert!(backend.validate().is_err());

        let backend = BackendConfig::Http {
            endpoint: "https://purge.example.com".to_string(),
            token: None,
            timeout_secs: 0,
        };
        assert!(backend.validate().is_err());
    }

    #[test]
    fn backend_deserializes_tagged() {
        let backend: BackendConfig = serde_json::from_str(
            r#"{"type":"http","endpoint":"https://site.example.com/api/purge"}"#,
        )
        .unwrap();
        match backend {
            BackendConfig::Http { timeout_secs, .. } => assert_eq!(timeout_secs, 10),
            other => panic!("unexpected backend: {other:?}"),
        }
    }

    #[test]
    fn site_warns_on_ineffective_settings() {
        let site = SiteConfig {
            warm_pages: true,
            deploy_on_nuclear: true,
            ..Default::default()
        };
        assert_eq!(site.validate().unwrap().len(), 2);

        let site = SiteConfig {
            base_url: Some("studio.example.com".to_string()),
            ..Default::default()
        };
        assert!(site.validate().is_err());
    }

    #[test]
    fn rate_limit_zero_cleanup_rejected_only_when_enabled() {
        let mut config = RateLimitConfig {
            cleanup_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        config.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rate_limit_trust_all_warns() {
        let config = RateLimitConfig {
            enabled: true,
            trusted_proxies: vec!["*".to_string()],
            ..Default::default()
        };
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.contains("trusted_proxies")));
    }
}
