//! Revalidation server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use revalidator_core::config::AppConfig;
use revalidator_server::{AppState, create_router};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Content revalidation coordinator
#[derive(Parser, Debug)]
#[command(name = "revalidatord")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "REVALIDATOR_CONFIG",
        default_value = "config/revalidator.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("revalidatord v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    revalidator_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let backend =
        revalidator_cache::from_config(&config.backend).context("failed to initialize cache backend")?;
    backend
        .health_check()
        .await
        .context("cache backend health check failed")?;
    tracing::info!(backend = backend.backend_name(), "Cache backend initialized");

    let bind = config.server.bind.clone();
    let state = AppState::new(config, backend).context("invalid configuration")?;

    if let Some(cleanup_interval) = state.rate_limit_cleanup_interval() {
        revalidator_server::ratelimit::spawn_cleanup_task(state.rate_limit.clone(), cleanup_interval);
        tracing::info!(
            interval_secs = cleanup_interval.as_secs(),
            "Rate limiter cleanup task spawned"
        );
    }

    let app = create_router(state);

    let addr: SocketAddr = bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    // ConnectInfo is needed for per-IP rate limiting
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from the optional TOML file and `REVALIDATOR_` env vars.
///
/// The legacy secret variables are read once here, and only when no secret
/// was configured.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let mut config: AppConfig = figment
        .merge(Env::prefixed("REVALIDATOR_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    if let Some(var) = config
        .revalidation
        .apply_legacy_env(|name| std::env::var(name).ok())
    {
        tracing::warn!(
            variable = var,
            "Using legacy secret variable; set REVALIDATOR_REVALIDATION__SECRET instead"
        );
    }

    if config.revalidation.secret.is_empty() {
        anyhow::bail!(
            "No revalidation secret configured.\n\n\
             Provide one via:\n  \
             1. Config file: [revalidation] secret = \"...\" in {path}\n  \
             2. Environment: REVALIDATOR_REVALIDATION__SECRET=...\n\n\
             Set REVALIDATOR_CONFIG to choose a different config file."
        );
    }

    Ok(config)
}
