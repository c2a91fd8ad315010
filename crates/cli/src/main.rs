//! Operator CLI for the content revalidator.

mod api_client;

use anyhow::{Context, Result};
use api_client::{ApiClient, RevalidateResponse};
use clap::{ArgGroup, Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use revalidator_core::{ContentEntity, NamedScope};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "revalctl")]
#[command(about = "Operator CLI for the content revalidator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ClientConfigArgs {
    /// Client config file path
    #[arg(long, env = "REVALIDATOR_CLIENT_CONFIG")]
    client_config: Option<String>,
}

#[derive(Args, Clone)]
struct ApiArgs {
    /// Server URL (overrides client config)
    #[arg(long)]
    server: Option<String>,

    /// Revalidation secret (overrides client config)
    #[arg(long)]
    secret: Option<String>,

    /// Profile to use from client config (default: default_profile)
    #[arg(long)]
    profile: Option<String>,

    #[command(flatten)]
    client: ClientConfigArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Revalidate a path, a tag, or both
    #[command(group(ArgGroup::new("target").required(true).multiple(true).args(["path", "tag"])))]
    Revalidate {
        /// Route to invalidate (e.g., /work)
        #[arg(long)]
        path: Option<String>,
        /// Data tag to invalidate (e.g., projects)
        #[arg(long)]
        tag: Option<String>,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Revalidate a named scope: deletions, nuclear or rebuild
    Scope {
        #[arg(value_parser = parse_scope)]
        scope: NamedScope,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Revalidate every page that renders a content entity
    Content {
        /// Entity kind (project, service, faq, process_step, testimonial, page)
        #[arg(value_parser = parse_entity)]
        entity: ContentEntity,
        /// Slug of the changed item
        #[arg(long)]
        slug: Option<String>,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Trigger the configured deploy hook
    Deploy {
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Check server health and version
    Health {
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Save a server URL and secret as a named profile
    Login {
        /// Local alias for the server
        alias: String,
        /// Server base URL (e.g., https://studio.example.com)
        url: String,
        /// Secret value (avoid if possible; prefer --secret-stdin)
        #[arg(long)]
        secret: Option<String>,
        /// Read secret from stdin
        #[arg(long, default_value_t = false)]
        secret_stdin: bool,
        /// Make this profile the default
        #[arg(long, default_value_t = false)]
        set_default: bool,
        #[command(flatten)]
        client: ClientConfigArgs,
    },
    /// Select the default profile
    Use {
        /// Profile alias to select
        alias: String,
        #[command(flatten)]
        client: ClientConfigArgs,
    },
}

fn parse_scope(s: &str) -> Result<NamedScope, String> {
    NamedScope::parse(s).map_err(|e| e.to_string())
}

fn parse_entity(s: &str) -> Result<ContentEntity, String> {
    ContentEntity::parse(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let Cli { command } = Cli::parse();

    match command {
        Commands::Revalidate { path, tag, api } => {
            let client = get_api_client(&api).await?;
            let response = client
                .revalidate(path.as_deref(), tag.as_deref())
                .await?;
            report(response)
        }
        Commands::Scope { scope, api } => {
            let client = get_api_client(&api).await?;
            report(client.revalidate_scope(scope.as_str()).await?)
        }
        Commands::Content { entity, slug, api } => {
            let client = get_api_client(&api).await?;
            report(
                client
                    .revalidate_content(entity.as_str(), slug.as_deref())
                    .await?,
            )
        }
        Commands::Deploy { api } => {
            let client = get_api_client(&api).await?;
            let response = client.deploy().await?;
            println!(
                "{} (upstream status {})",
                response.message, response.upstream_status
            );
            Ok(())
        }
        Commands::Health { api } => handle_health_command(&api).await,
        Commands::Login {
            alias,
            url,
            secret,
            secret_stdin,
            set_default,
            client,
        } => handle_login_command(&alias, &url, secret, secret_stdin, set_default, &client).await,
        Commands::Use { alias, client } => handle_use_command(&alias, &client).await,
    }
}

/// Print a revalidation response. A response without `success` is an error exit.
fn report(response: RevalidateResponse) -> Result<()> {
    println!("{}", response.message);
    for outcome in &response.outcomes {
        let marker = if outcome.succeeded { "ok  " } else { "FAIL" };
        match &outcome.error {
            Some(error) => println!(
                "  {marker} {}:{} ({error})",
                outcome.target.kind, outcome.target.value
            ),
            None => println!("  {marker} {}:{}", outcome.target.kind, outcome.target.value),
        }
    }

    if !response.success {
        let detail = response.error.unwrap_or_else(|| response.status.clone());
        anyhow::bail!("revalidation did not fully succeed: {detail}");
    }
    Ok(())
}

async fn handle_health_command(api: &ApiArgs) -> Result<()> {
    // Health is unauthenticated, so a server URL alone is enough.
    let server = match &api.server {
        Some(server) => server.clone(),
        None => resolve_api_config(api).await?.0,
    };
    let client = ApiClient::new(&normalize_base_url(&server)?, "")?;
    let health = client.health().await?;
    println!("Status:  {}", health.status);
    println!("Version: {}", health.version);
    println!("Backend: {}", health.backend);
    Ok(())
}

async fn resolve_api_config(api: &ApiArgs) -> Result<(String, String)> {
    match (&api.server, &api.secret) {
        (Some(server), Some(secret)) => return Ok((server.clone(), secret.clone())),
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!("missing paired flag: use both --server and --secret");
        }
        (None, None) => {}
    }

    let server_env = std::env::var("REVALIDATOR_SERVER").ok();
    let secret_env = std::env::var("REVALIDATOR_SECRET").ok();

    match (server_env, secret_env) {
        (Some(server), Some(secret)) => return Ok((server, secret)),
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!(
                "missing paired env var: set both REVALIDATOR_SERVER and REVALIDATOR_SECRET"
            );
        }
        (None, None) => {}
    }

    let config_path = client_config_path(api.client.client_config.as_deref())?;
    let config = load_client_config(&config_path).await?;

    let profile_name = api
        .profile
        .as_ref()
        .or(config.default_profile.as_ref())
        .ok_or_else(|| anyhow::anyhow!("no profile specified and no default_profile set"))?;

    let profile = config
        .profiles
        .get(profile_name)
        .ok_or_else(|| anyhow::anyhow!("profile '{}' not found in client config", profile_name))?;

    Ok((profile.url.clone(), profile.secret.clone()))
}

async fn get_api_client(api: &ApiArgs) -> Result<ApiClient> {
    let (server, secret) = resolve_api_config(api).await?;
    let base_url = normalize_base_url(&server)?;
    ApiClient::new(&base_url, &secret)
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Default)]
#[serde(default)]
struct ClientConfig {
    default_profile: Option<String>,
    profiles: BTreeMap<String, Profile>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
struct Profile {
    url: String,
    secret: String,
}

async fn handle_login_command(
    alias: &str,
    url: &str,
    secret: Option<String>,
    secret_stdin: bool,
    set_default: bool,
    client: &ClientConfigArgs,
) -> Result<()> {
    let secret = read_secret(secret, secret_stdin)?;
    let base_url = normalize_base_url(url)?;
    let config_path = client_config_path(client.client_config.as_deref())?;

    let health = ApiClient::new(&base_url, &secret)?
        .health()
        .await
        .with_context(|| format!("server at {base_url} is not reachable"))?;

    let mut config = load_client_config(&config_path).await?;
    config.profiles.insert(
        alias.to_string(),
        Profile {
            url: base_url.clone(),
            secret,
        },
    );

    if set_default || config.default_profile.is_none() {
        config.default_profile = Some(alias.to_string());
    }

    save_client_config(&config_path, &config).await?;

    println!("Saved profile '{alias}'");
    println!("  URL: {base_url}");
    println!("  Server version: {} ({} backend)", health.version, health.backend);
    if config.default_profile.as_deref() == Some(alias) {
        println!("  Default profile");
    }
    Ok(())
}

async fn handle_use_command(alias: &str, client: &ClientConfigArgs) -> Result<()> {
    let config_path = client_config_path(client.client_config.as_deref())?;
    let mut config = load_client_config(&config_path).await?;

    if !config.profiles.contains_key(alias) {
        anyhow::bail!("profile '{alias}' not found in client config");
    }

    config.default_profile = Some(alias.to_string());
    save_client_config(&config_path, &config).await?;

    println!("Default profile set to '{alias}'");
    Ok(())
}

fn client_config_path(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = std::env::var_os("REVALIDATOR_CLIENT_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(path) => PathBuf::from(path),
        None => {
            let home = std::env::var_os("HOME")
                .ok_or_else(|| anyhow::anyhow!("HOME not set; set REVALIDATOR_CLIENT_CONFIG"))?;
            PathBuf::from(home).join(".config")
        }
    };

    Ok(base.join("revalidator").join("client.toml"))
}

async fn load_client_config(path: &Path) -> Result<ClientConfig> {
    let mut figment = Figment::new();

    if path.exists() {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("REVALIDATOR_").split("__"));

    match figment.extract() {
        Ok(config) => Ok(config),
        Err(_) if !path.exists() => Ok(ClientConfig::default()),
        Err(err) => Err(anyhow::anyhow!(err).context("failed to load client configuration")),
    }
}

async fn save_client_config(path: &Path, config: &ClientConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = toml::to_string_pretty(config)?;

    tokio::fs::write(path, contents).await?;

    // 0600: the file holds secrets
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(path, perms).await?;
    }

    Ok(())
}

fn read_secret(secret: Option<String>, secret_stdin: bool) -> Result<String> {
    if let Some(secret) = secret {
        return Ok(secret);
    }
    if secret_stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        let secret = buf.trim().to_string();
        if secret.is_empty() {
            anyhow::bail!("secret read from stdin is empty");
        }
        return Ok(secret);
    }
    anyhow::bail!("secret required: use --secret or --secret-stdin");
}

fn normalize_base_url(url: &str) -> Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("server URL must start with http:// or https://");
    }
    Ok(url.trim_end_matches('/').to_string())
}
