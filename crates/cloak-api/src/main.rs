//! cloak-api server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! claims store, builds the introspection client for the configured identity
//! service, and serves the attribute endpoints over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use cloak_api::{AppState, ServerConfig, router};
use cloak_core::permissions::ClaimRegistry;
use cloak_introspect::{IntrospectorConfig, TokenIntrospector};
use cloak_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Cloak attribute server")]
struct Cli {
  /// Path to the configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

fn load_config(path: PathBuf) -> anyhow::Result<ServerConfig> {
  // The file may be absent; CLOAK_* environment variables can stand in for
  // any of its keys.
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("CLOAK"))
    .build()
    .context("failed to read configuration")?;
  settings
    .try_deserialize()
    .context("configuration is incomplete or mistyped")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = load_config(cli.config)?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let introspector = TokenIntrospector::new(IntrospectorConfig {
    base_url:      server_cfg.account_manager_url.clone(),
    service_token: server_cfg.account_manager_token.clone(),
  })
  .context("failed to build identity-service client")?;

  let app = router(AppState {
    store:     Arc::new(store),
    validator: Arc::new(introspector),
    registry:  Arc::new(ClaimRegistry::builtin()),
  });

  let listener = TcpListener::bind((server_cfg.host.as_str(), server_cfg.port))
    .await
    .with_context(|| {
      format!("failed to bind {}:{}", server_cfg.host, server_cfg.port)
    })?;
  tracing::info!("listening on http://{}", listener.local_addr()?);

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  match path.to_string_lossy().strip_prefix("~/") {
    Some(rest) => match std::env::var_os("HOME") {
      Some(home) => PathBuf::from(home).join(rest),
      None => path.to_path_buf(),
    },
    None => path.to_path_buf(),
  }
}
