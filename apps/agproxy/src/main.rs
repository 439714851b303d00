use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use agproxy_auth::{load_accounts, FileTokenCache, OauthConfig, OauthExchanger, RotationManager};
use agproxy_core::{Core, CoreState};
use agproxy_upstream::UpstreamConfig;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("agproxy failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let pool = load_accounts(Path::new(&cli.accounts))?;
    let enabled = pool.iter().filter(|account| !account.disabled).count();
    info!(
        accounts = pool.len(),
        enabled,
        path = %cli.accounts,
        "account pool loaded"
    );

    let cache = Arc::new(FileTokenCache::new(PathBuf::from(&cli.token_cache)));
    let exchanger = Arc::new(OauthExchanger::new(OauthConfig::default()));
    let rotation = RotationManager::new(pool, cache, exchanger);

    let core = Core::new(CoreState {
        rotation,
        upstream: UpstreamConfig::default(),
        api_key: cli.api_key.clone(),
    });
    info!(
        api_key_validation = if cli.api_key.is_some() { "enabled" } else { "disabled" },
        "core ready"
    );

    let app = core
        .router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let bind = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("agproxy=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
