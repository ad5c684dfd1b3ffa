// stale-repos entry point.
// Wires configuration, the cache store, and the GitHub client, then prints the digest.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stale_repos::cache::{CachingGateway, FileStore, KeyValueStore, MemoryStore, paths};
use stale_repos::config::{Args, ClientConfig, DEFAULT_LOG_FILTER};
use stale_repos::github::GitHubClient;
use stale_repos::report;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "report failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> stale_repos::Result<()> {
    let config = ClientConfig::from_env()?
        .with_base_url(&args.api_url)
        .with_log("stderr");

    let store: Arc<dyn KeyValueStore> = if args.no_persist {
        Arc::new(MemoryStore::new())
    } else {
        let base = args.cache_dir.clone().unwrap_or_else(paths::default_base_dir);
        let store = FileStore::new(&base, &args.namespace);
        info!(dir = %store.dir().display(), "using response cache");
        Arc::new(store)
    };

    let client = GitHubClient::new(&config)?;
    let gateway = CachingGateway::with_options(client, store, &config, args.gateway_options())?;

    let admins = report::get_repository_admins(&gateway, &args.org).await?;
    print!("{}", report::render_admins(&admins));

    let stale = report::get_stale_repos(&gateway, &args.org, Utc::now().date_naive()).await?;
    print!("{}", report::render_repositories(&stale));

    gateway.report_stats();
    let rate_limit = gateway.client().rate_limit();
    info!(
        remaining = rate_limit.remaining,
        limit = rate_limit.limit,
        "GitHub rate limit"
    );
    Ok(())
}
