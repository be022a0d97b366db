use anyhow::Result;
use clap::Parser;
use directory_core::{Directory, KvStore, MemoryStore, RedisStore};
use directory_http::{DirectoryServer, MetricsCollector};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::{Cli, LogFormat, StoreKind};

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn build_directory(cli: &Cli) -> Result<Directory> {
    let config = cli.directory_config();
    let directory = match cli.store {
        StoreKind::Memory => {
            info!("Using in-memory store");
            Directory::new(Arc::new(MemoryStore::new()), config)
        }
        StoreKind::Redis => {
            let rules: Arc<dyn KvStore> =
                Arc::new(RedisStore::connect(&cli.redis_addr, cli.redis_db).await?);
            let services: Arc<dyn KvStore> = match cli.sd_redis_db {
                Some(db) if db != cli.redis_db => {
                    Arc::new(RedisStore::connect(&cli.redis_addr, db).await?)
                }
                _ => rules.clone(),
            };
            Directory::with_stores(rules, services, config)
        }
    };
    Ok(directory)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    info!("Starting directory-server...");
    info!(
        domain = %cli.domain,
        ingress_expiration = ?cli.ingress_expiration,
        sd_expiration = ?cli.sd_expiration,
        "Directory configured"
    );

    let directory = Arc::new(build_directory(&cli).await?);
    let metrics = MetricsCollector::new()?;
    let server = Arc::new(
        DirectoryServer::new(directory, metrics)
            .with_request_timeout(cli.request_timeout)
            .with_max_body_bytes(cli.max_body_bytes),
    );

    let listener = TcpListener::bind(&cli.addr).await?;

    tokio::select! {
        result = server.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received, exiting..."),
    }

    Ok(())
}
