//! Command-line and environment configuration

use clap::{Parser, ValueEnum};
use directory_core::{DirectoryConfig, IngressOptions, LimiterOptions, RegistryOptions};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Networked Redis store
    Redis,
    /// In-process store, single node only
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Tunnel directory: host routing rules and connector service discovery
#[derive(Parser, Debug)]
#[command(name = "directory-server")]
#[command(about = "Control-plane directory for tunnel relays", long_about = None)]
pub struct Cli {
    /// Listen address
    #[arg(long, env = "DIRECTORY_ADDR", default_value = "0.0.0.0:8000")]
    pub addr: String,

    /// Store backend
    #[arg(long, env = "DIRECTORY_STORE", value_enum, default_value = "redis")]
    pub store: StoreKind,

    /// Redis server address
    #[arg(long, env = "DIRECTORY_REDIS_ADDR", default_value = "127.0.0.1:6379")]
    pub redis_addr: String,

    /// Redis database
    #[arg(long, env = "DIRECTORY_REDIS_DB", default_value_t = 0)]
    pub redis_db: i64,

    /// Separate Redis database for the service registry
    #[arg(long, env = "DIRECTORY_SD_REDIS_DB")]
    pub sd_redis_db: Option<i64>,

    /// TTL of host routing rules
    #[arg(long, env = "DIRECTORY_INGRESS_EXPIRATION", default_value = "1h", value_parser = humantime::parse_duration)]
    pub ingress_expiration: Duration,

    /// Liveness window of registered connectors
    #[arg(long, env = "DIRECTORY_SD_EXPIRATION", default_value = "1m", value_parser = humantime::parse_duration)]
    pub sd_expiration: Duration,

    /// Domain suffix reduced to its first label on lookup
    #[arg(long, env = "DIRECTORY_DOMAIN", default_value = "gost.plus")]
    pub domain: String,

    /// Inbound byte-rate limit per client
    #[arg(long, env = "DIRECTORY_LIMIT_IN", default_value_t = 1_048_576)]
    pub limit_in: i64,

    /// Outbound byte-rate limit per client
    #[arg(long, env = "DIRECTORY_LIMIT_OUT", default_value_t = 1_048_576)]
    pub limit_out: i64,

    /// Deadline for each directory call
    #[arg(long, env = "DIRECTORY_REQUEST_TIMEOUT", default_value = "5s", value_parser = humantime::parse_duration)]
    pub request_timeout: Duration,

    /// Largest accepted request body in bytes
    #[arg(long, env = "DIRECTORY_MAX_BODY_BYTES", default_value_t = directory_http::DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "json")]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig {
            ingress: IngressOptions {
                expiration: self.ingress_expiration,
                domain: self.domain.clone(),
            },
            registry: RegistryOptions {
                expiration: self.sd_expiration,
            },
            limiter: LimiterOptions {
                limit_in: self.limit_in,
                limit_out: self.limit_out,
            },
        }
    }
}
