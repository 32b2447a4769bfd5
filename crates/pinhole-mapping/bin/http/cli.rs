use clap::{Parser, ValueEnum};
use pinhole_telemetry::{LogFormat, OtlpProtocol};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "PINHOLE_MAPPING_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "PINHOLE_MAPPING_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "PINHOLE_MAPPING_MYSQL_DSN";
pub const RESERVATION_URL_ENV: &str = "PINHOLE_RESERVATION_URL";
pub const LOCAL_RESERVATION_URL_ENV: &str = "PINHOLE_LOCAL_RESERVATION_URL";
pub const RESERVATION_TIMEOUT_MS_ENV: &str = "PINHOLE_RESERVATION_TIMEOUT_MS";
pub const STORE_TIMEOUT_MS_ENV: &str = "PINHOLE_MAPPING_STORE_TIMEOUT_MS";
pub const UPDATE_RETRY_ATTEMPTS_ENV: &str = "PINHOLE_MAPPING_UPDATE_RETRY_ATTEMPTS";
pub const CACHE_CAPACITY_ENV: &str = "PINHOLE_REDIRECT_CACHE_CAPACITY";
pub const CACHE_TTL_SECS_ENV: &str = "PINHOLE_REDIRECT_CACHE_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "PINHOLE_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "PINHOLE_OTLP_ENDPOINT";
pub const OTLP_PROTOCOL_ENV: &str = "PINHOLE_OTLP_PROTOCOL";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_RESERVATION_URL: &str = "http://127.0.0.1:8081";
pub const DEFAULT_RESERVATION_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_UPDATE_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_LOG_FORMAT: &str = "pretty";
pub const DEFAULT_OTLP_PROTOCOL: &str = "grpc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pinhole-mapping-http-server")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Base URL of the reservation service.
    #[arg(long, env = RESERVATION_URL_ENV, default_value = DEFAULT_RESERVATION_URL)]
    pub reservation_url: String,

    /// Reservation service base URL for requests from local callers.
    #[arg(long, env = LOCAL_RESERVATION_URL_ENV)]
    pub local_reservation_url: Option<String>,

    #[arg(long, env = RESERVATION_TIMEOUT_MS_ENV, default_value_t = DEFAULT_RESERVATION_TIMEOUT_MS)]
    pub reservation_timeout_ms: u64,

    /// Timeout of the mapping write that follows a reservation.
    #[arg(long, env = STORE_TIMEOUT_MS_ENV, default_value_t = DEFAULT_STORE_TIMEOUT_MS)]
    pub store_timeout_ms: u64,

    #[arg(long, env = UPDATE_RETRY_ATTEMPTS_ENV, default_value_t = DEFAULT_UPDATE_RETRY_ATTEMPTS)]
    pub update_retry_attempts: u32,

    #[arg(long, env = CACHE_CAPACITY_ENV, default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: u64,

    #[arg(long, env = CACHE_TTL_SECS_ENV, default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, default_value = DEFAULT_LOG_FORMAT)]
    pub log_format: LogFormat,

    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = OTLP_PROTOCOL_ENV, default_value = DEFAULT_OTLP_PROTOCOL)]
    pub otlp_protocol: OtlpProtocol,
}

impl CLI {
    pub fn reservation_timeout(&self) -> Duration {
        Duration::from_millis(self.reservation_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
