use clap::{Parser, ValueEnum};
use pinhole_telemetry::{LogFormat, OtlpProtocol};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "PINHOLE_RESERVATION_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "PINHOLE_RESERVATION_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "PINHOLE_RESERVATION_MYSQL_DSN";
pub const POOL_MIN_ENV: &str = "PINHOLE_RESERVATION_POOL_MIN";
pub const POOL_MAX_ENV: &str = "PINHOLE_RESERVATION_POOL_MAX";
pub const LOG_FORMAT_ENV: &str = "PINHOLE_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "PINHOLE_OTLP_ENDPOINT";
pub const OTLP_PROTOCOL_ENV: &str = "PINHOLE_OTLP_PROTOCOL";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8081";
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
#[command(name = "pinhole-reservation-http-server")]
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

    /// Lower bound of the pool created at startup (in-memory backend only).
    #[arg(long, env = POOL_MIN_ENV, requires = "pool_max")]
    pub pool_min: Option<u64>,

    /// Upper bound of the pool created at startup (in-memory backend only).
    #[arg(long, env = POOL_MAX_ENV, requires = "pool_min")]
    pub pool_max: Option<u64>,

    #[arg(long, env = LOG_FORMAT_ENV, default_value = DEFAULT_LOG_FORMAT)]
    pub log_format: LogFormat,

    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = OTLP_PROTOCOL_ENV, default_value = DEFAULT_OTLP_PROTOCOL)]
    pub otlp_protocol: OtlpProtocol,
}

impl CLI {
    pub fn pool_range(&self) -> Option<(u64, u64)> {
        self.pool_min.zip(self.pool_max)
    }
}
