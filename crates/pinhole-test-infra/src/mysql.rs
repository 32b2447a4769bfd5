use crate::{Result, TestInfraError};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;

/// Disposable MySQL server for the pinhole store tests.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "8.4".to_string(), setter(into))]
    tag: String,
    #[builder(default = "pinhole".to_string(), setter(into))]
    database: String,
    #[builder(default = "pinhole".to_string(), setter(into))]
    username: String,
    #[builder(default = "pinhole".to_string(), setter(into))]
    password: String,
    /// Connections of the pool handed out by [`MySqlServer::connect_pool`].
    #[builder(default = 5)]
    max_connections: u32,
    #[builder(default = 20)]
    connect_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    connect_delay: Duration,
}

/// Opens a pool, retrying while the server is still coming up.
pub async fn connect_with_retry(
    database_url: &str,
    max_connections: u32,
    attempts: u32,
    delay: Duration,
) -> Result<MySqlPool> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let connected = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await;

        match connected {
            Ok(pool) => return Ok(pool),
            Err(source) if attempt >= attempts => {
                return Err(TestInfraError::Database { attempts, source });
            }
            Err(_) => {
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// A MySQL container that lives as long as this value.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", config.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        Ok(Self { container, config })
    }

    /// A `mysql://` connection string for the test database.
    pub async fn database_url(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(MYSQL_PORT).await?;
        Ok(format!(
            "mysql://{}:{}@{}:{}/{}",
            self.config.username, self.config.password, host, port, self.config.database
        ))
    }

    /// A pool on the test database, ready for the pinhole stores.
    ///
    /// MySQL logs "ready for connections" for its temporary init instance
    /// too, so the first connects can still be refused.
    pub async fn connect_pool(&self) -> Result<MySqlPool> {
        connect_with_retry(
            &self.database_url().await?,
            self.config.max_connections,
            self.config.connect_attempts,
            self.config.connect_delay,
        )
        .await
    }
}
