use config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment};

use std::{
    net::{AddrParseError, SocketAddr},
    path::PathBuf,
    time::Duration,
};

const ENV_PREFIX: &str = "ATTENDANCE";

#[derive(Debug, serde::Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub io_timeout_ms: u64,
}

impl StorageConfig {
    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn attendance_file(&self) -> PathBuf {
        self.data_dir.join("attendance.json")
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub log_config: Option<String>,
}

impl Config {
    /// Defaults overridden by `ATTENDANCE_*` variables, e.g. `ATTENDANCE_SERVER__PORT=8080`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    pub(crate) fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3030_i64)?
            .set_default("storage.data_dir", "./data")?
            .set_default("storage.io_timeout_ms", 2000_i64)
    }
}
