//! Process settings.
//!
//! Read from a TOML file (`--config`, default `settings.toml`, optional) and
//! overridden by `BALANCE__*` environment variables, e.g.
//! `BALANCE__SERVER__PORT=8080`.
//!
//! ```toml
//! [app]
//! level = "debug"
//!
//! [server]
//! port = 3000
//! database = { sqlite = "balance.db" }
//! reports_dir = "static/reports"
//! timeout_ms = 5000
//! ```

use std::path::PathBuf;

use clap::Parser;
use config::{Config, ConfigError, Environment, File, Source};
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "balance_service", about = "User balance ledger HTTP service")]
struct Cli {
    /// Path of the settings file.
    #[arg(long, env = "BALANCE_CONFIG", default_value = "settings.toml")]
    config: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
    Postgres(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    pub reports_dir: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let cli = Cli::parse();
        Self::from_source(File::from(cli.config).required(false))
    }

    fn from_source<S>(file: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .set_default("app.level", "info")?
            .add_source(file)
            .add_source(Environment::with_prefix("BALANCE").separator("__"))
            .build()?
            .try_deserialize()
    }
}
