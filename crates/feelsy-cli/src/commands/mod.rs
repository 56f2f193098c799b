//! Subcommand implementations. Each module owns one subcommand enum.

use std::path::PathBuf;
use std::sync::Arc;

use feelsy_core::{Config, ConfigError, Database, FeelService};

pub mod config;
pub mod feel;
pub mod friend;
pub mod queue;
pub mod serve;
pub mod user;
pub mod vibe;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Paths chosen by the global `--config` and `--db` flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

impl Context {
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        if let Some(db) = &self.db_path {
            config.storage.database_path = Some(db.clone());
        }
        Ok(config)
    }

    pub fn save_config(&self, config: &Config) -> Result<(), ConfigError> {
        match &self.config_path {
            Some(path) => config.save_to(path),
            None => config.save(),
        }
    }

    pub fn service(&self) -> Result<FeelService, Box<dyn std::error::Error>> {
        let config = self.load_config()?;
        let db = Database::open(&config.database_path()?)?;
        Ok(FeelService::from_config(Arc::new(db), &config)?)
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
