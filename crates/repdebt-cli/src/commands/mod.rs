pub mod config;
pub mod daemon;
pub mod participant;
pub mod trigger;

use std::path::PathBuf;

use repdebt_core::{Config, LedgerService};

/// Global overrides shared by every command.
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
}

impl Context {
    pub fn config_path(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::default_path()?),
        }
    }

    /// Config from disk with the `--ledger` override applied.
    pub fn config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = Config::load_from(&self.config_path()?)?;
        if let Some(path) = &self.ledger_path {
            config.storage.ledger_path = Some(path.clone());
        }
        Ok(config)
    }

    pub fn service(&self) -> Result<LedgerService, Box<dyn std::error::Error>> {
        Ok(LedgerService::from_config(&self.config()?)?)
    }
}
