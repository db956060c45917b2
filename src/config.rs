use serde::Deserialize;

use crate::error::{Error, Result};
use crate::storage::StorageType;

#[derive(Debug, PartialEq, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    pub storage_type: StorageType,
    /// Backing file for the file storage type.
    pub data_file: String,
    /// Number of frames per buffer pool instance.
    pub pool_size: usize,
    /// Number of buffer pool instances pages are partitioned across.
    pub num_instances: usize,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("storage_type", "memory")?
            .set_default("log_level", "debug")?
            .set_default("data_file", "pagebox.db")?
            .set_default("pool_size", 64_i64)?
            .set_default("num_instances", 4_i64)?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("PAGEBOX"));
        let cfg: Config = cfg.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::value("pool_size must be positive"));
        }
        if self.num_instances == 0 {
            return Err(Error::value("num_instances must be positive"));
        }
        Ok(())
    }
}
