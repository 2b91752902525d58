/*
* Configuration Management
* ------------------------
* Hierarchical configuration with multiple layers of overrides.
*
* Configuration Hierarchy (from lowest to highest priority):
* 1. Hardcoded defaults
* 2. default.toml (base configuration)
* 3. local.toml (environment-specific overrides)
* 4. Environment variables with the SYNC_ prefix
*
* Sections:
* - api:     remote ledger endpoint and the allocation resource name
* - auth:    path to the file holding the ledger API token
* - pricing: path to the partition price table
* - slurm:   accounting query binary
* - logging: run log destinations (normal vs. debug run)
*/

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub auth: AuthSettings,
    pub pricing: PricingSettings,
    pub slurm: SlurmSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Remote ledger root; requests are issued against paths below it.
    /// Must end with a trailing '/'.
    pub base_url: String,
    /// Resource name used to filter allocation lookups.
    pub resource: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSettings {
    pub token_file: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PricingSettings {
    pub price_file: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SlurmSettings {
    pub sacct_bin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub log_file: PathBuf,
    pub debug_log_file: PathBuf,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());

        info!("Loading configuration from path: {}", config_path);

        let config = defaults()?
            // Add configuration from files
            .add_source(File::with_name(&format!("{}/default", config_path)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_path)).required(false))
            // Add environment variables with prefix "SYNC_"
            .add_source(config::Environment::with_prefix("SYNC").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn new_from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = defaults()?
            .add_source(File::from(path.to_path_buf()))
            .build()?;

        config.try_deserialize()
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("api.base_url", "https://mybrc.brc.berkeley.edu/api/")?
        .set_default("api.resource", "Savio Compute")?
        .set_default("auth.token_file", "full_sync.token")?
        .set_default("pricing.price_file", "/etc/slurm/bank-config.toml")?
        .set_default("slurm.sacct_bin", "sacct")?
        .set_default("logging.log_file", "full_sync.log")?
        .set_default("logging.debug_log_file", "full_sync_debug.log")
}

pub fn generate_default_config() -> Settings {
    Settings {
        api: ApiSettings {
            base_url: "https://mybrc.brc.berkeley.edu/api/".to_string(),
            resource: "Savio Compute".to_string(),
        },
        auth: AuthSettings {
            token_file: PathBuf::from("full_sync.token"),
        },
        pricing: PricingSettings {
            price_file: PathBuf::from("/etc/slurm/bank-config.toml"),
        },
        slurm: SlurmSettings {
            sacct_bin: "sacct".to_string(),
        },
        logging: LoggingSettings {
            log_file: PathBuf::from("full_sync.log"),
            debug_log_file: PathBuf::from("full_sync_debug.log"),
        },
    }
}
