//! Configuration for fetchpool
//!
//! Layered loading, highest priority last:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! By default the file is read from `config/fetchpool.toml`; override the
//! path with the `FETCHPOOL_CONFIG` environment variable. Individual keys
//! can be overridden with `FETCHPOOL__<section>__<key>`, e.g.
//! `FETCHPOOL__FETCH__RETRY_LIMIT=5` or `FETCHPOOL__POOL__WORKERS=4`.

use std::env;
use std::path::PathBuf;

use config::{Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::FetchConfig;

const CONFIG_ENV_VAR: &str = "FETCHPOOL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/fetchpool.toml";
const ENV_PREFIX: &str = "FETCHPOOL";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("fetch.retry_limit must be at least 1")]
    ZeroRetryLimit,

    #[error("unknown proxy scheme '{scheme}' (expected 'http', 'https' or 'all')")]
    UnknownProxyScheme { scheme: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub pool: PoolConfig,
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    1
}

impl Config {
    /// Load configuration from the default path (or `FETCHPOOL_CONFIG`) plus
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_path(config_path)
    }

    /// Load configuration from a specific path.
    ///
    /// Useful for testing with custom configuration files. A missing file is
    /// not an error; defaults and environment overrides still apply.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if path.exists() {
            tracing::info!("loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(false));
        } else {
            tracing::warn!(
                "configuration file {} not found, using defaults and environment overrides",
                path.display()
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> Result<(), ValidationError> {
    if config.fetch.retry_limit == 0 {
        return Err(ValidationError::ZeroRetryLimit);
    }
    for scheme in config.fetch.proxies.keys() {
        if !matches!(scheme.as_str(), "http" | "https" | "all") {
            return Err(ValidationError::UnknownProxyScheme {
                scheme: scheme.clone(),
            });
        }
    }
    Ok(())
}
