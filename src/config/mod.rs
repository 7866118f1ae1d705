//! Configuration for the profile index.
//!
//! Configuration is loaded with precedence: Env vars > Config file > Defaults
//!
//! # Example config file (profile-index.toml)
//! ```toml
//! partitions = 12
//! prune_empty_sets = true
//! ```

mod defaults;

pub use defaults::*;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::Path;

/// Settings shared by every tenant index on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of partitions used to resolve an entity's partition
    pub partitions: u32,
    /// Drop member sets (and partitions) once removals leave them empty
    pub prune_empty_sets: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            partitions: DEFAULT_PARTITIONS,
            prune_empty_sets: DEFAULT_PRUNE_EMPTY_SETS,
        }
    }
}

impl IndexConfig {
    /// Load configuration with precedence: Env > File > Defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(IndexConfig::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        Self::from_figment(&figment)
    }

    /// Extract and validate configuration from an already assembled figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: IndexConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        Ok(())
    }

    /// Partition count as a non-zero value, once validated.
    pub fn partition_count(&self) -> Result<NonZeroU32, ConfigError> {
        NonZeroU32::new(self.partitions).ok_or(ConfigError::ZeroPartitions)
    }
}

/// Configuration error.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),
    #[error("configuration error: partitions must be greater than zero")]
    ZeroPartitions,
}
