//! TOML configuration: builder options and label providers.
//!
//! ```toml
//! [query]
//! results_page_size = 50
//!
//! [default]
//! value_order_by = ""
//!
//! [labels.Account]
//! constraint_attribute = "name"
//! return_attributes = ["name"]
//! children = ["Customer"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::provider::{LabelProvider, ProviderRegistry};
use crate::query::QueryOptions;

/// Parsed configuration file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternConfig {
    /// Builder options.
    pub query: QueryOptions,
    /// Overrides of the default provider.
    pub default: LabelProvider,
    /// Providers keyed by label.
    pub labels: BTreeMap<String, LabelProvider>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl PatternConfig {
    /// Loads `explicit`, else the file under the user config directory.
    ///
    /// A missing file yields the defaults; an explicit path must exist.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(&path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("config.load.defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Reads and validates one file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&contents).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        config.path = Some(path.to_path_buf());
        info!(path = %path.display(), labels = config.labels.len(), "config.load.ok");
        Ok(config)
    }

    /// Parses configuration text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (label, provider) in &self.labels {
            if let Some(parent) = &provider.parent {
                if !self.labels.contains_key(parent) {
                    return Err(ConfigError::UnknownParent {
                        label: label.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// File the configuration was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Builds the provider registry described by the file.
    pub fn registry(&self) -> ProviderRegistry {
        self.labels
            .iter()
            .fold(
                ProviderRegistry::builder().with_default(self.default.clone()),
                |builder, (label, provider)| builder.with_provider(label.clone(), provider.clone()),
            )
            .build()
    }
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Offending file; empty for in-memory text.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// A label names a parent that is not configured.
    #[error("label '{label}' inherits from unknown label '{parent}'")]
    UnknownParent {
        /// Declaring label.
        label: String,
        /// Missing parent.
        parent: String,
    },
}

/// `$CONFIG_DIR/sombra-pattern/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("sombra-pattern").join("config.toml"))
}
