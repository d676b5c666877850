use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Name of the configuration file looked up in the base directory.
pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Server settings read from `config.yml`.
///
/// ```yaml
/// port: 8080
/// sourcePath: www
/// rootResource: index.html
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Port to listen on; 0 picks an ephemeral port
    pub port: u16,
    /// Document root, relative to the base directory
    pub source_path: String,
    /// File served for `/`
    pub root_resource: String,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            source_path: "www".to_string(),
            root_resource: "index.html".to_string(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads `config.yml` from `base_dir`, falling back to the defaults
    /// when the file is missing or invalid.
    pub fn load(base_dir: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.as_ref();
        let path = base_dir.join(CONFIG_FILE);

        match Self::from_yaml_file(&path) {
            Ok(mut config) => {
                config.base_dir = base_dir.to_path_buf();
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Using default configuration");
                Self {
                    base_dir: base_dir.to_path_buf(),
                    ..Self::default()
                }
            }
        }
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parses a configuration document. `base_dir` is left at its default.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        // an empty document deserializes as unit, not as a map
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn document_root(&self) -> PathBuf {
        self.base_dir.join(&self.source_path)
    }
}
