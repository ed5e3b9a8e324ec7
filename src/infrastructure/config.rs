use crate::error::{AppError, AppResult};
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Default location of the configuration file, relative to the working
/// directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config";

/// Persisted connection settings. The JSON key names are fixed so files
/// written by earlier releases keep loading.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "APIKey")]
    pub api_key: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl Config {
    /// Fails with a usage error naming every empty field.
    pub fn ensure_complete(&self) -> AppResult<()> {
        let missing: Vec<&str> = [("apikey", &self.api_key), ("host", &self.host)]
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::usage(format!(
                "Config needed are empty: {}",
                missing.join(", ")
            )))
        }
    }

    fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(api_key) = overrides.api_key() {
            debug!("api key overridden from the command line");
            self.api_key = api_key.to_string();
        }
        if let Some(host) = overrides.host() {
            debug!(host, "host overridden from the command line");
            self.host = host.to_string();
        }
    }
}

/// Values supplied on the command line. Empty strings mean "not supplied".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: String,
    pub host: String,
}

impl ConfigOverrides {
    pub fn api_key(&self) -> Option<&str> {
        Some(self.api_key.as_str()).filter(|v| !v.is_empty())
    }

    pub fn host(&self) -> Option<&str> {
        Some(self.host.as_str()).filter(|v| !v.is_empty())
    }
}

/// Loads, merges and persists the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the effective configuration for this run.
    ///
    /// Without an existing file both overrides are required and become the
    /// new file. With one, non-empty overrides replace the stored fields.
    /// The result is written back in both cases before returning.
    pub fn load_or_init(&self, overrides: &ConfigOverrides) -> AppResult<Config> {
        let config = match fs::read(&self.path) {
            Ok(bytes) => {
                let mut config: Config = serde_json::from_slice(&bytes)
                    .with_context(|| format!("failed to decode {}", self.path.display()))
                    .map_err(AppError::Config)?;
                debug!(path = %self.path.display(), "loaded configuration");
                config.apply(overrides);
                config
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let (Some(api_key), Some(host)) = (overrides.api_key(), overrides.host()) else {
                    return Err(AppError::usage(format!(
                        "no configuration found at {}: -apikey and -host are both required on first run",
                        self.path.display()
                    )));
                };
                info!(path = %self.path.display(), "creating configuration");
                Config {
                    host: host.to_string(),
                    api_key: api_key.to_string(),
                }
            }
            Err(e) => {
                return Err(AppError::Config(
                    anyhow!(e).context(format!("failed to read {}", self.path.display())),
                ));
            }
        };

        self.save(&config)?;
        Ok(config)
    }

    /// Writes to a uniquely named sibling file, then renames it over the
    /// target. Concurrent writers never share a staging file, so the last
    /// rename wins and readers never see a partial file.
    pub fn save(&self, config: &Config) -> AppResult<()> {
        let encoded = serde_json::to_vec_pretty(config)
            .context("failed to encode configuration")
            .map_err(AppError::Config)?;

        self.write_atomically(&encoded)
            .with_context(|| format!("failed to write {}", self.path.display()))
            .map_err(AppError::Config)
    }

    fn write_atomically(&self, contents: &[u8]) -> anyhow::Result<()> {
        let mut staging = NamedTempFile::new_in(self.directory())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            staging
                .as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        staging.write_all(contents)?;
        staging.as_file().sync_all()?;
        staging.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}
