//! Daemon configuration: a JSON (or TOML) document whose every field has a
//! default. Files and runtime patches are deep-merged over the current
//! values, so a partial document never fails to load and never nulls a field.

use super::errors::ConfigError;
use super::logging::LogLevel;
use super::repo_config::RepoCfg;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const CONFIG_FILE_NAME: &str = ".glide-updater-config.json";
const WORKING_COPY_DIR: &str = "glide";

/// `~/.glide-updater-config.json`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsCfg {
    /// Working-copy root
    pub base: PathBuf,
    /// Where this configuration is persisted
    pub config: PathBuf,
}

impl Default for PathsCfg {
    fn default() -> Self {
        Self {
            base: home().join(WORKING_COPY_DIR),
            config: home().join(CONFIG_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingCfg {
    pub level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceCfg {
    /// Managed service unit
    pub name: String,
    pub auto_restart: bool,
    /// Service-control command; the service name is appended
    pub restart_command: String,
}

impl Default for ServiceCfg {
    fn default() -> Self {
        Self {
            name: "glide-updater.service".to_string(),
            auto_restart: true,
            restart_command: "sudo systemctl restart".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateCfg {
    /// Poll interval in seconds
    pub check_interval: u64,
    pub auto_install: bool,
    /// Run through `sh -c` in the working-copy root
    pub install_command: String,
}

impl Default for UpdateCfg {
    fn default() -> Self {
        Self {
            check_interval: 30,
            auto_install: true,
            install_command: "bun install".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: RepoCfg,
    pub paths: PathsCfg,
    pub logging: LoggingCfg,
    pub service: ServiceCfg,
    pub update: UpdateCfg,
}

impl Config {
    /// Defaults, persisted at `path`.
    pub fn default_at(path: &Path) -> Config {
        let mut config = Config::default();
        config.paths.config = path.to_path_buf();
        config
    }

    /// Deep-merge `patch` over a copy of `self`. `null` values in the patch
    /// are ignored.
    pub fn merged(&self, patch: &Value) -> Result<Config, ConfigError> {
        let mut base = serde_json::to_value(self)?;
        merge_values(&mut base, patch);
        Ok(serde_json::from_value(base)?)
    }

    /// Load `path`, creating it with defaults when missing or empty.
    pub fn load_or_create(path: &Path) -> Result<Config, ConfigError> {
        let defaults = Config::default_at(path);
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            defaults.save(path)?;
            return Ok(defaults);
        }

        let on_disk: Value = if is_toml(path) {
            toml::from_str(&text)?
        } else {
            serde_json::from_str(&text)?
        };
        let mut config = defaults.merged(&on_disk)?;
        config.paths.config = path.to_path_buf();
        Ok(config)
    }

    /// Write to `path` atomically (`.tmp` then rename).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        let text = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, text).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)?;
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn merge_values(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(key) {
                    Some(existing) => merge_values(existing, value),
                    None if !value.is_null() => {
                        base.insert(key.clone(), value.clone());
                    }
                    None => {}
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

/// The single owner of the effective configuration. Every mutation goes
/// through [`ConfigStore::update`] or [`ConfigStore::reload`], serialized by
/// one lock.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: Mutex<Config>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            current: Mutex::new(config),
        }
    }

    /// Load from disk, falling back to defaults on any error.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = Config::load_or_create(&path).unwrap_or_else(|e| {
            error!("Error loading config: {e}");
            Config::default_at(&path)
        });
        Self::new(path, config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current configuration.
    pub fn get(&self) -> Config {
        self.lock().clone()
    }

    /// Merge `patch`, persist, then publish. On error nothing changes.
    pub fn update(&self, patch: &Value) -> Result<Config, ConfigError> {
        let mut current = self.lock();
        let mut next = current.merged(patch)?;
        next.paths.config = self.path.clone();
        next.save(&self.path)?;
        *current = next.clone();
        info!("Configuration updated successfully");
        Ok(next)
    }

    pub fn reload(&self) -> Result<Config, ConfigError> {
        let mut current = self.lock();
        let loaded = Config::load_or_create(&self.path)?;
        *current = loaded.clone();
        Ok(loaded)
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
