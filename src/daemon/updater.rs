use super::commands::{CommandRestarter, ShellInstaller};
use super::config::{Config, ConfigStore};
use super::errors::{ConfigError, Result};
use super::git_ops::GitSynchronizer;
use super::logging::LogLevel;
use super::orchestrator::{run_cycle, Components, UpdateOutcome};
use super::resolver::GithubResolver;
use super::watcher;
use log::{error, info};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Programmatic surface of the daemon.
///
/// Owns the configuration and the working copy. At most one cycle runs at a
/// time: [`Updater::check_for_updates`] waits for an in-flight cycle, the
/// scheduler skips its tick instead.
pub struct Updater {
    config: ConfigStore,
    parts: Components,
    in_flight: Mutex<()>,
}

impl Updater {
    pub fn new(config: ConfigStore, parts: Components) -> Self {
        Self {
            config,
            parts,
            in_flight: Mutex::new(()),
        }
    }

    /// git2, the GitHub API, `sh -c` for installs and the configured
    /// service-control command for restarts.
    pub fn with_system_components(config: ConfigStore) -> Result<Self> {
        let quiet = LogLevel::effective(config.get().logging.level).is_quiet();
        let parts = Components {
            synchronizer: Arc::new(GitSynchronizer),
            resolver: Arc::new(GithubResolver::new()?),
            installer: Arc::new(ShellInstaller::new(quiet)),
            restarter: Arc::new(CommandRestarter::new(quiet)),
        };
        Ok(Self::new(config, parts))
    }

    /// Run one cycle now, after any cycle already in flight.
    pub async fn check_for_updates(&self) -> UpdateOutcome {
        let _guard = self.in_flight.lock().await;
        self.cycle().await
    }

    /// Run one cycle unless another is in flight.
    pub async fn try_check_for_updates(&self) -> Option<UpdateOutcome> {
        let _guard = self.in_flight.try_lock().ok()?;
        Some(self.cycle().await)
    }

    async fn cycle(&self) -> UpdateOutcome {
        let config = self.config.get();
        run_cycle(&config, &self.parts).await
    }

    /// A copy of the effective configuration.
    pub fn config(&self) -> Config {
        self.config.get()
    }

    /// Deep-merge `patch` into the configuration and persist it. Takes effect
    /// from the next cycle.
    pub fn update_config(&self, patch: &Value) -> std::result::Result<Config, ConfigError> {
        self.config.update(patch)
    }

    /// Re-read the configuration file. On error the current configuration
    /// stays in effect.
    pub fn reload_config(&self) -> Config {
        match self.config.reload() {
            Ok(config) => {
                info!("Configuration reloaded from {}", self.config.path().display());
                config
            }
            Err(e) => {
                error!("Error reloading config: {e}");
                self.config.get()
            }
        }
    }

    /// Check at startup, then every `update.checkInterval` seconds until
    /// `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        watcher::watch(self, shutdown).await
    }
}
