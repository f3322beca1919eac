//! Self-update daemon: polls a GitHub branch, brings a local working copy to
//! the new tip, reinstalls dependencies and restarts the managed service.

pub mod daemon;

pub use daemon::config::{Config, ConfigStore};
pub use daemon::errors::{
    ConfigError, InstallError, ResolveError, RestartError, SyncError, SyncStep, UpdaterError,
};
pub use daemon::orchestrator::{Components, CycleFailure, UpdateOutcome};
pub use daemon::updater::Updater;
