//! One update cycle: resolve the remote tip, compare it with the revision
//! marker and, when they differ, sync → install → mark → restart.
//!
//! The marker is written only after the install step succeeds, so after a
//! failed install the working tree is ahead of the marker and the next cycle
//! retries against the same tip.

use super::commands::{Installer, Restarter};
use super::config::Config;
use super::errors::{InstallError, ResolveError, SyncError};
use super::git_ops::Synchronizer;
use super::resolver::RevisionResolver;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The external collaborators a cycle drives.
#[derive(Clone)]
pub struct Components {
    pub synchronizer: Arc<dyn Synchronizer>,
    pub resolver: Arc<dyn RevisionResolver>,
    pub installer: Arc<dyn Installer>,
    pub restarter: Arc<dyn Restarter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolving,
    Syncing,
    Installing,
    Marking,
    Restarting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Resolving => "resolving",
            Phase::Syncing => "syncing",
            Phase::Installing => "installing",
            Phase::Marking => "marking",
            Phase::Restarting => "restarting",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CycleFailure {
    #[error("could not resolve remote tip: {0}")]
    Resolve(#[from] ResolveError),
    #[error("could not sync working copy: {0}")]
    Sync(SyncError),
    #[error("could not install dependencies: {0}")]
    Install(#[from] InstallError),
    #[error("could not record revision: {0}")]
    Marker(SyncError),
}

impl CycleFailure {
    pub fn phase(&self) -> Phase {
        match self {
            CycleFailure::Resolve(_) => Phase::Resolving,
            CycleFailure::Sync(_) => Phase::Syncing,
            CycleFailure::Install(_) => Phase::Installing,
            CycleFailure::Marker(_) => Phase::Marking,
        }
    }
}

#[derive(Debug)]
pub enum UpdateOutcome {
    /// The marker already matches the remote tip.
    NoUpdateNeeded { revision: String },
    /// The working copy moved to `revision` and the marker records it. A
    /// failed restart does not change this.
    Applied { revision: String },
    Failed(CycleFailure),
}

impl UpdateOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, UpdateOutcome::Failed(_))
    }
}

/// Run one cycle. Never fails; errors are logged and folded into the outcome.
pub async fn run_cycle(config: &Config, parts: &Components) -> UpdateOutcome {
    match apply(config, parts).await {
        Ok(outcome) => outcome,
        Err(failure) => {
            error!("Update check failed while {}: {failure}", failure.phase());
            UpdateOutcome::Failed(failure)
        }
    }
}

fn enter(phase: Phase) {
    debug!("cycle phase: {phase}");
}

async fn apply(config: &Config, parts: &Components) -> Result<UpdateOutcome, CycleFailure> {
    let root = config.paths.base.as_path();
    let repo = &config.github;

    parts
        .synchronizer
        .ensure_working_copy(root, repo)
        .await
        .map_err(CycleFailure::Sync)?;

    enter(Phase::Resolving);
    let tip = parts.resolver.resolve_tip(repo).await?.trim().to_string();
    let marker = parts
        .synchronizer
        .read_marker(root)
        .map_err(CycleFailure::Marker)?;

    if marker.trim() == tip {
        info!("No updates available.");
        return Ok(UpdateOutcome::NoUpdateNeeded { revision: tip });
    }
    info!(
        "New update found on branch {} ({} -> {tip}). Updating repository...",
        repo.branch,
        if marker.is_empty() { "none" } else { marker.trim() }
    );

    enter(Phase::Syncing);
    parts
        .synchronizer
        .fetch_remote(root, repo)
        .await
        .map_err(CycleFailure::Sync)?;
    let checked_out = parts
        .synchronizer
        .sync_to_remote(root, repo)
        .await
        .map_err(CycleFailure::Sync)?;
    if checked_out != tip {
        warn!("Working copy is at {checked_out}, remote reported {tip}; recording {tip}");
    }

    if config.update.auto_install {
        enter(Phase::Installing);
        parts.installer.install(root, &config.update).await?;
    }

    enter(Phase::Marking);
    parts
        .synchronizer
        .write_marker(root, &tip)
        .map_err(CycleFailure::Marker)?;

    if config.service.auto_restart {
        enter(Phase::Restarting);
        if let Err(e) = parts.restarter.restart(&config.service).await {
            error!("Failed to restart service: {e}");
        }
    }

    info!("Update completed successfully!");
    Ok(UpdateOutcome::Applied { revision: tip })
}
