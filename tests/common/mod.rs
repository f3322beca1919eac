//! Recording fakes for the cycle's external collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use updaterd::daemon::commands::{Installer, Restarter};
use updaterd::daemon::config::{Config, ServiceCfg, UpdateCfg};
use updaterd::daemon::git_ops::{Synchronizer, MARKER_FILE};
use updaterd::daemon::repo_config::RepoCfg;
use updaterd::daemon::resolver::RevisionResolver;
use updaterd::{
    Components, ConfigStore, InstallError, ResolveError, RestartError, SyncError, SyncStep,
    Updater,
};

/// Pretends to be a git working copy; `tree` is the revision checked out.
#[derive(Default)]
pub struct FakeSync {
    pub calls: Mutex<Vec<&'static str>>,
    pub remote_tip: Mutex<String>,
    pub tree: Mutex<String>,
    pub fail_fetch: AtomicBool,
}

impl FakeSync {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tree(&self) -> String {
        self.tree.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Synchronizer for FakeSync {
    async fn ensure_working_copy(&self, root: &Path, _repo: &RepoCfg) -> Result<(), SyncError> {
        if root.join(".git").exists() {
            return Ok(());
        }
        self.record("clone");
        fs::create_dir_all(root.join(".git")).unwrap();
        *self.tree.lock().unwrap() = self.remote_tip.lock().unwrap().clone();
        Ok(())
    }

    async fn fetch_remote(&self, _root: &Path, _repo: &RepoCfg) -> Result<(), SyncError> {
        self.record("fetch");
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SyncError::new(SyncStep::Fetch, "could not resolve host"));
        }
        Ok(())
    }

    async fn sync_to_remote(&self, _root: &Path, _repo: &RepoCfg) -> Result<String, SyncError> {
        self.record("sync");
        let tip = self.remote_tip.lock().unwrap().clone();
        *self.tree.lock().unwrap() = tip.clone();
        Ok(tip)
    }
}

/// Answers with `tip`, or an unknown-branch error when it is `None`.
#[derive(Default)]
pub struct FakeResolver {
    pub tip: Mutex<Option<String>>,
    pub delay: Mutex<Duration>,
    pub branches: Mutex<Vec<String>>,
}

impl FakeResolver {
    pub fn calls(&self) -> usize {
        self.branches.lock().unwrap().len()
    }
}

#[async_trait]
impl RevisionResolver for FakeResolver {
    async fn resolve_tip(&self, repo: &RepoCfg) -> Result<String, ResolveError> {
        self.branches.lock().unwrap().push(repo.branch.clone());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.tip
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ResolveError::UnknownBranch {
                branch: repo.branch.clone(),
            })
    }
}

#[derive(Default)]
pub struct FakeInstaller {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Installer for FakeInstaller {
    async fn install(&self, _root: &Path, _update: &UpdateCfg) -> Result<(), InstallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(InstallError::Other("bun install exited with status 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRestarter {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Restarter for FakeRestarter {
    async fn restart(&self, _service: &ServiceCfg) -> Result<(), RestartError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RestartError::Other("Unit not found".to_string()));
        }
        Ok(())
    }
}

pub struct Harness {
    pub tmp: TempDir,
    pub sync: Arc<FakeSync>,
    pub resolver: Arc<FakeResolver>,
    pub installer: Arc<FakeInstaller>,
    pub restarter: Arc<FakeRestarter>,
}

impl Harness {
    /// A remote whose branch tip is `tip` and a working copy not cloned yet.
    pub fn new(tip: &str) -> Self {
        let harness = Self {
            tmp: TempDir::new().unwrap(),
            sync: Arc::default(),
            resolver: Arc::default(),
            installer: Arc::default(),
            restarter: Arc::default(),
        };
        harness.set_remote_tip(tip);
        harness
    }

    pub fn root(&self) -> PathBuf {
        self.tmp.path().join("work")
    }

    pub fn config_path(&self) -> PathBuf {
        self.tmp.path().join("config.json")
    }

    pub fn updater(&self) -> Updater {
        let mut config = Config::default_at(&self.config_path());
        config.paths.base = self.root();
        config.update.check_interval = 30;

        let parts = Components {
            synchronizer: self.sync.clone(),
            resolver: self.resolver.clone(),
            installer: self.installer.clone(),
            restarter: self.restarter.clone(),
        };
        Updater::new(ConfigStore::new(self.config_path(), config), parts)
    }

    pub fn set_remote_tip(&self, tip: &str) {
        *self.resolver.tip.lock().unwrap() = Some(tip.to_string());
        *self.sync.remote_tip.lock().unwrap() = tip.to_string();
    }

    /// A working copy already cloned, checked out at and marked with `revision`.
    pub fn deployed_at(&self, revision: &str) {
        fs::create_dir_all(self.root().join(".git")).unwrap();
        fs::write(self.root().join(MARKER_FILE), revision).unwrap();
        *self.sync.tree.lock().unwrap() = revision.trim().to_string();
    }

    pub fn marker(&self) -> Option<String> {
        fs::read_to_string(self.root().join(MARKER_FILE)).ok()
    }

    pub fn installs(&self) -> usize {
        self.installer.calls.load(Ordering::SeqCst)
    }

    pub fn restarts(&self) -> usize {
        self.restarter.calls.load(Ordering::SeqCst)
    }
}
