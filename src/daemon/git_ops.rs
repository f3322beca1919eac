use super::errors::{SyncError, SyncStep};
use super::repo_config::RepoCfg;
use async_trait::async_trait;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, CredentialType, FetchOptions, RemoteCallbacks, Repository, ResetType};
use log::{debug, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tokio::task;

/// Last successfully applied revision, relative to the working-copy root.
pub const MARKER_FILE: &str = ".commit";

/// Keeps the working copy in step with the remote branch.
///
/// The working copy is a deployment artifact: [`Synchronizer::sync_to_remote`]
/// throws away any local modification or divergent history.
#[async_trait]
pub trait Synchronizer: Send + Sync {
    /// Clone into `root` unless it already holds a repository.
    async fn ensure_working_copy(&self, root: &Path, repo: &RepoCfg) -> Result<(), SyncError>;

    /// Update `origin/<branch>` without touching the working tree.
    async fn fetch_remote(&self, root: &Path, repo: &RepoCfg) -> Result<(), SyncError>;

    /// Hard reset, then move the working tree to the fetched tip. Returns the
    /// revision now checked out.
    async fn sync_to_remote(&self, root: &Path, repo: &RepoCfg) -> Result<String, SyncError>;

    fn read_marker(&self, root: &Path) -> Result<String, SyncError> {
        read_marker(root)
    }

    fn write_marker(&self, root: &Path, revision: &str) -> Result<(), SyncError> {
        write_marker(root, revision)
    }
}

/// Empty when no revision was applied yet.
pub fn read_marker(root: &Path) -> Result<String, SyncError> {
    match fs::read_to_string(root.join(MARKER_FILE)) {
        Ok(text) => Ok(text.trim().to_string()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(SyncError::new(SyncStep::Marker, e)),
    }
}

pub fn write_marker(root: &Path, revision: &str) -> Result<(), SyncError> {
    fs::write(root.join(MARKER_FILE), revision).map_err(|e| SyncError::new(SyncStep::Marker, e))
}

/// [`Synchronizer`] backed by libgit2.
#[derive(Debug, Default, Clone)]
pub struct GitSynchronizer;

#[async_trait]
impl Synchronizer for GitSynchronizer {
    async fn ensure_working_copy(&self, root: &Path, repo: &RepoCfg) -> Result<(), SyncError> {
        if root.join(".git").exists() {
            return Ok(());
        }
        let root = root.to_path_buf();
        let url = repo.git_url();
        let branch = repo.branch.clone();
        blocking(SyncStep::Clone, move || clone_into(&root, &url, &branch)).await
    }

    async fn fetch_remote(&self, root: &Path, repo: &RepoCfg) -> Result<(), SyncError> {
        let root = root.to_path_buf();
        let branch = repo.branch.clone();
        blocking(SyncStep::Fetch, move || fetch(&root, &branch)).await
    }

    async fn sync_to_remote(&self, root: &Path, repo: &RepoCfg) -> Result<String, SyncError> {
        let root = root.to_path_buf();
        let branch = repo.branch.clone();
        blocking(SyncStep::FastForward, move || reset_and_fast_forward(&root, &branch)).await
    }
}

async fn blocking<T, F>(step: SyncStep, op: F) -> Result<T, SyncError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SyncError> + Send + 'static,
{
    task::spawn_blocking(op)
        .await
        .map_err(|e| SyncError::new(step, e))?
}

fn at(step: SyncStep) -> impl Fn(git2::Error) -> SyncError {
    move |e| SyncError::new(step, e.message())
}

fn fetch_options<'a>() -> FetchOptions<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed| {
        if allowed.contains(CredentialType::SSH_KEY) {
            // Use SSH agent for authentication
            return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Ok(token) = std::env::var(super::resolver::GITHUB_TOKEN_ENV) {
                return Cred::userpass_plaintext("x-access-token", &token);
            }
        }
        Cred::default()
    });

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

fn clone_into(root: &Path, url: &str, branch: &str) -> Result<(), SyncError> {
    info!("Cloning {url} ({branch}) into {}", root.display());
    fs::create_dir_all(root).map_err(|e| SyncError::new(SyncStep::Clone, e))?;

    RepoBuilder::new()
        .branch(branch)
        .fetch_options(fetch_options())
        .clone(url, root)
        .map_err(at(SyncStep::Clone))?;
    Ok(())
}

fn fetch(root: &Path, branch: &str) -> Result<(), SyncError> {
    let repository = Repository::open(root).map_err(at(SyncStep::Fetch))?;
    let mut remote = repository.find_remote("origin").map_err(at(SyncStep::Fetch))?;

    let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
    debug!("Fetching '{branch}' for {}", root.display());
    remote
        .fetch(&[&refspec], Some(&mut fetch_options()), None)
        .map_err(at(SyncStep::Fetch))?;
    Ok(())
}

fn reset_and_fast_forward(root: &Path, branch: &str) -> Result<String, SyncError> {
    let repository = Repository::open(root).map_err(at(SyncStep::Reset))?;

    // Discard tracked local modifications first.
    let head = repository
        .head()
        .and_then(|head| head.peel_to_commit())
        .map_err(at(SyncStep::Reset))?;
    repository
        .reset(head.as_object(), ResetType::Hard, None)
        .map_err(at(SyncStep::Reset))?;

    let remote_ref = format!("refs/remotes/origin/{branch}");
    let target = repository
        .find_reference(&remote_ref)
        .and_then(|reference| reference.peel_to_commit())
        .map_err(at(SyncStep::FastForward))?;

    if target.id() == head.id() {
        debug!("{} already at {}", root.display(), target.id());
    } else if !repository
        .graph_descendant_of(target.id(), head.id())
        .map_err(at(SyncStep::FastForward))?
    {
        warn!(
            "Local history of {} diverged from {remote_ref}; discarding it",
            root.display()
        );
    }

    let local_ref = format!("refs/heads/{branch}");
    repository
        .reference(&local_ref, target.id(), true, "updaterd: fast-forward")
        .map_err(at(SyncStep::FastForward))?;
    repository.set_head(&local_ref).map_err(at(SyncStep::Checkout))?;
    repository
        .checkout_head(Some(CheckoutBuilder::default().force()))
        .map_err(at(SyncStep::Checkout))?;

    info!("Fast-forwarded {} to {}", root.display(), target.id());
    Ok(target.id().to_string())
}
