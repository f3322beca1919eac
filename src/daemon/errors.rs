use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpdaterError>;

/// Fatal errors: these stop the daemon before or outside of a cycle.
#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("no home directory found; pass --config explicitly")]
    NoHomeDir,
    #[error("logger init failed: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file '{path}' - {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write config file '{path}' - {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("toml error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("branch '{branch}' not found on remote")]
    UnknownBranch { branch: String },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Which part of the working-copy synchronization failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Clone,
    Fetch,
    Reset,
    FastForward,
    Checkout,
    Marker,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStep::Clone => "clone",
            SyncStep::Fetch => "fetch",
            SyncStep::Reset => "reset",
            SyncStep::FastForward => "fast-forward",
            SyncStep::Checkout => "checkout",
            SyncStep::Marker => "marker",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("{step} failed: {message}")]
pub struct SyncError {
    pub step: SyncStep,
    pub message: String,
}

impl SyncError {
    pub fn new(step: SyncStep, message: impl fmt::Display) -> Self {
        Self {
            step,
            message: message.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("could not run install command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("install command '{command}' exited with {status}")]
    Failed { command: String, status: ExitStatus },
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum RestartError {
    #[error("empty restart command")]
    EmptyCommand,
    #[error("could not run restart command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("restart command '{command}' exited with {status}")]
    Failed { command: String, status: ExitStatus },
    #[error("{0}")]
    Other(String),
}
