pub mod commands;
pub mod config;
pub mod errors;
pub mod git_ops;
pub mod logging;
pub mod orchestrator;
pub mod repo_config;
pub mod resolver;
pub mod updater;
pub mod watcher;
