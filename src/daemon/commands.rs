use super::config::{ServiceCfg, UpdateCfg};
use super::errors::{InstallError, RestartError};
use async_trait::async_trait;
use log::info;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Installs the project's dependencies inside the working copy.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, root: &Path, update: &UpdateCfg) -> Result<(), InstallError>;
}

/// Restarts the managed service.
#[async_trait]
pub trait Restarter: Send + Sync {
    async fn restart(&self, service: &ServiceCfg) -> Result<(), RestartError>;
}

fn child_stdio(quiet: bool) -> Stdio {
    if quiet {
        Stdio::null()
    } else {
        Stdio::inherit()
    }
}

/// Runs `update.installCommand` through `sh -c`, inheriting the environment.
#[derive(Debug, Default, Clone)]
pub struct ShellInstaller {
    quiet: bool,
}

impl ShellInstaller {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

#[async_trait]
impl Installer for ShellInstaller {
    async fn install(&self, root: &Path, update: &UpdateCfg) -> Result<(), InstallError> {
        let command = update.install_command.clone();
        info!("Installing dependencies with '{command}'...");

        let status = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(child_stdio(self.quiet))
            .stderr(child_stdio(self.quiet))
            .status()
            .await
            .map_err(|source| InstallError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(InstallError::Failed { command, status });
        }
        Ok(())
    }
}

/// Runs `service.restartCommand <service.name>`, e.g.
/// `sudo systemctl restart glide-updater.service`.
#[derive(Debug, Default, Clone)]
pub struct CommandRestarter {
    quiet: bool,
}

impl CommandRestarter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

#[async_trait]
impl Restarter for CommandRestarter {
    async fn restart(&self, service: &ServiceCfg) -> Result<(), RestartError> {
        let mut argv = service.restart_command.split_whitespace();
        let program = argv.next().ok_or(RestartError::EmptyCommand)?;
        let command = format!("{} {}", service.restart_command.trim(), service.name);
        info!("Restarting {}...", service.name);

        let status = Command::new(program)
            .args(argv)
            .arg(&service.name)
            .stdin(Stdio::null())
            .stdout(child_stdio(self.quiet))
            .stderr(child_stdio(self.quiet))
            .status()
            .await
            .map_err(|source| RestartError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(RestartError::Failed { command, status });
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn update_running(command: &str) -> UpdateCfg {
        UpdateCfg {
            install_command: command.to_string(),
            ..UpdateCfg::default()
        }
    }

    fn service_using(command: &str) -> ServiceCfg {
        ServiceCfg {
            name: "demo.service".to_string(),
            restart_command: command.to_string(),
            ..ServiceCfg::default()
        }
    }

    #[tokio::test]
    async fn install_runs_in_working_copy() {
        let tmp = TempDir::new().unwrap();
        let installer = ShellInstaller::new(true);

        installer
            .install(tmp.path(), &update_running("touch installed"))
            .await
            .unwrap();

        assert!(tmp.path().join("installed").exists());
    }

    #[tokio::test]
    async fn install_non_zero_exit_fails() {
        let tmp = TempDir::new().unwrap();
        let err = ShellInstaller::new(true)
            .install(tmp.path(), &update_running("exit 3"))
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::Failed { status, .. } if status.code() == Some(3)));
    }

    #[tokio::test]
    async fn restart_appends_service_name() {
        let tmp = TempDir::new().unwrap();
        let script = tmp.path().join("record.sh");
        let out = tmp.path().join("args");
        std::fs::write(&script, format!("echo \"$@\" > {}\n", out.display())).unwrap();

        CommandRestarter::new(true)
            .restart(&service_using(&format!("sh {} restart", script.display())))
            .await
            .unwrap();

        let args = std::fs::read_to_string(out).unwrap();
        assert_eq!(args.trim(), "restart demo.service");
    }

    #[tokio::test]
    async fn restart_failure_is_reported() {
        let err = CommandRestarter::new(true)
            .restart(&service_using("false"))
            .await
            .unwrap_err();
        assert!(matches!(err, RestartError::Failed { .. }));

        let err = CommandRestarter::new(true)
            .restart(&service_using("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, RestartError::EmptyCommand));
    }
}
