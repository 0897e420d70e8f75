//! Real backend using the `openstack` command.

use crate::backend::{Backend, ChildEnv, Request};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Backend that executes real `openstack` commands.
pub struct OpenstackCli {
    /// Path to the openstack executable
    cli_path: PathBuf,
}

impl OpenstackCli {
    /// Create a new backend using `openstack` from PATH.
    ///
    /// Returns an error if the CLI is not installed.
    pub fn new() -> Result<Self> {
        let cli_path = which::which("openstack").map_err(|_| Error::CliNotFound)?;
        Ok(Self { cli_path })
    }

    /// Create a backend for an explicit executable path.
    pub fn with_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::CliNotFound);
        }
        Ok(Self {
            cli_path: path.to_path_buf(),
        })
    }

    /// Path of the executable in use.
    pub fn path(&self) -> &Path {
        &self.cli_path
    }

    fn command(&self, request: &Request, env: &ChildEnv) -> Command {
        let mut cmd = Command::new(&self.cli_path);
        cmd.args(request.argv());
        for key in &env.remove {
            cmd.env_remove(key);
        }
        cmd.envs(env.set.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

impl Backend for OpenstackCli {
    fn is_available(&self) -> bool {
        Command::new(&self.cli_path)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(&self, request: &Request, env: &ChildEnv) -> Result<String> {
        log::debug!("Running openstack {}", request.argv().join(" "));

        let output = self.command(request, env).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CliNotFound
            } else {
                Error::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_cli_output(&stderr, &request.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
