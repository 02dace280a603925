use crate::platform::Platform;
use crate::RuntimeError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, info};

/// Everything needed to start a release: the executable and the variables
/// added to the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub executable: PathBuf,
    pub env: Vec<(&'static str, PathBuf)>,
}

impl LaunchSpec {
    pub fn for_release(platform: Platform, release: &Path) -> Self {
        Self {
            executable: platform.executable(release),
            env: platform.env_additions(release),
        }
    }

    /// The child command with `args` forwarded verbatim. Stdin is detached,
    /// stdout and stderr are shared with the launcher.
    pub fn command(&self, args: &[OsString]) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd
    }
}

/// Start the release and block until it exits.
pub fn launch(spec: &LaunchSpec, args: &[OsString]) -> Result<ExitStatus, RuntimeError> {
    let path = spec.executable.display().to_string();
    if !spec.executable.is_file() {
        return Err(RuntimeError::ExecutableMissing(path));
    }
    make_executable(&spec.executable)
        .map_err(|source| RuntimeError::NotExecutable { path: path.clone(), source })?;

    info!("launching {path}");
    for (key, value) in &spec.env {
        debug!("{key}={}", value.display());
    }
    let status = spec
        .command(args)
        .status()
        .map_err(|source| RuntimeError::ExecFailed { path, source })?;
    debug!("child exited: {status}");
    Ok(status)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
