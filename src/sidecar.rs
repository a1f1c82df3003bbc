#![allow(clippy::module_name_repetitions)]
//! ssh-agent sidecar lifecycle.
//!
//! The sidecar exposes an agent socket under a private shared directory that
//! is bind-mounted into both the sidecar and the main action run. The socket
//! filename embeds a unique id: the directory is a filesystem rendezvous
//! point, and a fixed name would cross-talk between parallel tests or pick up
//! a stale socket from an earlier leaked run.
//!
//! Teardown is scoped acquisition, not an afterthought: `Drop` force-removes
//! the container on every exit path of the owning test, including assertion
//! failures and panics.

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::color::{color_enabled_stderr, log_warn_stderr};
use crate::docker::{container_runtime_path, echo_docker};
use crate::errors::StartError;
use crate::util::exec::{run_checked, status_quiet};
use crate::util::id::unique_id;

/// Container-side mount point of the shared agent directory, identical in the
/// sidecar and the main run.
pub const AGENT_MOUNT: &str = "/ssh-agent";

/// Agent image, overridable via TG_HARNESS_SSH_AGENT_IMAGE.
pub fn default_agent_image() -> String {
    std::env::var("TG_HARNESS_SSH_AGENT_IMAGE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "nardeas/ssh-agent:latest".to_string())
}

#[derive(Debug)]
pub struct SshAgentSidecar {
    name: String,
    container_id: String,
    share: TempDir,
    sock_name: String,
    stopped: bool,
}

impl SshAgentSidecar {
    /// Start a detached, auto-removing agent container seeded from `key_dir`
    /// (mounted read-only). Failure is fatal to the owning scenario only.
    pub fn start(image: &str, key_dir: &Path) -> Result<SshAgentSidecar, StartError> {
        let runtime = container_runtime_path().map_err(StartError::Io)?;
        let id = unique_id();
        let share = tempfile::Builder::new()
            .prefix("tg-agent-")
            .tempdir()
            .map_err(StartError::Io)?;
        // Both container users must be able to create and reach the socket.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(share.path(), std::fs::Permissions::from_mode(0o777))
                .map_err(StartError::Io)?;
        }

        let sock_name = format!("agent-{id}.sock");
        let name = format!("tg-ssh-agent-{id}");
        let args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--rm".into(),
            "--name".into(),
            name.clone(),
            "-v".into(),
            format!("{}:{AGENT_MOUNT}", share.path().display()),
            "-v".into(),
            format!("{}:/root/keys:ro", key_dir.display()),
            "-e".into(),
            format!("SSH_AUTH_SOCK={AGENT_MOUNT}/{sock_name}"),
            image.to_string(),
        ];
        echo_docker(&args);

        let mut cmd = Command::new(&runtime);
        cmd.args(&args);
        let output = run_checked(&mut cmd).map_err(|e| {
            StartError::Message(format!("failed to start ssh-agent sidecar {name}: {e:#}"))
        })?;
        let container_id = output
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string();
        if container_id.is_empty() {
            return Err(StartError::Message(
                "docker run -d returned no container id".to_string(),
            ));
        }

        Ok(SshAgentSidecar {
            name,
            container_id,
            share,
            sock_name,
            stopped: false,
        })
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Host-side shared directory, to be bound into the main run at
    /// [`AGENT_MOUNT`].
    pub fn share_dir(&self) -> &Path {
        self.share.path()
    }

    /// Container-side socket path for SSH_AUTH_SOCK in the main run.
    pub fn auth_sock(&self) -> String {
        format!("{AGENT_MOUNT}/{}", self.sock_name)
    }

    /// Poll (host-side) until the agent has created its socket. Returns false
    /// when the deadline passes.
    pub fn wait_for_socket(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let sock = self.share.path().join(&self.sock_name);
        loop {
            if sock.exists() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    /// Stop and remove the container. Dropping the handle performs the same
    /// cleanup; the explicit form reads better at the end of a scenario.
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let Ok(runtime) = container_runtime_path() else {
            return;
        };
        echo_docker(&["rm".into(), "-f".into(), self.name.clone()]);
        let ok = status_quiet(
            Command::new(&runtime).args(["rm", "-f", &self.name]),
            Duration::from_secs(30),
        );
        if !ok {
            log_warn_stderr(
                color_enabled_stderr(),
                &format!("tg-harness: failed to remove sidecar container {}", self.name),
            );
        }
    }
}

impl Drop for SshAgentSidecar {
    fn drop(&mut self) {
        self.stop_inner();
    }
}
