#![allow(clippy::module_name_repetitions)]
//! RunConfig composition and synchronous action execution.
//!
//! A `RunConfig` is built fresh per invocation and immutable once built. The
//! environment follows the composite action's contract: INPUT_* variables,
//! a tool-dependent version key, hook fragments, and a per-invocation
//! GITHUB_OUTPUT destination. Omitted settings leave their variable unset
//! (never empty) so the action takes its own defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::docker::{container_runtime_path, echo_docker};
use crate::errors::RunError;
use crate::fixture::Fixture;
use crate::sidecar::{SshAgentSidecar, AGENT_MOUNT};
use crate::util::exec::{combined_capture, read_back};
use crate::util::id::unique_id;

/// Container path the action treats as its working root.
pub const ACTION_WORKSPACE: &str = "/github/workspace";

/// Which IaC engine the action should install and drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IacTool {
    Terraform,
    OpenTofu,
}

impl IacTool {
    /// Environment variable carrying this engine's version. The key itself is
    /// tool-dependent; resolve it here once instead of concatenating strings
    /// at call sites.
    pub fn version_var(self) -> &'static str {
        match self {
            IacTool::Terraform => "INPUT_TF_VERSION",
            IacTool::OpenTofu => "INPUT_TOFU_VERSION",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            IacTool::Terraform => "Terraform",
            IacTool::OpenTofu => "OpenTofu",
        }
    }
}

/// One invocation's environment and volume configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    image: String,
    env: BTreeMap<String, String>,
    volumes: Vec<(PathBuf, String)>,
    entrypoint: Option<String>,
    args: Vec<String>,
    host_workspace: Option<PathBuf>,
}

impl RunConfig {
    pub fn builder(image_tag: &str) -> RunConfigBuilder {
        RunConfigBuilder {
            image: image_tag.to_string(),
            env: BTreeMap::new(),
            volumes: Vec::new(),
            entrypoint: None,
            args: Vec::new(),
            host_workspace: None,
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn volumes(&self) -> &[(PathBuf, String)] {
        &self.volumes
    }

    /// Container-side GITHUB_OUTPUT destination, when one was assigned.
    pub fn github_output(&self) -> Option<&str> {
        self.env.get("GITHUB_OUTPUT").map(String::as_str)
    }

    /// Host-side GITHUB_OUTPUT path, resolved through the volume table.
    pub fn github_output_host(&self) -> Option<PathBuf> {
        self.github_output().and_then(|p| self.resolve_host_path(p))
    }

    pub fn host_workspace(&self) -> Option<&Path> {
        self.host_workspace.as_deref()
    }

    /// Map a container path back to its host equivalent via the bind mounts.
    pub fn resolve_host_path(&self, container_path: &str) -> Option<PathBuf> {
        for (host, container) in &self.volumes {
            if container_path == container {
                return Some(host.clone());
            }
            if let Some(rest) = container_path.strip_prefix(&format!("{container}/")) {
                return Some(host.join(rest));
            }
        }
        None
    }

    /// Environment for driving the action entry script directly on the host:
    /// values that name container paths are rewritten through the volume
    /// table so the script sees real host locations.
    fn env_for_host(&self) -> BTreeMap<String, String> {
        self.env
            .iter()
            .map(|(k, v)| {
                let rewritten = self
                    .resolve_host_path(v)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| v.clone());
                (k.clone(), rewritten)
            })
            .collect()
    }
}

/// Consuming builder; the configuration is immutable once `build()` runs.
#[derive(Debug)]
pub struct RunConfigBuilder {
    image: String,
    env: BTreeMap<String, String>,
    volumes: Vec<(PathBuf, String)>,
    entrypoint: Option<String>,
    args: Vec<String>,
    host_workspace: Option<PathBuf>,
}

impl RunConfigBuilder {
    /// Bind the fixture root at the action's workspace path.
    pub fn fixture(mut self, fixture: &Fixture) -> Self {
        self.volumes
            .push((fixture.path().to_path_buf(), ACTION_WORKSPACE.to_string()));
        self.env
            .insert("GITHUB_WORKSPACE".into(), ACTION_WORKSPACE.into());
        self.host_workspace = Some(fixture.path().to_path_buf());
        self
    }

    pub fn tool_version(mut self, tool: IacTool, version: &str) -> Self {
        self.env
            .insert(tool.version_var().to_string(), version.to_string());
        self
    }

    pub fn tg_version(mut self, version: &str) -> Self {
        self.env
            .insert("INPUT_TG_VERSION".into(), version.to_string());
        self
    }

    /// Terragrunt command line. An empty command means install-only: the
    /// variable is left unset so the action skips execution entirely.
    pub fn command(mut self, cmd: &str) -> Self {
        if !cmd.is_empty() {
            self.env.insert("INPUT_TG_COMMAND".into(), cmd.to_string());
        }
        self
    }

    /// Working directory inside the workspace. Not calling this leaves
    /// INPUT_TG_DIR unset and the action falls back to its own default.
    pub fn working_dir(mut self, rel: &str) -> Self {
        self.env.insert("INPUT_TG_DIR".into(), rel.to_string());
        self
    }

    /// Shell fragment echoed by the action before the main execution.
    pub fn pre_exec(mut self, n: usize, cmd: &str) -> Self {
        self.env
            .insert(format!("INPUT_PRE_EXEC_{n}"), cmd.to_string());
        self
    }

    /// Shell fragment echoed by the action after the main execution.
    pub fn post_exec(mut self, n: usize, cmd: &str) -> Self {
        self.env
            .insert(format!("INPUT_POST_EXEC_{n}"), cmd.to_string());
        self
    }

    /// Wire a live agent sidecar into the run: the shared directory is bound
    /// at the same mount point and SSH_AUTH_SOCK points at its socket.
    pub fn ssh_agent(mut self, sidecar: &SshAgentSidecar) -> Self {
        self.volumes
            .push((sidecar.share_dir().to_path_buf(), AGENT_MOUNT.to_string()));
        self.env.insert("SSH_AUTH_SOCK".into(), sidecar.auth_sock());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn volume(mut self, host: &Path, container: &str) -> Self {
        self.volumes.push((host.to_path_buf(), container.to_string()));
        self
    }

    pub fn entrypoint(mut self, entrypoint: &str) -> Self {
        self.entrypoint = Some(entrypoint.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Finalize. When a workspace is mounted and no GITHUB_OUTPUT was set
    /// explicitly, a fresh per-invocation file under the workspace is
    /// assigned: concurrent runs must never share an output destination.
    pub fn build(mut self) -> RunConfig {
        if self.host_workspace.is_some() && !self.env.contains_key("GITHUB_OUTPUT") {
            self.env.insert(
                "GITHUB_OUTPUT".into(),
                format!("{ACTION_WORKSPACE}/github-output-{}.txt", unique_id()),
            );
        }
        RunConfig {
            image: self.image,
            env: self.env,
            volumes: self.volumes,
            entrypoint: self.entrypoint,
            args: self.args,
            host_workspace: self.host_workspace,
        }
    }
}

/// Outcome of one invocation: combined stdout+stderr in emission order plus
/// the exit status. A non-zero exit is data, not an error: validation
/// scenarios assert on it.
#[derive(Debug)]
pub struct RunResult {
    pub output: String,
    pub status: ExitStatus,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Panic with the full captured output attached when `needle` is absent.
    #[track_caller]
    pub fn assert_contains(&self, needle: &str) {
        assert!(
            self.output.contains(needle),
            "expected output to contain {needle:?}; full output:\n{}",
            self.output
        );
    }

    /// Panic with the full captured output attached when `needle` is present.
    #[track_caller]
    pub fn assert_not_contains(&self, needle: &str) {
        assert!(
            !self.output.contains(needle),
            "expected output to NOT contain {needle:?}; full output:\n{}",
            self.output
        );
    }

    /// Byte offset of `needle`, for relative-order assertions.
    pub fn find(&self, needle: &str) -> Option<usize> {
        self.output.find(needle)
    }
}

/// Run the action synchronously in a container. `RunError::Spawn` means the
/// runtime process could not be started at all; a started action that exits
/// non-zero is reported inside `RunResult`.
pub fn run(config: &RunConfig) -> Result<RunResult, RunError> {
    let runtime = container_runtime_path().map_err(RunError::Spawn)?;

    let mut args: Vec<String> = vec!["run".into(), "--rm".into()];
    for (host, container) in &config.volumes {
        args.push("-v".into());
        args.push(format!("{}:{container}", host.display()));
    }
    for (key, value) in &config.env {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
    }
    if let Some(ep) = &config.entrypoint {
        args.push("--entrypoint".into());
        args.push(ep.clone());
    }
    args.push(config.image.clone());
    args.extend(config.args.iter().cloned());
    echo_docker(&args);

    let mut cmd = Command::new(&runtime);
    cmd.args(&args);
    run_to_completion(cmd)
}

/// Drive the action's entry script directly with bash, cwd'd into the
/// workspace, with the same composed environment (container paths rewritten
/// to host paths through the volume table). Exercises the action's shell
/// contract without a container round-trip.
pub fn run_script(config: &RunConfig, script: &Path) -> Result<RunResult, RunError> {
    let mut cmd = Command::new("bash");
    cmd.arg(script);
    if let Some(ws) = config.host_workspace() {
        cmd.current_dir(ws);
    }
    // The host's own agent must not leak into the action's ssh probe; only a
    // socket composed into the config counts.
    cmd.env_remove("SSH_AUTH_SOCK");
    for (key, value) in config.env_for_host() {
        cmd.env(key, value);
    }
    run_to_completion(cmd)
}

fn run_to_completion(mut cmd: Command) -> Result<RunResult, RunError> {
    let (sink, out, err) = combined_capture().map_err(RunError::Io)?;
    cmd.stdin(Stdio::null()).stdout(out).stderr(err);
    let mut child = cmd.spawn().map_err(RunError::Spawn)?;
    let status = child.wait().map_err(RunError::Io)?;
    let output = read_back(sink).map_err(RunError::Io)?;
    Ok(RunResult { output, status })
}
