#![allow(clippy::module_name_repetitions)]
//! Docker runtime discovery and small daemon queries.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use which::which;

use crate::util::exec::status_quiet;
use crate::util::shell_join;

/// Bound on daemon bookkeeping queries (`ps`, `inspect`, `rmi`); a wedged
/// daemon must not hang the whole suite.
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

pub fn container_runtime_path() -> io::Result<PathBuf> {
    if let Ok(p) = which("docker") {
        return Ok(p);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "Docker is required but was not found in PATH.",
    ))
}

/// True when the daemon answers a `docker ps` within the query timeout.
pub fn daemon_reachable(runtime: &Path) -> bool {
    status_quiet(Command::new(runtime).arg("ps"), QUERY_TIMEOUT)
}

/// True when an image is present locally (without pulling).
pub fn image_exists(runtime: &Path, image: &str) -> bool {
    status_quiet(
        Command::new(runtime).args(["image", "inspect", image]),
        QUERY_TIMEOUT,
    )
}

/// Best-effort removal of a local image.
pub fn remove_image(runtime: &Path, image: &str) -> bool {
    status_quiet(
        Command::new(runtime).args(["rmi", "-f", image]),
        QUERY_TIMEOUT,
    )
}

pub fn verbose() -> bool {
    matches!(
        std::env::var("TG_HARNESS_VERBOSE").ok().as_deref(),
        Some("1") | Some("true")
    )
}

/// Echo a docker invocation when TG_HARNESS_VERBOSE is set.
pub(crate) fn echo_docker(args: &[String]) {
    if verbose() {
        eprintln!("tg-harness: docker: docker {}", shell_join(args));
    }
}
