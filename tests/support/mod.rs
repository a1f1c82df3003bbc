/*!
Test support shared across the scenario suites.

- docker gating helpers (tests print their own "skipping: ..." lines)
- the version matrix the scenarios are crossed with
- a refcounted cache for the built action image: the image is expensive to
  build and consumed read-only, so overlapping tests share one build; the
  last test dropping its reference removes the image.
*/

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;

use tg_action_harness::{
    container_runtime_path, daemon_reachable, BuildOptions, IacTool, ImageHandle,
};

/// Build context of the action under test.
#[allow(dead_code)]
pub fn action_context() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("action")
}

/// Entry script of the action, for bash-driven contract tests.
#[allow(dead_code)]
pub fn action_script() -> PathBuf {
    action_context().join("src").join("main.sh")
}

/// Docker gate: returns the runtime path, or None after printing a skip
/// notice (missing binary or unreachable daemon).
#[allow(dead_code)]
pub fn require_docker() -> Option<PathBuf> {
    let runtime = match container_runtime_path() {
        Ok(p) => p,
        Err(_) => {
            eprintln!("skipping: docker not found in PATH");
            return None;
        }
    };
    if !daemon_reachable(&runtime) {
        eprintln!("skipping: Docker daemon not reachable");
        return None;
    }
    Some(runtime)
}

static SHARED_IMAGE: Lazy<Mutex<Weak<ImageHandle>>> = Lazy::new(|| Mutex::new(Weak::new()));

/// Hand out the shared action image, building it on first use. Sharing is
/// safe because running a container never mutates its image; removal happens
/// when the last referencing test drops its Arc.
#[allow(dead_code)]
pub fn shared_action_image() -> Result<Arc<ImageHandle>> {
    let mut slot = SHARED_IMAGE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(image) = slot.upgrade() {
        return Ok(image);
    }
    let image = ImageHandle::build(&action_context(), &BuildOptions::default())
        .context("failed to build shared action image")?;
    let image = Arc::new(image);
    *slot = Arc::downgrade(&image);
    Ok(image)
}

/// One (tool, tool version, runner version) tuple of the scenario matrix.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub struct ActionConfig {
    pub name: &'static str,
    pub tool: IacTool,
    pub tool_version: &'static str,
    pub tg_version: &'static str,
}

/// The version matrix every scenario is crossed with.
#[allow(dead_code)]
pub fn version_matrix() -> Vec<ActionConfig> {
    vec![
        ActionConfig {
            name: "OpenTofu1.8",
            tool: IacTool::OpenTofu,
            tool_version: "1.8.1",
            tg_version: "0.67.0",
        },
        ActionConfig {
            name: "OpenTofu1.9",
            tool: IacTool::OpenTofu,
            tool_version: "1.9.0",
            tg_version: "0.67.0",
        },
        ActionConfig {
            name: "OpenTofu1.10",
            tool: IacTool::OpenTofu,
            tool_version: "1.10.1",
            tg_version: "0.82.2",
        },
        ActionConfig {
            name: "Terraform1.5",
            tool: IacTool::Terraform,
            tool_version: "1.5.7",
            tg_version: "0.67.0",
        },
    ]
}
