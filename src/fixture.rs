#![allow(clippy::module_name_repetitions)]
//! Per-test fixture provisioning.
//!
//! Each scenario owns a fresh copy of a template tree; nothing is ever
//! mutated in place under `fixtures/`. The action runs as an arbitrary
//! container user, so every copied entry is made world readable/writable;
//! without this, plan/state/lock files written from inside the container hit
//! permission errors.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::color::{color_enabled_stderr, log_warn_stderr};
use crate::errors::ProvisionError;

/// An isolated, permission-normalized copy of a fixture template. The
/// backing temp directory is removed when the fixture is dropped.
#[derive(Debug)]
pub struct Fixture {
    root: TempDir,
}

impl Fixture {
    /// Copy `fixtures/<template>` (or an absolute template path) into a fresh
    /// temp root and normalize permissions. A missing template or a failed
    /// copy is fatal to the scenario; partial copies are never tolerated.
    pub fn provision(template: &str) -> Result<Fixture, ProvisionError> {
        let src = template_root(template)?;
        let root = tempfile::Builder::new()
            .prefix("tg-fixture-")
            .tempdir()
            .map_err(ProvisionError::Io)?;
        copy_tree(&src, root.path()).map_err(ProvisionError::Io)?;
        normalize_permissions(root.path()).map_err(ProvisionError::Io)?;
        Ok(Fixture { root })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Write a per-test file into the fixture (e.g. a `mise.toml` the action
    /// should discover), world read/writable like the copied entries.
    pub fn write_file(&self, rel: &str, contents: &str) -> io::Result<()> {
        let target = self.root.path().join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, contents)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(0o666))?;
        }
        Ok(())
    }

    /// Remove the fixture now, logging (not failing) on error. Dropping the
    /// fixture performs the same cleanup silently.
    pub fn cleanup(self) {
        let path = self.root.path().display().to_string();
        if let Err(e) = self.root.close() {
            log_warn_stderr(
                color_enabled_stderr(),
                &format!("tg-harness: failed to remove fixture {path}: {e}"),
            );
        }
    }
}

fn template_root(template: &str) -> Result<PathBuf, ProvisionError> {
    let p = Path::new(template);
    let src = if p.is_absolute() {
        p.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(template)
    };
    if !src.is_dir() {
        return Err(ProvisionError::Message(format!(
            "fixture template not found: {}",
            src.display()
        )));
    }
    Ok(src)
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn normalize_permissions(root: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(io::Error::other)?;
            fs::set_permissions(entry.path(), fs::Permissions::from_mode(0o777))?;
        }
    }
    Ok(())
}
