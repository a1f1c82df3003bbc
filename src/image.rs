#![allow(clippy::module_name_repetitions)]
//! Action image building with collision-free tags.
//!
//! The builder is a pure function of (context, tag): it never inspects prior
//! build state and always triggers a fresh `docker build`. Layer caching is
//! the daemon's concern; the harness only guarantees that parallel test
//! processes building from the same context never observe each other's tags.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::docker::{container_runtime_path, echo_docker, remove_image};
use crate::errors::BuildError;
use crate::util::exec::run_checked;
use crate::util::id::unique_id;

pub const DEFAULT_IMAGE_REPO: &str = "terragrunt-action";

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Target platforms forwarded as `--platform` (e.g. "linux/amd64").
    pub platforms: Vec<String>,
    /// Extra build args forwarded as `--build-arg KEY=VALUE`.
    pub build_args: Vec<(String, String)>,
}

/// A built image. Removed (`docker rmi -f`, best-effort) on drop unless
/// `persist()` was called, so suites do not accumulate orphan images.
#[derive(Debug)]
pub struct ImageHandle {
    tag: String,
    context: PathBuf,
    persist: bool,
}

impl ImageHandle {
    /// Build from `context` under the default repository name.
    pub fn build(context: &Path, opts: &BuildOptions) -> Result<ImageHandle, BuildError> {
        Self::build_named(DEFAULT_IMAGE_REPO, context, opts)
    }

    pub fn build_named(
        repo: &str,
        context: &Path,
        opts: &BuildOptions,
    ) -> Result<ImageHandle, BuildError> {
        let runtime = container_runtime_path().map_err(BuildError::Io)?;
        let tag = fresh_tag(repo);

        let mut args: Vec<String> = vec!["build".into(), "-t".into(), tag.clone()];
        if !opts.platforms.is_empty() {
            args.push("--platform".into());
            args.push(opts.platforms.join(","));
        }
        for (k, v) in &opts.build_args {
            args.push("--build-arg".into());
            args.push(format!("{k}={v}"));
        }
        args.push(context.display().to_string());
        echo_docker(&args);

        let mut cmd = Command::new(&runtime);
        cmd.args(&args);
        run_checked(&mut cmd).map_err(|e| {
            BuildError::Message(format!(
                "docker build of {} as {} failed: {:#}",
                context.display(),
                tag,
                e
            ))
        })?;

        Ok(ImageHandle {
            tag,
            context: context.to_path_buf(),
            persist: false,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    /// Leave the image behind on drop (e.g. to inspect a failed scenario).
    pub fn persist(mut self) -> ImageHandle {
        self.persist = true;
        self
    }

    /// Remove the image now instead of waiting for drop.
    pub fn remove(mut self) {
        self.persist = true;
        self.remove_now();
    }

    fn remove_now(&self) {
        let Ok(runtime) = container_runtime_path() else {
            return;
        };
        echo_docker(&["rmi".into(), "-f".into(), self.tag.clone()]);
        if !remove_image(&runtime, &self.tag) {
            crate::color::log_warn_stderr(
                crate::color::color_enabled_stderr(),
                &format!("tg-harness: failed to remove image {}", self.tag),
            );
        }
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        if !self.persist {
            self.remove_now();
        }
    }
}

/// Tag with a fresh unique suffix, so two concurrent builds from the same
/// context never collide on image identity.
fn fresh_tag(repo: &str) -> String {
    format!("{repo}:{}", unique_id())
}
