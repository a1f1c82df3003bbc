//! Docker test harness for the Terragrunt composite action.
//!
//! The harness builds the action image with a collision-free tag, provisions
//! isolated filesystem fixtures, composes per-invocation environment and
//! volume configuration, optionally stands up an ssh-agent sidecar with a
//! private rendezvous socket, and captures combined output for substring
//! assertions. All of it is safe under parallel test execution.
//!
//! Core rule: every identifier that crosses a container boundary and could be
//! shared by concurrent tests (image tag, socket path, GITHUB_OUTPUT path)
//! embeds a unique id minted at the resource's creation point. Cleanup is
//! scoped acquisition: fixtures, images and sidecars release themselves on
//! drop, on every exit path.

pub mod color;
pub mod docker;
pub mod errors;
pub mod fixture;
pub mod image;
pub mod run;
pub mod sidecar;
pub mod util;

pub use docker::{container_runtime_path, daemon_reachable, image_exists};
pub use errors::{BuildError, ProvisionError, RunError, StartError};
pub use fixture::Fixture;
pub use image::{BuildOptions, ImageHandle, DEFAULT_IMAGE_REPO};
pub use run::{run, run_script, IacTool, RunConfig, RunConfigBuilder, RunResult, ACTION_WORKSPACE};
pub use sidecar::{default_agent_image, SshAgentSidecar, AGENT_MOUNT};
