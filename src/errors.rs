//! Harness error taxonomy.
//!
//! Infrastructure failures (fixture provisioning, image builds, sidecar
//! starts) are fatal to the owning scenario and abort it before assertions
//! run. A non-zero exit of the action itself is NOT an error at this layer:
//! it is reported inside `RunResult` and classified by the scenario
//! (validation tests expect it). `RunError` is reserved for the case where
//! the container runtime process could not be driven at all.

use std::fmt;
use std::io;

/// Fixture copy or permission normalization failed.
#[derive(Debug)]
pub enum ProvisionError {
    Io(io::Error),
    Message(String),
}

/// Image build failed; `Message` carries the trailing build output.
#[derive(Debug)]
pub enum BuildError {
    Io(io::Error),
    Message(String),
}

/// Sidecar container failed to start.
#[derive(Debug)]
pub enum StartError {
    Io(io::Error),
    Message(String),
}

/// Action run could not be performed. Distinct from the action exiting
/// non-zero, which callers observe on `RunResult::status`.
#[derive(Debug)]
pub enum RunError {
    /// The container runtime process could not be started at all.
    Spawn(io::Error),
    /// Failed while waiting for, or reading output from, a started process.
    Io(io::Error),
}

macro_rules! infra_error_impls {
    ($ty:ident, $what:expr) => {
        impl From<io::Error> for $ty {
            fn from(e: io::Error) -> Self {
                $ty::Io(e)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $ty::Io(e) => write!(f, "{}: {}", $what, e),
                    $ty::Message(s) => f.write_str(s),
                }
            }
        }

        impl std::error::Error for $ty {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                match self {
                    $ty::Io(e) => Some(e),
                    $ty::Message(_) => None,
                }
            }
        }
    };
}

infra_error_impls!(ProvisionError, "fixture provisioning failed");
infra_error_impls!(BuildError, "image build failed");
infra_error_impls!(StartError, "sidecar start failed");

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Spawn(e) => write!(f, "failed to start container runtime: {e}"),
            RunError::Io(e) => write!(f, "run output capture failed: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Spawn(e) | RunError::Io(e) => Some(e),
        }
    }
}
