use std::fs::File;
use std::io::{self, Read, Seek};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use wait_timeout::ChildExt;

/// Prepare a single capture file with two write handles for stdout and
/// stderr. Both handles share one file offset, so the captured text preserves
/// the order the process emitted it across the two streams.
pub fn combined_capture() -> io::Result<(File, Stdio, Stdio)> {
    let sink = tempfile::tempfile()?;
    let out = Stdio::from(sink.try_clone()?);
    let err = Stdio::from(sink.try_clone()?);
    Ok((sink, out, err))
}

/// Read a capture file back from the start.
pub fn read_back(mut sink: File) -> io::Result<String> {
    sink.rewind()?;
    let mut buf = String::new();
    sink.read_to_string(&mut buf)?;
    Ok(buf)
}

/// Run `cmd` expecting success. Combined output is returned on success and
/// attached to the error on a non-zero exit.
pub fn run_checked(cmd: &mut Command) -> Result<String> {
    let (sink, out, err) = combined_capture().context("failed to create capture file")?;
    cmd.stdin(Stdio::null()).stdout(out).stderr(err);
    let status = cmd
        .status()
        .with_context(|| format!("failed to spawn {:?}", cmd.get_program()))?;
    let output = read_back(sink).context("failed to read captured output")?;
    if !status.success() {
        return Err(anyhow!(
            "{:?} exited with status {:?}; output:\n{}",
            cmd.get_program(),
            status.code(),
            output
        ));
    }
    Ok(output)
}

/// Fire a short query, discarding output. Returns false on spawn failure,
/// non-zero exit, or timeout; never blocks past `timeout` on a wedged daemon.
pub fn status_quiet(cmd: &mut Command, timeout: Duration) -> bool {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let Ok(mut child) = cmd.spawn() else {
        return false;
    };
    match child.wait_timeout(timeout) {
        Ok(Some(status)) => status.success(),
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            false
        }
        Err(_) => false,
    }
}
