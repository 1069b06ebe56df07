//! Spawning the device helper with a deadline and bounded output capture.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, warn};
use wait_timeout::ChildExt;

/// What the helper printed and how it exited.
#[derive(Debug)]
pub struct HelperOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Stdout bytes drained past the capture limit.
    pub stdout_overflow: u64,
    pub timed_out: bool,
}

impl HelperOutput {
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// Stdout, refusing output that was cut off at the capture limit.
    pub fn complete_stdout(&self) -> Result<&[u8]> {
        if self.stdout_overflow > 0 {
            return Err(anyhow!(
                "helper stdout exceeded the capture limit by {} bytes",
                self.stdout_overflow
            ));
        }
        Ok(&self.stdout)
    }
}

/// Run `cmd` to completion or kill it after `timeout`.
///
/// Both pipes are drained on their own threads while the child runs, so a
/// chatty helper cannot block on a full pipe. At most `capture_limit` bytes of
/// each stream are kept.
pub fn run_helper(
    mut cmd: Command,
    timeout: Duration,
    capture_limit: usize,
) -> Result<HelperOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|err| {
        error!(program = ?cmd.get_program(), %err, "failed to spawn helper");
        anyhow!(err).context("spawn helper")
    })?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("helper stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("helper stderr was not piped"))?;
    let limit = capture_limit as u64;
    let stdout_reader = thread::spawn(move || capture(stdout, limit));
    let stderr_reader = thread::spawn(move || capture(stderr, limit));

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for helper")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_ms = timeout.as_millis() as u64, "helper timed out, killing");
            child.kill().context("kill helper")?;
            (child.wait().context("reap helper")?, true)
        }
    };

    let (stdout, stdout_overflow) = join(stdout_reader).context("capture helper stdout")?;
    let (stderr, _) = join(stderr_reader).context("capture helper stderr")?;
    debug!(exit_code = ?status.code(), timed_out, stdout_bytes = stdout.len(), "helper exited");
    Ok(HelperOutput {
        status,
        stdout,
        stderr,
        stdout_overflow,
        timed_out,
    })
}

/// Keep the first `limit` bytes of `reader`, then drain the rest and count it.
fn capture<R: Read>(mut reader: R, limit: u64) -> Result<(Vec<u8>, u64)> {
    let mut kept = Vec::new();
    reader
        .by_ref()
        .take(limit)
        .read_to_end(&mut kept)
        .context("read output")?;
    let overflow = io::copy(&mut reader, &mut io::sink()).context("drain output")?;
    Ok((kept, overflow))
}

fn join(reader: JoinHandle<Result<(Vec<u8>, u64)>>) -> Result<(Vec<u8>, u64)> {
    reader
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))?
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    #[test]
    fn overflowing_stdout_is_counted_and_rejected() {
        let output = run_helper(sh("printf 'abcdef'"), Duration::from_secs(5), 4).expect("run");
        assert!(output.status.success());
        assert_eq!(output.stdout, b"abcd");
        assert_eq!(output.stdout_overflow, 2);
        assert!(output.complete_stdout().is_err());
    }

    #[test]
    fn stderr_is_captured_separately() {
        let script = "printf 'null'; echo 'no device' >&2; exit 3";
        let output = run_helper(sh(script), Duration::from_secs(5), 64).expect("run");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.complete_stdout().expect("stdout"), b"null");
        assert_eq!(output.stderr_lossy(), "no device");
    }

    #[test]
    fn slow_helper_is_killed() {
        let output = run_helper(sh("sleep 5"), Duration::from_millis(100), 64).expect("run");
        assert!(output.timed_out);
    }
}
