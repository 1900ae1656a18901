//! Running external tools under a wall-clock limit.

use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured output of a successful run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit status (always a success).
    pub status: ExitStatus,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Diagnostic stream, lossily decoded.
    pub stderr: String,
}

/// Run `program` with `args`, capturing both streams.
///
/// Both pipes are drained on helper threads so a chatty tool cannot block on
/// a full pipe. When `timeout` elapses the child is killed and its pipes
/// abandoned.
///
/// # Errors
///
/// - [`Error::ToolUnavailable`] if the program cannot be found
/// - [`Error::ToolTimeout`] if it runs longer than `timeout`
/// - [`Error::ToolFailed`] if it exits unsuccessfully
pub fn run_tool<I, S>(tool: &str, program: &Path, args: I, timeout: Duration) -> Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    tracing::debug!(tool, program = %program.display(), "spawning");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolUnavailable {
                    tool: tool.to_string(),
                    program: program.to_path_buf(),
                }
            } else {
                Error::Io(e)
            }
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_until(&mut child, Instant::now() + timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            tracing::warn!(tool, secs = timeout.as_secs(), "timed out, killing");
            reap(&mut child);
            return Err(Error::ToolTimeout {
                tool: tool.to_string(),
                timeout,
            });
        }
        Err(e) => {
            reap(&mut child);
            return Err(Error::Io(e));
        }
    };

    let stdout = collect(stdout);
    let stderr = collect(stderr);

    if !status.success() {
        return Err(Error::ToolFailed {
            tool: tool.to_string(),
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ToolOutput {
        status,
        stdout,
        stderr,
    })
}

/// Poll until the child exits or `deadline` passes.
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child and collect its exit status so no zombie is left behind.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_both_streams() {
        let output = run_tool(
            "sh",
            Path::new("sh"),
            ["-c", "echo out; echo err 1>&2"],
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_missing_program() {
        let result = run_tool(
            "ffmpeg",
            Path::new("/nonexistent/bin/ffmpeg"),
            ["-version"],
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(Error::ToolUnavailable { .. })));
    }

    #[test]
    fn test_nonzero_exit() {
        let result = run_tool(
            "sh",
            Path::new("sh"),
            ["-c", "echo 'Invalid argument' 1>&2; exit 3"],
            Duration::from_secs(10),
        );
        match result {
            Err(Error::ToolFailed { stderr, .. }) => assert_eq!(stderr, "Invalid argument"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_kills() {
        let started = Instant::now();
        let result = run_tool(
            "sh",
            Path::new("sh"),
            ["-c", "sleep 5"],
            Duration::from_millis(200),
        );
        assert!(matches!(result, Err(Error::ToolTimeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_reap_leaves_no_running_child() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        reap(&mut child);
        let status = child.try_wait().unwrap().expect("child already reaped");
        assert!(!status.success());
    }
}
