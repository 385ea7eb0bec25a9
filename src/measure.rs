//! External measurement processes: `du` for sizes, `which` for tool probes.
//! Every invocation runs under a hard timeout; on timeout the child is killed
//! and the operation is classified as a timeout failure.

use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::cache::SizeCache;
use crate::error::{Error, Result};

pub const SIZE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DISCOVERY_SIZE_TIMEOUT: Duration = Duration::from_secs(10);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Whether the tool owning a cruft location is still installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Not checked, or the probe itself failed.
    Unknown,
    Installed,
    NotInstalled,
}

#[derive(Debug)]
pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run a command, killing it if it exceeds `timeout`.
pub fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Result<CmdOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain both pipes on dedicated threads while polling: a child emitting
    // more than the pipe buffer would otherwise block on write until the
    // deadline killed it, turning a real failure into a timeout.
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(CmdOutput {
                status,
                stdout: stdout_reader.join().unwrap_or_default(),
                stderr: stderr_reader.join().unwrap_or_default(),
            });
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout {
                operation: format!("{program} {}", args.join(" ")),
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buffer);
        }
        buffer
    })
}

/// Measure a directory through the cache.
///
/// Returns `Ok(None)` when the path does not exist or the measurement is
/// known (from the cache) to fail. Timeouts and parse failures are cached so
/// repeat scans skip the same slow or broken path, then surfaced as errors
/// for the caller to aggregate.
pub fn dir_size(path: &Path, cache: &SizeCache, timeout: Duration) -> Result<Option<u64>> {
    if let Some(entry) = cache.get(path) {
        if entry.error.is_some() {
            return Ok(None);
        }
        return Ok(if entry.exists {
            Some(entry.size_bytes)
        } else {
            None
        });
    }

    if !path.exists() {
        cache.set(path, 0, false, None);
        return Ok(None);
    }

    let path_str = path.to_string_lossy();
    let output = match run_with_timeout("du", &["-sk", &path_str], timeout) {
        Ok(output) => output,
        Err(err @ Error::Timeout { .. }) => {
            cache.set(path, 0, true, Some(format!("timeout: {err}")));
            return Err(err);
        }
        Err(err) => {
            cache.set(path, 0, true, Some(err.to_string()));
            return Err(Error::ScanMeasurement {
                path: path.to_path_buf(),
                reason: err.to_string(),
            });
        }
    };

    if !output.status.success() {
        debug!(path = %path.display(), stderr = output.stderr.trim(), "du reported failure");
        return Ok(None);
    }

    // `du -sk` reports kilobytes in the first column.
    let parsed = output
        .stdout
        .split_whitespace()
        .next()
        .and_then(|field| field.parse::<u64>().ok());
    match parsed {
        Some(kilobytes) => {
            let size_bytes = kilobytes * 1024;
            cache.set(path, size_bytes, true, None);
            Ok(Some(size_bytes))
        }
        None => {
            let reason = format!("could not parse du output: {:?}", output.stdout.trim());
            cache.set(path, 0, true, Some(reason.clone()));
            Err(Error::ScanMeasurement {
                path: path.to_path_buf(),
                reason,
            })
        }
    }
}

/// Probe whether a command-line tool is installed. Probe failure (including
/// timeout) degrades to `Unknown`; it never aborts the caller.
pub fn probe_tool(binary: &str) -> ToolStatus {
    // Tolerate "binary --version" style probe strings.
    let binary = binary.split_whitespace().next().unwrap_or(binary);
    match run_with_timeout("which", &[binary], PROBE_TIMEOUT) {
        Ok(output) if output.status.success() => ToolStatus::Installed,
        Ok(_) => ToolStatus::NotInstalled,
        Err(err) => {
            debug!(%binary, %err, "tool probe failed");
            ToolStatus::Unknown
        }
    }
}

/// Where a tool is installed, if it is. Used by the probe boundary op.
pub fn probe_tool_path(binary: &str) -> Option<String> {
    let binary = binary.split_whitespace().next().unwrap_or(binary);
    match run_with_timeout("which", &[binary], PROBE_TIMEOUT) {
        Ok(output) if output.status.success() => Some(output.stdout.trim().to_string()),
        _ => None,
    }
}
