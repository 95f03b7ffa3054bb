//! Child process execution with a hard timeout, cooperative cancellation and
//! bounded output capture.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How often a running child is checked for cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Shared flag asking an in-flight command to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Why a child was stopped before it exited on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    TimedOut,
    Cancelled,
}

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    /// Set when the process group was killed.
    pub terminated: Option<Termination>,
}

impl CommandOutput {
    /// Stdout followed by stderr, lossily decoded, with truncation notices.
    pub fn combined(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        if self.stdout_truncated > 0 {
            text.push_str(&format!(
                "\n[stdout truncated {} bytes]\n",
                self.stdout_truncated
            ));
        }
        text.push_str(&String::from_utf8_lossy(&self.stderr));
        if self.stderr_truncated > 0 {
            text.push_str(&format!(
                "\n[stderr truncated {} bytes]\n",
                self.stderr_truncated
            ));
        }
        text
    }
}

/// Run a command until it exits, `timeout` elapses, or `cancel` is signalled.
///
/// The child runs in its own process group so that build tools and the test
/// binaries they spawn are killed together. Output is read concurrently while
/// the child runs; `output_limit_bytes` bounds what is kept per stream (the
/// rest is drained and counted).
#[instrument(
    skip_all,
    fields(timeout_secs = timeout.as_secs(), output_limit_bytes = output_limit_bytes)
)]
pub fn run_command(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
    cancel: &CancelToken,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let deadline = Instant::now() + timeout;
    let mut terminated = None;
    let status = loop {
        if cancel.is_cancelled() {
            debug!("command cancelled, killing");
            terminated = Some(Termination::Cancelled);
            break kill_group(&mut child)?;
        }
        let now = Instant::now();
        if now >= deadline {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            terminated = Some(Termination::TimedOut);
            break kill_group(&mut child)?;
        }
        let slice = (deadline - now).min(CANCEL_POLL_INTERVAL);
        if let Some(status) = child.wait_timeout(slice).context("wait for command")? {
            break status;
        }
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), ?terminated, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        terminated,
    })
}

/// Kill the child's whole process group and reap the child.
fn kill_group(child: &mut Child) -> Result<ExitStatus> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(child.id())
            && let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGKILL)
        {
            debug!(%err, "killpg failed, falling back to killing the child");
        }
    }
    // The child may already be gone after the group kill.
    if let Err(err) = child.kill() {
        debug!(%err, "kill child");
    }
    child.wait().context("wait command after kill")
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
