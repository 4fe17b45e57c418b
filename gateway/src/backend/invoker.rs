//! Child process execution
//!
//! Spawns one process per call, feeds the prompt on stdin, and enforces a
//! deadline. Each child leads its own process group, so a timeout kills
//! everything it started, not just the direct child.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::command::{BackendCommand, InvocationResult};
use crate::error::{GatewayError, Result};

/// Runs a resolved [`BackendCommand`]. Mockable for testing.
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    /// Run the command to completion or until `timeout` expires.
    async fn run(&self, command: &BackendCommand, timeout: Duration) -> Result<InvocationResult>;

    /// Run the command and map its outcome to response text.
    async fn invoke(&self, command: &BackendCommand, timeout: Duration) -> Result<String> {
        self.run(command, timeout).await?.into_response()
    }
}

/// Real invoker backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInvoker;

#[async_trait]
impl ProcessInvoker for SystemInvoker {
    async fn run(&self, command: &BackendCommand, timeout: Duration) -> Result<InvocationResult> {
        let started = Instant::now();

        let mut cmd = Command::new(command.program());
        push_args(&mut cmd, command);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = command.working_dir() {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            tracing::warn!(program = %command.program(), error = %e, "Failed to spawn backend");
            GatewayError::BackendFailure {
                exit_code: None,
                message: format!("Failed to execute {}: {}", command.program(), e),
            }
        })?;
        // Child::id() goes to None once the child is reaped
        let pid = child.id();
        tracing::debug!(
            program = %command.program(),
            pid = ?pid,
            timeout_secs = timeout.as_secs(),
            "Spawned backend process"
        );

        let feeder = feed_stdin(&mut child, command.stdin());
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                abort_all(&feeder, &stdout, &stderr);
                return Err(GatewayError::BackendFailure {
                    exit_code: None,
                    message: format!("Failed waiting for {}: {}", command.program(), e),
                });
            }
            Err(_elapsed) => {
                kill_tree(pid).await;
                // kill() also waits, so the child is reaped once this returns
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed out backend");
                }
                abort_all(&feeder, &stdout, &stderr);
                tracing::warn!(
                    program = %command.program(),
                    timeout_secs = timeout.as_secs(),
                    "Backend timed out and was terminated"
                );
                return Err(GatewayError::Timeout(timeout));
            }
        };

        feeder.abort();

        // A grandchild can keep the pipes open after the child exits; the
        // remaining budget still applies to draining them.
        let (mut stdout, mut stderr) = (stdout, stderr);
        let remaining = timeout.saturating_sub(started.elapsed());
        let drained = tokio::time::timeout(remaining, async {
            tokio::join!(collect(&mut stdout), collect(&mut stderr))
        })
        .await;
        let (stdout, stderr) = match drained {
            Ok(output) => output,
            Err(_elapsed) => {
                kill_tree(pid).await;
                stdout.abort();
                stderr.abort();
                tracing::warn!(
                    program = %command.program(),
                    "Backend exited but its output pipes stayed open past the deadline"
                );
                return Err(GatewayError::Timeout(timeout));
            }
        };

        let result = InvocationResult {
            exit_code: status.code(),
            stdout,
            stderr,
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            exit_code = ?result.exit_code,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Backend process exited"
        );
        Ok(result)
    }
}

fn push_args(cmd: &mut Command, command: &BackendCommand) {
    #[cfg(windows)]
    {
        if command.raw_args() {
            for arg in command.args() {
                cmd.raw_arg(arg);
            }
            return;
        }
    }
    cmd.args(command.args());
}

/// Kill the child's whole process group.
///
/// The group id is the child's pid. It stays valid after the leader is
/// reaped as long as any member of the group is still running.
#[cfg(unix)]
async fn kill_tree(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        let e = std::io::Error::last_os_error();
        tracing::debug!(pgid, error = %e, "killpg on backend group failed");
    }
}

#[cfg(windows)]
async fn kill_tree(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let status = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = status {
        tracing::debug!(pid, error = %e, "taskkill on backend tree failed");
    }
}

#[cfg(not(any(unix, windows)))]
async fn kill_tree(_pid: Option<u32>) {}

/// Write the prompt plus a newline and close stdin.
///
/// Runs on its own task so a child that never reads stdin cannot stall the
/// wait. A closed pipe just means the child didn't want the input.
fn feed_stdin(child: &mut Child, text: &str) -> JoinHandle<()> {
    let stdin = child.stdin.take();
    let payload = format!("{}\n", text);
    tokio::spawn(async move {
        let Some(mut stdin) = stdin else {
            return;
        };
        if let Err(e) = stdin.write_all(payload.as_bytes()).await {
            tracing::debug!(error = %e, "Backend closed stdin early");
        }
        drop(stdin);
    })
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf).await {
                tracing::debug!(error = %e, "Failed reading backend output");
            }
        }
        buf
    })
}

async fn collect(handle: &mut JoinHandle<Vec<u8>>) -> String {
    match handle.await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(_) => String::new(),
    }
}

fn abort_all(feeder: &JoinHandle<()>, stdout: &JoinHandle<Vec<u8>>, stderr: &JoinHandle<Vec<u8>>) {
    feeder.abort();
    stdout.abort();
    stderr.abort();
}

/// Mock invoker for testing: hands out canned results in order.
#[cfg(test)]
pub struct MockInvoker {
    responses: std::sync::Mutex<Vec<Result<InvocationResult>>>,
    pub seen: std::sync::Mutex<Vec<BackendCommand>>,
}

#[cfg(test)]
impl MockInvoker {
    pub fn new(responses: Vec<Result<InvocationResult>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn stdout(text: &str) -> Self {
        Self::new(vec![Ok(InvocationResult {
            exit_code: Some(0),
            stdout: text.to_string(),
            stderr: String::new(),
            elapsed: Duration::from_millis(1),
        })])
    }
}

#[cfg(test)]
#[async_trait]
impl ProcessInvoker for MockInvoker {
    async fn run(&self, command: &BackendCommand, _timeout: Duration) -> Result<InvocationResult> {
        self.seen.lock().unwrap().push(command.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(GatewayError::BackendFailure {
                exit_code: Some(1),
                message: "No more mock responses".to_string(),
            })
        } else {
            responses.remove(0)
        }
    }
}
