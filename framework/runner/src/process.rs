//! Runs the uperf binary as a [`Child`] process in either of its two roles.
//!
//! In the active (client) role uperf reads a profile, drives traffic and exits once the profile
//! is complete. In the passive (server) role it listens forever, so a server that is still
//! running when it is stopped has done its job.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uperf_core::prelude::{DelegatedShutdownListener, ShutdownSignalError};

use crate::types::RunError;

/// What a client run printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ClientOutput {
    /// stdout and stderr separated by a newline.
    pub fn combined(&self) -> String {
        format!(
            "{}\n{}",
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        )
    }
}

/// How a server run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerOutcome {
    /// The server stopped by itself.
    ExitedEarly {
        /// `None` if the process was ended by a signal.
        exit_code: Option<i32>,
        /// stdout followed by stderr.
        output: String,
    },
    /// The server was still running when the timeout or shutdown signal arrived and was killed.
    RanUntilCancelled,
}

/// Run uperf in active mode against the profile at `profile`, waiting for it to exit.
///
/// No timeout is applied. The profile bounds the run with its iteration, duration or rate
/// limits. A shutdown signal kills the child and returns [`RunError::Interrupted`].
pub async fn run_client(
    bin_path: &Path,
    work_dir: &Path,
    profile: &Path,
    shutdown: &mut DelegatedShutdownListener,
) -> Result<ClientOutput, RunError> {
    let child = Command::new(bin_path)
        .arg("-vaR")
        .arg("-i")
        .arg("1")
        .arg("-m")
        .arg(profile)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(RunError::Launch)?;
    log::debug!("Running uperf client with PID: {:?}", child.id());

    tokio::select! {
        output = child.wait_with_output() => {
            let output = output.map_err(RunError::Wait)?;
            log::debug!("uperf client finished with status: {}", output.status);
            Ok(ClientOutput {
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
        // Dropping the child kills it.
        _ = shutdown.wait_for_shutdown() => Err(ShutdownSignalError::default().into()),
    }
}

/// Run uperf in passive mode until `timeout` elapses or the shutdown signal is received.
///
/// The whole call, including reading the output of a server that exited early, is bounded by
/// `timeout`.
pub async fn run_server(
    bin_path: &Path,
    timeout: Duration,
    shutdown: &mut DelegatedShutdownListener,
) -> Result<ServerOutcome, RunError> {
    let mut child = Command::new(bin_path)
        .arg("-s")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(RunError::Launch)?;
    log::debug!("Running uperf server with PID: {:?}", child.id());
    let deadline = Instant::now() + timeout;

    let stdout = OutputReader::spawn(child.stdout.take());
    let stderr = OutputReader::spawn(child.stderr.take());

    let exited = tokio::select! {
        status = child.wait() => Some(status.map_err(RunError::Wait)?),
        _ = tokio::time::sleep_until(deadline) => {
            log::info!("uperf server ran for {timeout:?}, stopping it");
            None
        }
        _ = shutdown.wait_for_shutdown() => {
            log::info!("Stopping uperf server on shutdown signal");
            None
        }
    };

    match exited {
        Some(status) => {
            log::debug!("uperf server exited with status: {status}");
            // Processes the server started may still hold its pipes open.
            let mut output = stdout.collect_until(deadline).await;
            output.extend_from_slice(&stderr.collect_until(deadline).await);
            Ok(ServerOutcome::ExitedEarly {
                exit_code: status.code(),
                output: String::from_utf8_lossy(&output).into_owned(),
            })
        }
        None => {
            stop(&mut child).await;
            stdout.abort();
            stderr.abort();
            Ok(ServerOutcome::RanUntilCancelled)
        }
    }
}

/// Reads one output stream of the child in the background.
struct OutputReader {
    chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    task: JoinHandle<()>,
}

impl OutputReader {
    fn spawn<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (sender, chunks) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let Some(mut reader) = reader else {
                return;
            };
            let mut buffer = [0u8; 8192];
            loop {
                match reader.read(&mut buffer).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if sender.send(buffer[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to read uperf output: {e}");
                        break;
                    }
                }
            }
        });
        Self { chunks, task }
    }

    /// Everything read before the stream closed or `deadline` passed, whichever is first.
    async fn collect_until(mut self, deadline: Instant) -> Vec<u8> {
        let mut output = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, self.chunks.recv()).await {
                Ok(Some(chunk)) => output.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(_) => {
                    log::warn!("uperf output still open at the run deadline, keeping what was read");
                    self.task.abort();
                    while let Ok(chunk) = self.chunks.try_recv() {
                        output.extend_from_slice(&chunk);
                    }
                    break;
                }
            }
        }
        output
    }

    fn abort(self) {
        self.task.abort();
    }
}

/// Kill the child and reap it.
async fn stop(child: &mut Child) {
    if let Err(e) = child.kill().await {
        log::warn!("Failed to kill uperf process: {e}");
    }
}
