// SPDX-License-Identifier: GPL-3.0-only

//! Helper-process sink
//!
//! Spawns an external helper that owns the actual OS camera registration
//! (the default helper wraps pyvirtualcam). Protocol:
//!
//! - helper is invoked with positional arguments `width height fps`
//! - helper prints the literal line `READY` on stdout exactly once, after
//!   it has opened the OS camera sink; everything else on stdout and all
//!   of stderr is diagnostic text
//! - after `READY`, the helper accepts a continuous stream of fixed-size
//!   NV12 frames on stdin
//! - closing stdin signals EOF; the helper flushes and exits on its own
//!
//! Readiness is downgraded only when the helper process actually exits,
//! never because its stdout closed: a conforming helper may shut its
//! output after the sentinel and keep consuming frames. Exit detection
//! lives in a supervisor task that owns the child handle; broken pipes
//! on write surface as error results at the write boundary.

use crate::constants::{GRACE_DELAY, READY_SENTINEL};
use crate::errors::{SinkError, SinkResult};
use crate::media::nv12_frame_size;
use crate::sinks::{OpenedSink, SinkBackend, SinkLayout, SinkShared};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Sink adapter that feeds an external helper process over stdin
///
/// The child handle itself is owned by the supervisor task; the adapter
/// keeps the stdin pipe, a recorded exit status, and the channels for
/// requesting and awaiting teardown.
pub struct ProcessBridge {
    stdin: Option<ChildStdin>,
    /// Set once by the supervisor when the helper has exited
    exit: Arc<OnceLock<ExitStatus>>,
    kill_tx: Option<oneshot::Sender<()>>,
    reaped_rx: Option<oneshot::Receiver<()>>,
    layout: SinkLayout,
    generation: u64,
}

impl ProcessBridge {
    /// Spawn the helper and attach the watcher tasks
    ///
    /// `command` is the helper program plus any leading arguments;
    /// `width height fps` are appended. Spawn failure is fatal to the
    /// start attempt. Readiness resolves through the returned oneshot
    /// once the sentinel line arrives (true) or the helper goes away
    /// before printing it (false).
    pub fn open(
        command: &[String],
        width: u32,
        height: u32,
        fps: u32,
        shared: Arc<SinkShared>,
        generation: u64,
    ) -> SinkResult<OpenedSink> {
        let (program, leading_args) = command
            .split_first()
            .ok_or_else(|| SinkError::Spawn("helper command is empty".to_string()))?;

        info!(
            program = %program,
            width,
            height,
            fps,
            generation,
            "Spawning virtual camera helper"
        );

        let mut child = Command::new(program)
            .args(leading_args)
            .arg(width.to_string())
            .arg(height.to_string())
            .arg(fps.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SinkError::Spawn(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SinkError::Spawn("helper stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SinkError::Spawn("helper stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SinkError::Spawn("helper stderr not captured".to_string()))?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        let (reaped_tx, reaped_rx) = oneshot::channel();
        let exit = Arc::new(OnceLock::new());

        tokio::spawn(watch_stdout(stdout, Arc::clone(&shared), generation, ready_tx));
        tokio::spawn(relay_stderr(stderr, generation));
        tokio::spawn(supervise(
            child,
            Arc::clone(&shared),
            generation,
            Arc::clone(&exit),
            kill_rx,
            reaped_tx,
        ));

        let bridge = ProcessBridge {
            stdin: Some(stdin),
            exit,
            kill_tx: Some(kill_tx),
            reaped_rx: Some(reaped_rx),
            layout: SinkLayout {
                width,
                height,
                frame_size: nv12_frame_size(width, height),
            },
            generation,
        };

        Ok(OpenedSink {
            backend: SinkBackend::Bridge(bridge),
            ready_rx,
        })
    }

    pub fn layout(&self) -> SinkLayout {
        self.layout
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Write one converted frame to the helper's stdin
    ///
    /// A recorded helper exit surfaces as `ProcessExited` before any pipe
    /// write is attempted; an exit the supervisor has not observed yet
    /// still fails the write itself with a broken pipe.
    pub async fn write(&mut self, frame: &[u8]) -> SinkResult<()> {
        let stdin = self.stdin.as_mut().ok_or(SinkError::Closed)?;
        if let Some(status) = self.exit.get() {
            return Err(SinkError::ProcessExited(status.code()));
        }

        stdin
            .write_all(frame)
            .await
            .map_err(|e| SinkError::Write(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| SinkError::Write(e.to_string()))?;
        Ok(())
    }

    /// Close stdin (EOF) and hand teardown to the supervisor: grace
    /// delay, then SIGKILL if the helper has not exited. Waits until the
    /// child is reaped. Idempotent, and returns promptly when the helper
    /// is already gone.
    pub async fn close(&mut self) {
        // Dropping stdin half-closes the pipe and lets the helper flush
        // and unregister its camera cleanly.
        self.stdin.take();

        let Some(kill_tx) = self.kill_tx.take() else {
            return;
        };
        // Send fails only when the supervisor already reaped the child
        let _ = kill_tx.send(());

        if let Some(reaped) = self.reaped_rx.take() {
            let _ = reaped.await;
        }
    }
}

/// Own the child handle: detect exit, perform teardown on request
///
/// This is the single place readiness is downgraded for a dead helper,
/// and only after `wait` has actually returned — guarded by the
/// generation so a superseded helper cannot touch its replacement's
/// state. A teardown request gives the helper the grace window to exit
/// on EOF before killing it; a helper that is already gone costs nothing.
async fn supervise(
    mut child: Child,
    shared: Arc<SinkShared>,
    generation: u64,
    exit: Arc<OnceLock<ExitStatus>>,
    mut kill_rx: oneshot::Receiver<()>,
    reaped_tx: oneshot::Sender<()>,
) {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => {
                let _ = exit.set(status);
                if !shared.is_current(generation) {
                    debug!(generation, code = ?status.code(), "Superseded helper exited");
                } else if shared.is_ready() {
                    shared.set_ready(generation, false);
                    warn!(
                        generation,
                        code = ?status.code(),
                        "Helper process exited while active"
                    );
                } else {
                    debug!(generation, code = ?status.code(), "Helper exited before becoming ready");
                }
            }
            Err(e) => warn!(generation, error = %e, "Failed to wait on helper"),
        },
        _ = &mut kill_rx => {
            match tokio::time::timeout(GRACE_DELAY, child.wait()).await {
                Ok(Ok(status)) => {
                    let _ = exit.set(status);
                    debug!(generation, ?status, "Helper exited on EOF");
                }
                Ok(Err(e)) => warn!(generation, error = %e, "Failed to reap helper"),
                Err(_) => {
                    debug!(
                        generation,
                        "Helper still running after grace delay, killing"
                    );
                    if let Err(e) = child.start_kill() {
                        debug!(generation, error = %e, "Kill failed");
                    }
                    match child.wait().await {
                        Ok(status) => {
                            let _ = exit.set(status);
                            info!(
                                generation,
                                code = ?status.code(),
                                "Virtual camera helper stopped"
                            );
                        }
                        Err(e) => warn!(generation, error = %e, "Failed to reap helper"),
                    }
                }
            }
        }
    }

    let _ = reaped_tx.send(());
}

/// Watch helper stdout for the readiness sentinel
///
/// EOF only ends the watch. It says nothing about the process: a
/// conforming helper may close its output right after the sentinel and
/// keep consuming frames, so readiness is left alone here — the
/// supervisor downgrades it when the process actually exits. A start
/// attempt still waiting on the sentinel is resolved false, since a
/// closed stdout can never deliver it.
async fn watch_stdout(
    stdout: ChildStdout,
    shared: Arc<SinkShared>,
    generation: u64,
    ready_tx: oneshot::Sender<bool>,
) {
    let mut lines = BufReader::new(stdout).lines();
    let mut ready_tx = Some(ready_tx);

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line == READY_SENTINEL {
                    if shared.set_ready(generation, true) {
                        info!(generation, "Helper reported READY");
                    } else {
                        debug!(generation, "Discarding READY from superseded helper");
                    }
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(true);
                    }
                } else if !line.is_empty() {
                    debug!(generation, line, "Helper output");
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(generation, error = %e, "Error reading helper stdout");
                break;
            }
        }
    }

    if let Some(tx) = ready_tx.take() {
        debug!(generation, "Helper stdout closed before the sentinel");
        let _ = tx.send(false);
    }
}

/// Relay helper stderr lines into the log (diagnostic only)
async fn relay_stderr(stderr: ChildStderr, generation: u64) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            debug!(generation, line = %line.trim(), "Helper stderr");
        }
    }
}
