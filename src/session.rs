// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera session lifecycle
//!
//! One [`CameraSession`] owns at most one live sink at a time and drives
//! it through `Idle -> Starting -> Ready -> Stopping -> Idle`. The control
//! surface is four calls: [`start`](CameraSession::start),
//! [`stop`](CameraSession::stop), [`send_frame`](CameraSession::send_frame)
//! and [`is_ready`](CameraSession::is_ready). All of them return booleans;
//! no sink-level error escapes past this boundary.
//!
//! Restart policy: `start` while a session is already live tears the old
//! sink down completely, waits the drain delay, and opens a fresh one.
//! There is no internal frame queue — `send_frame` converts and forwards
//! on the calling task, and a `false` return means the frame was dropped.

use crate::constants::{DRAIN_DELAY, STARTUP_TIMEOUT};
use crate::guard::PerformanceGuard;
use crate::media::{rgba_frame_size, rgba_to_nv12};
use crate::sinks::{DeviceSink, OpenedSink, ProcessBridge, SinkBackend, SinkKind, SinkLayout, SinkShared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Lifecycle state of the session
///
/// `Ready` implies frames may be accepted; streaming is not a separate
/// state. A failed attempt always routes back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Ready,
    Stopping,
}

struct Inner {
    state: SessionState,
    sink: Option<SinkBackend>,
    layout: Option<SinkLayout>,
    guard: PerformanceGuard,
}

/// Owner of the virtual camera lifecycle
///
/// All state transitions are serialized behind one async mutex; the
/// readiness flag lives outside it so `send_frame` and `is_ready` can
/// reject work without contending with an in-progress start or stop.
pub struct CameraSession {
    inner: Mutex<Inner>,
    shared: Arc<SinkShared>,
    frame_counter: AtomicU64,
    sink_kind: SinkKind,
    startup_timeout: Duration,
    drain_delay: Duration,
}

impl CameraSession {
    pub fn new(sink_kind: SinkKind) -> Self {
        Self::with_timing(sink_kind, STARTUP_TIMEOUT, DRAIN_DELAY)
    }

    /// Construct with explicit timing bounds (tests shorten these)
    pub fn with_timing(
        sink_kind: SinkKind,
        startup_timeout: Duration,
        drain_delay: Duration,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                sink: None,
                layout: None,
                guard: PerformanceGuard::new(),
            }),
            shared: Arc::new(SinkShared::default()),
            frame_counter: AtomicU64::new(0),
            sink_kind,
            startup_timeout,
            drain_delay,
        }
    }

    /// Whether the sink currently accepts frames
    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    /// Frames accepted since the last successful `start`
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Open the sink and wait for it to become ready
    ///
    /// Resolves `true` once the sink reported readiness, `false` on spawn
    /// or open failure, startup timeout, or a concurrent `stop`. A live
    /// session is fully torn down (including the drain delay) before the
    /// new sink is allocated.
    pub async fn start(&self, width: u32, height: u32, fps: u32) -> bool {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            warn!(width, height, "Rejecting start: dimensions must be positive and even");
            return false;
        }
        if fps == 0 {
            warn!("Rejecting start: fps must be positive");
            return false;
        }

        let generation;
        {
            let mut inner = self.inner.lock().await;

            if inner.state != SessionState::Idle || inner.sink.is_some() {
                info!("Stopping existing virtual camera before restart");
                self.stop_locked(&mut inner).await;
                // Let the old resource finish closing before a new open
                tokio::time::sleep(self.drain_delay).await;
            }

            inner.state = SessionState::Starting;
            generation = self.shared.next_generation();
            self.frame_counter.store(0, Ordering::SeqCst);

            let opened = match self.open_sink(width, height, fps, generation) {
                Ok(opened) => opened,
                Err(e) => {
                    warn!(error = %e, "Virtual camera start failed");
                    inner.state = SessionState::Idle;
                    return false;
                }
            };

            inner.layout = Some(opened.backend.layout());
            inner.sink = Some(opened.backend);

            // Wait for readiness outside the lock so stop() can interrupt
            drop(inner);

            let became_ready =
                match tokio::time::timeout(self.startup_timeout, opened.ready_rx).await {
                    Ok(Ok(ready)) => ready,
                    Ok(Err(_)) => false,
                    Err(_) => {
                        warn!(generation, "Virtual camera startup timeout");
                        false
                    }
                };

            let mut inner = self.inner.lock().await;

            // A concurrent stop or restart may have superseded us while we
            // waited; its teardown already handled the sink.
            if !self.shared.is_current(generation) {
                debug!(generation, "Start attempt superseded, resolving false");
                return false;
            }

            if became_ready && inner.state == SessionState::Starting && self.shared.is_ready() {
                inner.state = SessionState::Ready;
                inner.guard.acquire().await;
                info!(width, height, fps, generation, "Virtual camera ready");
                return true;
            }

            // Not ready in time: tear down the partially started sink
            self.stop_locked(&mut inner).await;
        }
        false
    }

    /// Convert and forward one RGBA frame
    ///
    /// Returns `false` (frame dropped) unless the session is ready, the
    /// buffer length matches the active resolution, and the sink write
    /// succeeds. Write failures downgrade readiness; `stop`/`start` is
    /// the recovery path. Never panics past this boundary.
    pub async fn send_frame(&self, rgba: &[u8]) -> bool {
        if !self.shared.is_ready() {
            return false;
        }

        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Ready || !self.shared.is_ready() {
            return false;
        }
        let Some(layout) = inner.layout else {
            return false;
        };

        let expected = rgba_frame_size(layout.width, layout.height);
        if rgba.len() != expected {
            warn!(
                expected,
                actual = rgba.len(),
                "Dropping frame with mismatched buffer size"
            );
            return false;
        }

        let nv12 = rgba_to_nv12(rgba, layout.width, layout.height);

        let Some(sink) = inner.sink.as_mut() else {
            return false;
        };
        match sink.write(&nv12).await {
            Ok(()) => {
                self.frame_counter.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(e) => {
                warn!(error = %e, "Frame write failed, downgrading readiness");
                self.shared.clear_ready();
                false
            }
        }
    }

    /// Tear the session down; idempotent
    ///
    /// Readiness is cleared before the resource is touched, so concurrent
    /// `send_frame` calls are rejected immediately. Always ends `Idle`,
    /// and causes any in-flight `start` to resolve `false`.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        self.stop_locked(&mut inner).await;
        true
    }

    async fn stop_locked(&self, inner: &mut Inner) {
        if inner.state == SessionState::Idle && inner.sink.is_none() {
            return;
        }

        inner.state = SessionState::Stopping;
        // Invalidates outstanding sink callbacks and drops readiness in
        // one step; a superseded helper can no longer touch our state.
        self.shared.next_generation();

        if let Some(mut sink) = inner.sink.take() {
            sink.close().await;
        }
        inner.layout = None;
        inner.guard.release().await;
        inner.state = SessionState::Idle;
        info!("Virtual camera session stopped");
    }

    fn open_sink(
        &self,
        width: u32,
        height: u32,
        fps: u32,
        generation: u64,
    ) -> crate::errors::SinkResult<OpenedSink> {
        match &self.sink_kind {
            SinkKind::Bridge { command } => ProcessBridge::open(
                command,
                width,
                height,
                fps,
                Arc::clone(&self.shared),
                generation,
            ),
            SinkKind::Device { path } => {
                DeviceSink::open(path, width, height, Arc::clone(&self.shared), generation)
            }
        }
    }
}
