// SPDX-License-Identifier: GPL-3.0-only

//! Sink adapters for virtual camera output
//!
//! A sink is the OS-level destination for converted frames. Two variants
//! exist behind one surface:
//!
//! - [`bridge::ProcessBridge`]: spawns an external helper process that owns
//!   the actual camera registration and accepts frames on stdin
//! - [`device::DeviceSink`]: opens a V4L2 output device (v4l2loopback)
//!   directly and writes frames to its file descriptor
//!
//! The session talks to [`SinkBackend`] only; it never sees process- or
//! device-specific types. Every opened sink carries a generation id, and
//! asynchronous sink callbacks (readiness, exit) apply only while their
//! generation is still the current one — events from a superseded sink are
//! discarded rather than corrupting the state of its replacement.

pub mod bridge;
pub mod device;

pub use bridge::ProcessBridge;
pub use device::DeviceSink;

use crate::errors::SinkResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Which sink variant to open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkKind {
    /// External helper process fed over stdin
    Bridge {
        /// Helper program and leading arguments; `width height fps` are
        /// appended as positional arguments at spawn time
        command: Vec<String>,
    },
    /// V4L2 output device written directly
    Device {
        /// Device node, e.g. /dev/video10 (v4l2loopback)
        path: PathBuf,
    },
}

impl Default for SinkKind {
    fn default() -> Self {
        SinkKind::Bridge {
            command: vec![
                "python3".to_string(),
                "scripts/virtual_camera_bridge.py".to_string(),
            ],
        }
    }
}

/// Negotiated buffer layout of the active sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkLayout {
    pub width: u32,
    pub height: u32,
    /// Byte size of one converted (NV12) frame the sink expects
    pub frame_size: usize,
}

/// Readiness state shared between the session and sink callback tasks
///
/// The generation counter makes the "is this still the active sink?"
/// check explicit: a callback captured generation N may only flip the
/// readiness flag while N is still current.
#[derive(Debug, Default)]
pub struct SinkShared {
    ready: AtomicBool,
    generation: AtomicU64,
}

impl SinkShared {
    /// Advance to a fresh generation, invalidating all outstanding
    /// callbacks from earlier sinks. Returns the new generation id.
    pub fn next_generation(&self) -> u64 {
        self.ready.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `generation` still refers to the active sink
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Set readiness on behalf of `generation`; ignored (returns false)
    /// if that generation has been superseded.
    pub fn set_ready(&self, generation: u64, ready: bool) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.ready.store(ready, Ordering::SeqCst);
        true
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Unconditionally drop readiness (used when tearing down)
    pub fn clear_ready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }
}

/// Sink adapter dispatch
///
/// Owns the underlying OS resource exclusively; the session is the only
/// component that holds one of these.
pub enum SinkBackend {
    Bridge(ProcessBridge),
    Device(DeviceSink),
}

impl SinkBackend {
    /// Buffer layout negotiated at open time
    pub fn layout(&self) -> SinkLayout {
        match self {
            SinkBackend::Bridge(b) => b.layout(),
            SinkBackend::Device(d) => d.layout(),
        }
    }

    /// Generation id assigned when this sink was opened
    pub fn generation(&self) -> u64 {
        match self {
            SinkBackend::Bridge(b) => b.generation(),
            SinkBackend::Device(d) => d.generation(),
        }
    }

    /// Forward one converted frame to the sink
    pub async fn write(&mut self, frame: &[u8]) -> SinkResult<()> {
        match self {
            SinkBackend::Bridge(b) => b.write(frame).await,
            SinkBackend::Device(d) => d.write(frame),
        }
    }

    /// Release the underlying resource; safe to call more than once
    pub async fn close(&mut self) {
        match self {
            SinkBackend::Bridge(b) => b.close().await,
            SinkBackend::Device(d) => d.close(),
        }
    }
}

/// Result of opening a sink: the adapter plus a oneshot that resolves
/// with the readiness outcome (true = sentinel seen / device open,
/// false = failed before becoming ready).
pub struct OpenedSink {
    pub backend: SinkBackend,
    pub ready_rx: tokio::sync::oneshot::Receiver<bool>,
}
