// SPDX-License-Identifier: GPL-3.0-only

//! vcam - virtual camera frame delivery
//!
//! Streams synthetically rendered RGBA frames into an OS-level virtual
//! camera so conferencing and streaming software can consume them like a
//! physical webcam.
//!
//! # Architecture
//!
//! ```text
//! frame source (renderer / test pattern)
//!        │ RGBA
//!        ▼
//! CameraSession::send_frame
//!        │
//!        ▼
//! media::convert (RGBA → NV12, BT.601 limited range)
//!        │
//!        ▼
//! SinkBackend::write ──► helper process stdin  (sinks::bridge)
//!                   └──► V4L2 output device    (sinks::device)
//! ```
//!
//! The crate is organized into:
//!
//! - [`session`]: the camera session state machine and control surface
//! - [`sinks`]: the two sink adapters behind one dispatch surface
//! - [`media`]: pixel conversion and the synthetic frame source
//! - [`guard`]: system throttling suppression while streaming
//! - [`config`]: user configuration handling

pub mod config;
pub mod constants;
pub mod errors;
pub mod guard;
pub mod media;
pub mod session;
pub mod sinks;

// Re-export commonly used types
pub use config::Config;
pub use errors::{SinkError, SinkResult};
pub use session::{CameraSession, SessionState};
pub use sinks::{SinkKind, SinkLayout};
