// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 loopback device sink
//!
//! Writes converted frames straight to a v4l2loopback output device
//! (`sudo modprobe v4l2loopback devices=1 video_nr=10`), skipping the
//! helper process entirely. Applications see the loopback node as a
//! regular camera.
//!
//! Unlike the process bridge there is no handshake: the sink is ready as
//! soon as the device opens and format negotiation succeeds.

use crate::errors::{SinkError, SinkResult};
use crate::media::nv12_frame_size;
use crate::sinks::{OpenedSink, SinkBackend, SinkLayout, SinkShared};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use v4l::video::Output;
use v4l::FourCC;

/// Sink adapter that owns a V4L2 output device handle
pub struct DeviceSink {
    path: PathBuf,
    /// Write handle; `None` after close
    file: Option<std::fs::File>,
    layout: SinkLayout,
    generation: u64,
    frames_written: u64,
}

impl DeviceSink {
    /// Open the device and negotiate NV12 at the requested resolution
    ///
    /// Open and layout query succeed or fail together: a device that opens
    /// but refuses the format is released before the error is reported.
    /// The device variant is ready synchronously, so the returned
    /// readiness channel resolves immediately.
    pub fn open(
        path: &Path,
        width: u32,
        height: u32,
        shared: Arc<SinkShared>,
        generation: u64,
    ) -> SinkResult<OpenedSink> {
        info!(path = %path.display(), width, height, generation, "Opening V4L2 output device");

        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| SinkError::DeviceOpen(format!("{}: {}", path.display(), e)))?;

        // Negotiate the format through a v4l handle on the same node; the
        // driver fills in the actual frame layout (sizeimage).
        let device = v4l::Device::with_path(path)
            .map_err(|e| SinkError::DeviceOpen(format!("{}: {}", path.display(), e)))?;

        let nv12 = FourCC::new(b"NV12");
        let requested = v4l::Format::new(width, height, nv12);
        let actual = Output::set_format(&device, &requested)
            .map_err(|e| SinkError::DeviceOpen(format!("format negotiation failed: {}", e)))?;

        if actual.fourcc != nv12 || actual.width != width || actual.height != height {
            return Err(SinkError::DeviceOpen(format!(
                "device negotiated {}x{} {}, wanted {}x{} NV12",
                actual.width, actual.height, actual.fourcc, width, height
            )));
        }

        let frame_size = if actual.size != 0 {
            actual.size as usize
        } else {
            nv12_frame_size(width, height)
        };
        debug!(frame_size, "Negotiated device frame layout");

        let sink = DeviceSink {
            path: path.to_path_buf(),
            file: Some(file),
            layout: SinkLayout {
                width,
                height,
                frame_size,
            },
            generation,
            frames_written: 0,
        };

        // Ready as soon as open + layout succeed
        shared.set_ready(generation, true);
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let _ = ready_tx.send(true);

        Ok(OpenedSink {
            backend: SinkBackend::Device(sink),
            ready_rx,
        })
    }

    pub fn layout(&self) -> SinkLayout {
        self.layout
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hand one converted frame to the device write primitive
    pub fn write(&mut self, frame: &[u8]) -> SinkResult<()> {
        let file = self.file.as_mut().ok_or(SinkError::Closed)?;
        file.write_all(frame)
            .map_err(|e| SinkError::Write(e.to_string()))?;
        self.frames_written += 1;
        Ok(())
    }

    /// Release the device handle; double close is a no-op
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            info!(
                path = %self.path.display(),
                frames = self.frames_written,
                "Closed V4L2 output device"
            );
        }
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        if self.file.is_some() {
            warn!(path = %self.path.display(), "Device sink dropped without close");
            self.close();
        }
    }
}
