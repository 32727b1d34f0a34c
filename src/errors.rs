// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the virtual camera core
//!
//! Nothing in this crate lets a sink-level fault escape as a panic or an
//! unhandled error: every error below is caught at the session boundary
//! and converted into a state transition plus a boolean result.

use std::fmt;

/// Result type alias for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors raised by the sink adapters
///
/// Startup timeouts and frame-size mismatches never reach this type: the
/// session handles both directly as logged boolean outcomes.
#[derive(Debug, Clone)]
pub enum SinkError {
    /// Helper process could not be created; fatal to the start attempt
    Spawn(String),
    /// Native device handle could not be opened or format negotiation failed
    DeviceOpen(String),
    /// Broken pipe / closed handle / OS error while writing a frame
    Write(String),
    /// Helper exited while the session still considered it active
    ProcessExited(Option<i32>),
    /// Operation attempted on a sink that has already been closed
    Closed,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Spawn(msg) => write!(f, "Failed to spawn helper process: {}", msg),
            SinkError::DeviceOpen(msg) => write!(f, "Failed to open output device: {}", msg),
            SinkError::Write(msg) => write!(f, "Frame write failed: {}", msg),
            SinkError::ProcessExited(Some(code)) => {
                write!(f, "Helper process exited with code {}", code)
            }
            SinkError::ProcessExited(None) => write!(f, "Helper process exited by signal"),
            SinkError::Closed => write!(f, "Sink is closed"),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Write(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert!(
            SinkError::Spawn("no such file".to_string())
                .to_string()
                .contains("no such file")
        );
        assert!(
            SinkError::ProcessExited(Some(1))
                .to_string()
                .contains("code 1")
        );
        assert!(SinkError::ProcessExited(None).to_string().contains("signal"));
    }
}
