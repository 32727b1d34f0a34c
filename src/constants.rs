// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Line the helper process prints on stdout once the OS camera sink is open.
///
/// Anything else on stdout is diagnostic output and must not be mistaken
/// for readiness.
pub const READY_SENTINEL: &str = "READY";

/// Maximum time to wait for the sink to become ready after `start`.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait between tearing down an old sink and opening a new one.
///
/// Restarting immediately can race a half-closed helper process or device
/// handle with the new open.
pub const DRAIN_DELAY: Duration = Duration::from_millis(500);

/// Grace period between half-closing a sink's input and forcing termination.
///
/// Gives the helper a chance to flush and unregister its camera cleanly.
pub const GRACE_DELAY: Duration = Duration::from_millis(200);

/// Default output resolution (720p)
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;

/// Default frame cadence
pub const DEFAULT_FPS: u32 = 30;

/// Bytes per RGBA pixel
pub const RGBA_BYTES_PER_PIXEL: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_are_ordered() {
        // A restart must not reopen the sink while the old helper is still
        // inside its close grace period.
        assert!(DRAIN_DELAY > GRACE_DELAY);
    }

    #[test]
    fn test_default_resolution_is_even() {
        // 2x2 chroma subsampling requires even dimensions
        assert_eq!(DEFAULT_WIDTH % 2, 0);
        assert_eq!(DEFAULT_HEIGHT % 2, 0);
    }
}
