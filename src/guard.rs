// SPDX-License-Identifier: GPL-3.0-only

//! System throttling suppression tied to the streaming session
//!
//! While the virtual camera is live the desktop must not idle-suspend or
//! throttle us, or the 30 fps cadence stutters for every downstream
//! consumer. This takes an inhibit cookie from the session bus
//! (`org.freedesktop.ScreenSaver`) when the session becomes ready and
//! returns it when the session goes idle.
//!
//! Failure to reach the bus (headless systems, CI) is logged and
//! tolerated; the guard then simply holds no cookie.

use tracing::{debug, warn};

const SCREENSAVER_SERVICE: &str = "org.freedesktop.ScreenSaver";
const SCREENSAVER_PATH: &str = "/org/freedesktop/ScreenSaver";

/// Holds at most one inhibit cookie; acquire/release are idempotent
#[derive(Default)]
pub struct PerformanceGuard {
    connection: Option<zbus::Connection>,
    cookie: Option<u32>,
}

impl PerformanceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an inhibit cookie is currently held
    pub fn is_active(&self) -> bool {
        self.cookie.is_some()
    }

    /// Request suppression; a no-op if a cookie is already held
    pub async fn acquire(&mut self) {
        if self.cookie.is_some() {
            debug!("Throttling suppression already held");
            return;
        }

        let connection = match self.connection().await {
            Some(c) => c,
            None => return,
        };

        let result: Result<u32, zbus::Error> = async {
            let proxy = zbus::Proxy::new(
                &connection,
                SCREENSAVER_SERVICE,
                SCREENSAVER_PATH,
                SCREENSAVER_SERVICE,
            )
            .await?;
            proxy
                .call("Inhibit", &("vcam", "streaming to virtual camera"))
                .await
        }
        .await;

        match result {
            Ok(cookie) => {
                debug!(cookie, "Acquired throttling suppression");
                self.cookie = Some(cookie);
            }
            Err(e) => {
                warn!(error = %e, "Could not inhibit screensaver, streaming unguarded");
            }
        }
    }

    /// Return the cookie if held; a no-op otherwise
    pub async fn release(&mut self) {
        let Some(cookie) = self.cookie.take() else {
            return;
        };

        let Some(connection) = self.connection().await else {
            return;
        };

        let result: Result<(), zbus::Error> = async {
            let proxy = zbus::Proxy::new(
                &connection,
                SCREENSAVER_SERVICE,
                SCREENSAVER_PATH,
                SCREENSAVER_SERVICE,
            )
            .await?;
            proxy.call("UnInhibit", &(cookie,)).await
        }
        .await;

        match result {
            Ok(()) => debug!(cookie, "Released throttling suppression"),
            Err(e) => warn!(error = %e, cookie, "Failed to release inhibit cookie"),
        }
    }

    async fn connection(&mut self) -> Option<zbus::Connection> {
        if self.connection.is_none() {
            match zbus::Connection::session().await {
                Ok(c) => self.connection = Some(c),
                Err(e) => {
                    warn!(error = %e, "Session D-Bus unavailable, performance guard disabled");
                    return None;
                }
            }
        }
        self.connection.clone()
    }
}
