// SPDX-License-Identifier: GPL-3.0-only

//! CLI command implementations
//!
//! These drive the session from the command line the way the UI layer
//! would: a cadence loop at the configured fps feeding RGBA frames into
//! `send_frame`, with a drop-don't-queue policy when the loop falls
//! behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vcam::media::TestPattern;
use vcam::{CameraSession, Config};

/// Stream test-pattern frames to the virtual camera until interrupted
pub fn stream(config: Config, duration: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_stream(config, duration))
}

async fn run_stream(config: Config, duration: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let session = Arc::new(CameraSession::new(config.sink.clone()));

    // Guarantee teardown on Ctrl-C regardless of where the loop is
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    if !session.start(config.width, config.height, config.fps).await {
        return Err(
            "could not start the virtual camera; try toggling the OS virtual camera facility once"
                .into(),
        );
    }

    info!(
        width = config.width,
        height = config.height,
        fps = config.fps,
        "Streaming test pattern, Ctrl-C to stop"
    );

    let mut pattern = TestPattern::new(config.width, config.height);
    let mut interval = tokio::time::interval(Duration::from_secs(1) / config.fps);
    // Drop missed frames instead of bursting to catch up
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let deadline = duration.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
    let mut dropped: u64 = 0;

    while running.load(Ordering::SeqCst) {
        if let Some(deadline) = deadline {
            if tokio::time::Instant::now() >= deadline {
                break;
            }
        }

        interval.tick().await;

        let frame = pattern.next_frame();
        if session.send_frame(&frame).await {
            let sent = session.frame_counter();
            if sent % 100 == 0 {
                debug!(sent, dropped, "Virtual camera frames forwarded");
            }
        } else {
            dropped += 1;
            if !session.is_ready() {
                warn!("Sink no longer ready, stopping stream");
                break;
            }
        }
    }

    session.stop().await;
    info!(
        sent = session.frame_counter(),
        dropped, "Stream finished"
    );
    Ok(())
}

/// Open the configured sink, report readiness and layout, and close it
pub fn probe(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let session = CameraSession::new(config.sink.clone());

        println!("sink: {:?}", config.sink);
        println!(
            "requested: {}x{} @ {}fps",
            config.width, config.height, config.fps
        );

        if session.start(config.width, config.height, config.fps).await {
            println!("ready: yes");
            session.stop().await;
        } else {
            println!("ready: no (see log output for details)");
        }
        Ok(())
    })
}
