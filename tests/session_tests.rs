// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end session lifecycle tests
//!
//! These drive a real helper process (plain `sh` standing in for the
//! camera bridge) through the full protocol: spawn, READY sentinel,
//! frame stream on stdin, EOF close.

use std::time::Duration;
use vcam::media::rgba_frame_size;
use vcam::{CameraSession, SessionState, SinkKind};

fn bridge(script: &str) -> SinkKind {
    SinkKind::Bridge {
        command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
    }
}

/// Helper that accepts the protocol: announces readiness, then swallows
/// the frame stream until EOF.
fn working_helper() -> SinkKind {
    bridge("echo READY; exec cat >/dev/null")
}

fn fast_session(sink: SinkKind) -> CameraSession {
    CameraSession::with_timing(sink, Duration::from_millis(800), Duration::from_millis(50))
}

#[tokio::test]
async fn test_full_streaming_scenario() {
    let session = fast_session(working_helper());

    assert!(session.start(64, 64, 30).await);
    assert!(session.is_ready());
    assert_eq!(session.state().await, SessionState::Ready);

    let frame = vec![128u8; rgba_frame_size(64, 64)];
    for _ in 0..100 {
        assert!(session.send_frame(&frame).await);
    }
    assert_eq!(session.frame_counter(), 100);

    assert!(session.stop().await);
    assert!(!session.is_ready());
    assert_eq!(session.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_stop_twice_is_safe() {
    let session = fast_session(working_helper());

    assert!(session.start(64, 64, 30).await);
    assert!(session.stop().await);
    assert_eq!(session.state().await, SessionState::Idle);
    assert!(session.stop().await);
    assert_eq!(session.state().await, SessionState::Idle);

    // And on a never-started session
    let idle = fast_session(working_helper());
    assert!(idle.stop().await);
    assert!(idle.stop().await);
}

#[tokio::test]
async fn test_wrong_frame_size_is_dropped() {
    let session = fast_session(working_helper());
    assert!(session.start(64, 64, 30).await);

    let short = vec![0u8; 100];
    assert!(!session.send_frame(&short).await);
    assert_eq!(session.frame_counter(), 0);
    // A size mismatch is the caller's bug, not a sink failure; the
    // session stays ready for correctly sized frames.
    assert!(session.is_ready());

    let frame = vec![0u8; rgba_frame_size(64, 64)];
    assert!(session.send_frame(&frame).await);
    assert_eq!(session.frame_counter(), 1);

    session.stop().await;
}

#[tokio::test]
async fn test_startup_timeout_leaves_no_helper_running() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("helper.pid");

    // Helper records its PID but never prints READY
    let session = fast_session(bridge(&format!(
        "echo $$ > {}; exec sleep 30",
        pid_file.display()
    )));

    assert!(!session.start(64, 64, 30).await);
    assert!(!session.is_ready());
    assert_eq!(session.state().await, SessionState::Idle);

    // The timed-out helper must have been torn down, not left dangling
    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    // Give the kill a moment to land, then probe with signal 0
    tokio::time::sleep(Duration::from_millis(100)).await;
    let alive = std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .unwrap()
        .success();
    assert!(!alive, "helper process {} still running after timeout", pid);
}

#[tokio::test]
async fn test_restart_while_ready_starts_fresh() {
    let session = fast_session(working_helper());

    assert!(session.start(64, 64, 30).await);
    let frame = vec![0u8; rgba_frame_size(64, 64)];
    assert!(session.send_frame(&frame).await);
    assert_eq!(session.frame_counter(), 1);

    // Documented policy: start on a live session tears down and reopens
    assert!(session.start(128, 128, 30).await);
    assert!(session.is_ready());
    assert_eq!(session.frame_counter(), 0, "fresh start resets the counter");

    // Old resolution is rejected, new one accepted
    assert!(!session.send_frame(&frame).await);
    let frame = vec![0u8; rgba_frame_size(128, 128)];
    assert!(session.send_frame(&frame).await);
    assert_eq!(session.frame_counter(), 1);

    session.stop().await;
}

#[tokio::test]
async fn test_stop_cancels_inflight_start() {
    // Helper needs a second before announcing readiness
    let session = std::sync::Arc::new(CameraSession::with_timing(
        bridge("sleep 1; echo READY; exec cat >/dev/null"),
        Duration::from_secs(5),
        Duration::from_millis(50),
    ));

    let starter = {
        let session = std::sync::Arc::clone(&session);
        tokio::spawn(async move { session.start(64, 64, 30).await })
    };

    // Let start spawn the helper, then interrupt it
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(session.stop().await);

    assert!(!starter.await.unwrap(), "interrupted start must resolve false");
    assert!(!session.is_ready());
    assert_eq!(session.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_spawn_failure_resolves_false() {
    let session = fast_session(SinkKind::Bridge {
        command: vec!["/nonexistent/helper".to_string()],
    });
    assert!(!session.start(64, 64, 30).await);
    assert_eq!(session.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_helper_exit_while_ready_downgrades() {
    // Helper quits 300ms after READY while the session still points at it
    let session = fast_session(bridge("echo READY; sleep 0.3"));

    assert!(session.start(64, 64, 30).await);
    assert!(session.is_ready());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!session.is_ready(), "helper exit must downgrade readiness");

    let frame = vec![0u8; rgba_frame_size(64, 64)];
    assert!(!session.send_frame(&frame).await);

    // stop/start is the documented recovery path
    assert!(session.stop().await);
    assert_eq!(session.state().await, SessionState::Idle);
}
