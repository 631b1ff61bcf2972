// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end tests: simulated camera through GPU and ingest threads

use pose_camera::backends::display::SurfaceRef;
use pose_camera::backends::simulated::{RigOptions, SimEvent, SimulatedRig, simulated_rig};
use pose_camera::constants::REPORT_CHANNEL_CAPACITY;
use pose_camera::errors::{CameraError, PipelineError};
use pose_camera::landmarks::ReportReceiver;
use pose_camera::pipeline::lifecycle_channel;
use pose_camera::{CameraFacing, Config, Joint, LifecycleState, PipelineFacade, TimestampedReport};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

fn launch(options: RigOptions) -> (PipelineFacade, ReportReceiver, SimulatedRig) {
    let config = Config {
        log_reports: false,
        ..Config::default()
    };
    let (tx, rx) = lifecycle_channel();
    let (collaborators, rig) = simulated_rig(&tx, options);
    let mut pipeline = PipelineFacade::launch(&config, collaborators, (tx, rx)).unwrap();
    let reports = pipeline.take_reports().unwrap();
    (pipeline, reports, rig)
}

fn collect_reports(reports: &mut ReportReceiver, count: usize) -> Vec<TimestampedReport> {
    let deadline = Instant::now() + WAIT;
    let mut received = Vec::new();
    while received.len() < count && Instant::now() < deadline {
        match reports.try_recv() {
            Ok(report) => received.push(report),
            Err(_) => std::thread::sleep(Duration::from_millis(2)),
        }
    }
    received
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn test_frames_become_joint_angle_reports() {
    let (mut pipeline, mut reports, rig) = launch(RigOptions::streaming(200));

    let snapshot = pipeline.start(CameraFacing::Back).unwrap();
    assert_eq!(snapshot.state, LifecycleState::Starting);

    let received = collect_reports(&mut reports, 5);
    assert_eq!(received.len(), 5, "reports should flow");
    for report in &received {
        for joint in Joint::ALL {
            let degrees = report.angles.angle(joint);
            assert!((0.0..=180.0).contains(&degrees), "{:?} = {}", joint, degrees);
        }
    }

    let snapshot = pipeline.snapshot().unwrap();
    assert_eq!(snapshot.state, LifecycleState::Running);
    assert!(snapshot.frames_submitted >= 5);

    pipeline.shutdown();
    assert_eq!(rig.gpu.live_converters(), 0);
}

#[test]
fn test_switch_keeps_reports_flowing() {
    let (mut pipeline, mut reports, rig) = launch(RigOptions::streaming(200));
    pipeline.start(CameraFacing::Back).unwrap();
    assert_eq!(collect_reports(&mut reports, 3).len(), 3);

    pipeline.switch_camera().unwrap();
    assert!(wait_for(|| pipeline
        .snapshot()
        .is_ok_and(|s| s.state == LifecycleState::Running)));
    assert_eq!(pipeline.snapshot().unwrap().facing, CameraFacing::Front);

    // Drop what was in flight before the switch, then expect fresh reports
    while reports.try_recv().is_ok() {}
    assert_eq!(collect_reports(&mut reports, 3).len(), 3);

    pipeline.shutdown();
    assert_eq!(rig.gpu.max_live_converters(), 1);
}

#[test]
fn test_pause_and_resume() {
    let (mut pipeline, mut reports, _rig) = launch(RigOptions::streaming(200));
    pipeline.start(CameraFacing::Back).unwrap();
    assert_eq!(collect_reports(&mut reports, 2).len(), 2);

    let paused = pipeline.pause().unwrap();
    assert_eq!(paused.state, LifecycleState::Paused);
    assert!(!paused.handle_open);
    assert!(!paused.display_visible);

    let resumed = pipeline.resume().unwrap();
    assert_eq!(resumed.state, LifecycleState::Starting);
    assert!(wait_for(|| pipeline
        .snapshot()
        .is_ok_and(|s| s.frames_submitted > paused.frames_submitted)));

    pipeline.shutdown();
}

#[test]
fn test_wrong_cardinality_payloads_are_dropped() {
    let (mut pipeline, mut reports, _rig) = launch(RigOptions {
        payload_cardinality: 30,
        ..RigOptions::streaming(200)
    });
    let stats = pipeline.ingest_stats();

    pipeline.start(CameraFacing::Back).unwrap();
    assert!(wait_for(|| stats.wrong_cardinality() >= 3));
    assert!(reports.try_recv().is_err(), "no partial reports");
    assert_eq!(stats.reports(), 0);

    // The lifecycle is unaffected by decode failures
    assert_eq!(pipeline.snapshot().unwrap().state, LifecycleState::Running);
    pipeline.shutdown();
}

#[test]
fn test_unread_reports_are_capped() {
    let (mut pipeline, mut reports, _rig) = launch(RigOptions::streaming(500));
    let stats = pipeline.ingest_stats();

    pipeline.start(CameraFacing::Back).unwrap();
    assert!(wait_for(|| stats.overflowed() > 0));
    pipeline.shutdown();

    let mut buffered = 0;
    while reports.try_recv().is_ok() {
        buffered += 1;
    }
    assert_eq!(buffered, REPORT_CHANNEL_CAPACITY);
    assert_eq!(stats.reports(), buffered as u64 + stats.overflowed());
}

#[test]
fn test_start_without_permission() {
    let (mut pipeline, _reports, rig) = launch(RigOptions {
        permission_granted: false,
        ..RigOptions::default()
    });

    let err = pipeline.start(CameraFacing::Front).unwrap_err();
    assert!(matches!(err, PipelineError::Camera(CameraError::Unavailable(_))));
    assert_eq!(pipeline.snapshot().unwrap().state, LifecycleState::Idle);

    pipeline.shutdown();
    assert_eq!(rig.log.count(|e| matches!(e, SimEvent::CameraStarted { .. })), 0);
}

#[test]
fn test_streaming_sink_gets_surface_at_launch() {
    let (mut pipeline, _reports, rig) = launch(RigOptions::default());
    assert!(rig.log.events().contains(&SimEvent::StreamingAttached {
        surface: SurfaceRef(1),
        orientation: 90,
    }));
    pipeline.shutdown();
}

#[test]
fn test_requests_after_shutdown_are_disconnected() {
    let (mut pipeline, _reports, _rig) = launch(RigOptions::default());
    pipeline.shutdown();
    assert_eq!(pipeline.snapshot(), Err(PipelineError::Disconnected));
    assert_eq!(pipeline.notify_permission_granted(), Err(PipelineError::Disconnected));
}
