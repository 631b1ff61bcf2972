// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for pose pipeline operations
//!
//! This module provides command-line functionality for:
//! - Computing joint angles for a stored landmark payload
//! - Running the full pipeline against simulated collaborators

use pose_camera::backends::simulated::{RigOptions, SimEvent, simulated_rig};
use pose_camera::config::Config;
use pose_camera::constants::simulation;
use pose_camera::landmarks::{LandmarkIngestPipeline, ReportReceiver};
use pose_camera::pipeline::{PipelineFacade, lifecycle_channel};
use std::path::Path;
use std::time::{Duration, Instant};

/// What the `simulate` command should do
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub frames: u64,
    pub switch_after: Option<u64>,
    pub pause_resume: bool,
    pub fps: u32,
}

/// Decode one payload file and print its joint angle report
pub fn print_angles(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let payload = std::fs::read(path)?;
    let report = LandmarkIngestPipeline::new().ingest(&payload)?;

    println!("{}", report);
    println!();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Stream simulated frames through the full pipeline and print the reports
pub fn simulate(config: &Config, plan: &SimulationPlan) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = lifecycle_channel();
    let (collaborators, rig) = simulated_rig(&tx, RigOptions::streaming(plan.fps));
    let mut pipeline = PipelineFacade::launch(config, collaborators, (tx, rx))?;
    let mut reports = pipeline
        .take_reports()
        .ok_or("report stream already taken")?;

    let snapshot = pipeline.start(config.initial_facing)?;
    println!("Started {} camera ({})", snapshot.facing, snapshot.state);

    // Generous bound so a stalled pipeline cannot hang the command
    let frame_time = Duration::from_secs(1) / plan.fps.max(1);
    let deadline = Instant::now() + frame_time * (plan.frames as u32).saturating_mul(3) + Duration::from_secs(2);

    let mut switched = false;
    let mut paused = false;
    let mut received = 0u64;

    loop {
        received += print_pending(&mut reports);

        let snapshot = pipeline.snapshot()?;
        let submitted = snapshot.frames_submitted;
        if submitted >= plan.frames {
            break;
        }
        if Instant::now() > deadline {
            eprintln!("Timed out after {} of {} frames", submitted, plan.frames);
            break;
        }

        if let Some(after) = plan.switch_after
            && !switched
            && submitted >= after
        {
            let snapshot = pipeline.switch_camera()?;
            println!("Switched to {} camera ({})", snapshot.facing, snapshot.state);
            switched = true;
        }

        if plan.pause_resume && !paused && submitted >= plan.frames / 2 {
            let snapshot = pipeline.pause()?;
            println!("Paused ({})", snapshot.state);
            std::thread::sleep(frame_time * 5);
            let snapshot = pipeline.resume()?;
            println!("Resumed ({})", snapshot.state);
            paused = true;
        }

        std::thread::sleep(simulation::REPORT_POLL_INTERVAL);
    }

    let snapshot = pipeline.stop()?;
    println!("Stopped ({})", snapshot.state);

    // Packets already in flight still produce reports
    let drain_until = Instant::now() + simulation::REPORT_DRAIN_TIMEOUT;
    while Instant::now() < drain_until {
        received += print_pending(&mut reports);
        std::thread::sleep(simulation::REPORT_POLL_INTERVAL);
    }

    let stats = pipeline.ingest_stats();
    pipeline.shutdown();

    let handles_opened = rig
        .log
        .count(|e| matches!(e, SimEvent::ConverterCreated { .. }));
    println!();
    println!("Frames submitted:   {}", snapshot.frames_submitted);
    println!("Reports received:   {}", received);
    println!("Packets dropped:    {}", stats.dropped());
    println!("Reports overflowed: {}", stats.overflowed());
    println!("Handles opened:     {}", handles_opened);
    println!("Max live handles:   {}", rig.gpu.max_live_converters());

    Ok(())
}

fn print_pending(reports: &mut ReportReceiver) -> u64 {
    let mut count = 0;
    while let Ok(report) = reports.try_recv() {
        match serde_json::to_string(&report) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        }
        count += 1;
    }
    count
}
