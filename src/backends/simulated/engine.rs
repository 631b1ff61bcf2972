// SPDX-License-Identifier: GPL-3.0-only

//! Simulated pose detection engine
//!
//! Runs its own worker thread, like the real engine: textures are queued by
//! `on_new_frame` and landmark packets come back through the registered
//! callbacks from that thread, out of band from camera events.

use super::{SimEvent, SimulationLog};
use crate::backends::camera::{BackendError, BackendResult};
use crate::backends::detection::{DetectionEngine, LandmarkPacket, PacketCallback};
use crate::backends::display::SurfaceRef;
use crate::backends::gpu::TextureFrame;
use crate::constants::{LANDMARK_COUNT, graph};
use crate::landmarks::{LandmarkPoint, PoseLandmark, encode_payload};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

type CallbackList = Arc<Mutex<Vec<(String, PacketCallback)>>>;

fn lock_callbacks(callbacks: &CallbackList) -> MutexGuard<'_, Vec<(String, PacketCallback)>> {
    callbacks.lock().unwrap_or_else(|p| p.into_inner())
}

/// Detection engine producing a synthetic, slowly moving pose
pub struct SimulatedDetectionEngine {
    log: SimulationLog,
    callbacks: CallbackList,
    cardinality: Arc<AtomicUsize>,
    frames: Option<mpsc::UnboundedSender<TextureFrame>>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedDetectionEngine {
    pub fn new(log: SimulationLog) -> Self {
        let callbacks: CallbackList = Arc::new(Mutex::new(Vec::new()));
        let cardinality = Arc::new(AtomicUsize::new(LANDMARK_COUNT));
        let (frames, mut receiver) = mpsc::unbounded_channel::<TextureFrame>();

        let worker_log = log.clone();
        let worker_callbacks = Arc::clone(&callbacks);
        let worker_cardinality = Arc::clone(&cardinality);
        let worker = thread::Builder::new()
            .name("pose-engine".to_string())
            .spawn(move || {
                while let Some(texture) = receiver.blocking_recv() {
                    let mut points = synthetic_pose(texture.sequence);
                    points.resize(
                        worker_cardinality.load(Ordering::Relaxed),
                        LandmarkPoint::default(),
                    );
                    let packet = LandmarkPacket::new(texture.timestamp_us, encode_payload(&points));

                    worker_log.record(SimEvent::FrameDetected {
                        sequence: texture.sequence,
                    });
                    for (stream, callback) in lock_callbacks(&worker_callbacks).iter() {
                        if stream == graph::OUTPUT_LANDMARKS_STREAM_NAME {
                            callback(packet.clone());
                        }
                    }
                }
                debug!("Simulated detection engine exiting");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Failed to spawn simulated engine thread");
                None
            }
        };

        Self {
            log,
            callbacks,
            cardinality,
            frames: Some(frames),
            worker,
        }
    }

    /// Emit payloads with `count` landmarks instead of the full set
    pub fn with_cardinality(self, count: usize) -> Self {
        self.cardinality.store(count, Ordering::Relaxed);
        self
    }
}

impl DetectionEngine for SimulatedDetectionEngine {
    fn add_packet_callback(&mut self, stream_name: &str, callback: PacketCallback) -> BackendResult<()> {
        if stream_name != graph::OUTPUT_LANDMARKS_STREAM_NAME
            && stream_name != graph::OUTPUT_VIDEO_STREAM_NAME
        {
            return Err(BackendError::Other(format!(
                "{} has no output stream {}",
                graph::BINARY_GRAPH_NAME,
                stream_name
            )));
        }
        lock_callbacks(&self.callbacks).push((stream_name.to_string(), callback));
        Ok(())
    }

    fn on_new_frame(&mut self, frame: TextureFrame) -> BackendResult<()> {
        trace!(
            stream = graph::INPUT_VIDEO_STREAM_NAME,
            sequence = frame.sequence,
            "Frame queued for detection"
        );
        let sender = self
            .frames
            .as_ref()
            .filter(|_| self.worker.is_some())
            .ok_or_else(|| BackendError::NotAvailable("detection thread not running".into()))?;
        sender
            .send(frame)
            .map_err(|_| BackendError::Other("detection thread exited".into()))
    }

    fn set_video_surface_output(&mut self, surface: Option<SurfaceRef>) {
        self.log.record(SimEvent::OutputSurface(surface));
    }
}

impl Drop for SimulatedDetectionEngine {
    fn drop(&mut self) {
        self.frames = None;
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            warn!("Simulated detection engine thread panicked");
        }
    }
}

/// Standing pose with both arms waving, phase driven by `sequence`
pub fn synthetic_pose(sequence: u64) -> Vec<LandmarkPoint> {
    let mut points = vec![LandmarkPoint::new(0.5, 0.2, 0.99); LANDMARK_COUNT];
    let mut set = |landmark: PoseLandmark, x: f32, y: f32| {
        points[landmark.index()] = LandmarkPoint::new(x, y, 0.95);
    };

    set(PoseLandmark::LeftShoulder, 0.58, 0.30);
    set(PoseLandmark::RightShoulder, 0.42, 0.30);
    set(PoseLandmark::LeftHip, 0.55, 0.55);
    set(PoseLandmark::RightHip, 0.45, 0.55);
    set(PoseLandmark::LeftKnee, 0.56, 0.70);
    set(PoseLandmark::RightKnee, 0.44, 0.70);
    set(PoseLandmark::LeftAnkle, 0.56, 0.86);
    set(PoseLandmark::RightAnkle, 0.44, 0.86);

    // Upper arms swing between hanging down and horizontal
    let phase = (sequence % 60) as f32 / 60.0 * std::f32::consts::TAU;
    let lift = (phase.sin() + 1.0) / 2.0 * std::f32::consts::FRAC_PI_2;
    let (dx, dy) = (lift.sin() * 0.12, lift.cos() * 0.12);

    set(PoseLandmark::LeftElbow, 0.58 + dx, 0.30 + dy);
    set(PoseLandmark::RightElbow, 0.42 - dx, 0.30 + dy);
    set(PoseLandmark::LeftWrist, 0.58 + dx, 0.30 + dy + 0.10);
    set(PoseLandmark::RightWrist, 0.42 - dx, 0.30 + dy + 0.10);

    points
}
