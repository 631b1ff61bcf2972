// SPDX-License-Identifier: GPL-3.0-only

//! Simulated camera driver

use super::{SimEvent, SimulationLog};
use crate::backends::camera::frame_loop::{FramePump, LoopAction};
use crate::backends::camera::{
    BackendError, BackendResult, CameraFacing, CameraFrame, FrameSource, Size, SurfaceSource,
};
use crate::pipeline::SourceListener;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Microseconds between synthetic frame timestamps (30 fps)
const FRAME_DURATION_US: i64 = 33_333;

/// Camera most recently started
struct ActiveCamera {
    listener: SourceListener,
    source: SurfaceSource,
    started: bool,
    next_sequence: u64,
}

#[derive(Default)]
struct CameraShared {
    active: Mutex<Option<ActiveCamera>>,
    fail_next_start: AtomicBool,
    next_source_id: AtomicU64,
}

impl CameraShared {
    fn active(&self) -> MutexGuard<'_, Option<ActiveCamera>> {
        self.active.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Deliver one frame from the active camera, if it has started
    fn emit_frame(&self) -> bool {
        let mut guard = self.active();
        let Some(active) = guard.as_mut().filter(|a| a.started) else {
            return false;
        };
        let sequence = active.next_sequence;
        active.next_sequence += 1;
        let frame = CameraFrame::new(active.source.id, sequence, sequence as i64 * FRAME_DURATION_US);
        active.listener.deliver_frame(frame)
    }

    fn complete_start(&self) -> bool {
        let mut guard = self.active();
        let Some(active) = guard.as_mut().filter(|a| !a.started) else {
            return false;
        };
        active.started = true;
        active.listener.started(active.source)
    }
}

/// Frame source backed by a paced frame pump instead of hardware
pub struct SimulatedCamera {
    log: SimulationLog,
    sensor: Size,
    rotated: bool,
    frame_interval: Option<Duration>,
    deferred_start: bool,
    shared: Arc<CameraShared>,
    pump: Option<FramePump>,
}

impl SimulatedCamera {
    /// Camera with the given sensor size
    ///
    /// `rotated` reports the sensor as mounted at 90 degrees to the display,
    /// as on a phone held upright.
    pub fn new(log: SimulationLog, sensor: Size, rotated: bool) -> Self {
        Self {
            log,
            sensor,
            rotated,
            frame_interval: None,
            deferred_start: false,
            shared: Arc::new(CameraShared::default()),
            pump: None,
        }
    }

    /// Produce frames on a driver thread every `interval`
    pub fn with_frame_interval(mut self, interval: Option<Duration>) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Wait for [`SimulatedCameraControls::complete_start`] before signalling
    pub fn with_deferred_start(mut self, deferred: bool) -> Self {
        self.deferred_start = deferred;
        self
    }

    pub fn controls(&self) -> SimulatedCameraControls {
        SimulatedCameraControls {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl FrameSource for SimulatedCamera {
    fn start_camera(
        &mut self,
        facing: CameraFacing,
        target_resolution: Option<Size>,
        listener: SourceListener,
    ) -> BackendResult<()> {
        if self.shared.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(BackendError::StartFailed(format!("{} camera is busy", facing)));
        }

        // The previous camera stops producing before the new one opens
        self.stop_camera()?;

        let generation = listener.generation();
        let source = SurfaceSource {
            id: self.shared.next_source_id.fetch_add(1, Ordering::SeqCst) + 1,
            facing,
        };
        info!(
            facing = %facing,
            generation,
            source = source.id,
            resolution = %target_resolution.unwrap_or(self.sensor),
            "Simulated camera starting"
        );
        self.log.record(SimEvent::CameraStarted { facing, generation });

        *self.shared.active() = Some(ActiveCamera {
            listener,
            source,
            started: false,
            next_sequence: 0,
        });

        if !self.deferred_start {
            self.shared.complete_start();
        }

        if let Some(interval) = self.frame_interval {
            let shared = Arc::clone(&self.shared);
            self.pump = Some(FramePump::start(
                &format!("camera-{}", facing),
                interval,
                move || {
                    if shared.emit_frame() || !shared.active().as_ref().is_some_and(|a| a.started) {
                        LoopAction::Continue
                    } else {
                        debug!("Lifecycle channel closed, stopping simulated camera");
                        LoopAction::Stop
                    }
                },
            ));
        }
        Ok(())
    }

    fn stop_camera(&mut self) -> BackendResult<()> {
        if let Some(mut pump) = self.pump.take() {
            pump.stop();
        }

        let stopped = self.shared.active().take();
        if let Some(active) = stopped {
            info!(
                facing = %active.source.facing,
                generation = active.listener.generation(),
                source = active.source.id,
                "Simulated camera stopped"
            );
            self.log.record(SimEvent::CameraStopped {
                facing: active.source.facing,
            });
        }
        Ok(())
    }

    fn compute_display_size(&self, view_size: Size) -> Size {
        let sensor = if self.rotated {
            self.sensor.transposed()
        } else {
            self.sensor
        };
        sensor.fit_within(view_size)
    }

    fn is_camera_rotated(&self) -> bool {
        self.rotated
    }
}

/// Test-side controls of a [`SimulatedCamera`]
#[derive(Clone)]
pub struct SimulatedCameraControls {
    shared: Arc<CameraShared>,
}

impl SimulatedCameraControls {
    /// Deliver one frame from the calling thread
    ///
    /// Returns false when no camera has started or the controller is gone.
    pub fn emit_frame(&self) -> bool {
        self.shared.emit_frame()
    }

    /// Send the held-back "started" signal of a deferred camera
    pub fn complete_start(&self) -> bool {
        self.shared.complete_start()
    }

    /// Make the next `start_camera` call fail
    pub fn fail_next_start(&self) {
        self.shared.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// Facing of the camera most recently started
    pub fn active_facing(&self) -> Option<CameraFacing> {
        self.shared.active().as_ref().map(|a| a.source.facing)
    }
}
