// SPDX-License-Identifier: GPL-3.0-only

//! In-process implementations of every external collaborator
//!
//! Used by the `simulate` command and by tests. All backends share a
//! [`SimulationLog`] that records the calls the core makes, in order, so
//! sequencing (close before open, hide before release) can be checked.

mod camera;
mod display;
mod engine;
mod gpu;

pub use camera::{SimulatedCamera, SimulatedCameraControls};
pub use display::{SimulatedDisplay, SimulatedPermission, SimulatedStreamingSink};
pub use engine::{SimulatedDetectionEngine, synthetic_pose};
pub use gpu::{SimulatedConverterBackend, SimulatedGpuControls};

use super::camera::{CameraFacing, Size};
use super::display::SurfaceRef;
use super::gpu::{ConverterId, GpuContext};
use crate::constants::{LANDMARK_COUNT, simulation};
use crate::pipeline::{Collaborators, LifecycleSender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One observable call made by the core on a simulated collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    CameraStarted {
        facing: CameraFacing,
        generation: u64,
    },
    CameraStopped {
        facing: CameraFacing,
    },
    ConverterCreated {
        converter: ConverterId,
        flip_y: bool,
        buffer_count: usize,
    },
    SourceAttached {
        converter: ConverterId,
        source: u64,
        width: u32,
        height: u32,
    },
    ConverterReleased {
        converter: ConverterId,
    },
    FrameConverted {
        converter: ConverterId,
        sequence: u64,
    },
    FrameDetected {
        sequence: u64,
    },
    DisplayVisibility(bool),
    OutputSurface(Option<SurfaceRef>),
    StreamingAttached {
        surface: SurfaceRef,
        orientation: u32,
    },
}

/// Shared, ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct SimulationLog {
    events: Arc<Mutex<Vec<SimEvent>>>,
}

impl SimulationLog {
    fn lock(&self) -> MutexGuard<'_, Vec<SimEvent>> {
        self.events.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn record(&self, event: SimEvent) {
        self.lock().push(event);
    }

    /// Copy of all recorded events
    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of recorded events matching `predicate`
    pub fn count(&self, predicate: impl Fn(&SimEvent) -> bool) -> usize {
        self.lock().iter().filter(|e| predicate(e)).count()
    }
}

/// Knobs for a full simulated collaborator set
#[derive(Debug, Clone)]
pub struct RigOptions {
    /// Interval of the camera's own frame pump; `None` means frames are only
    /// produced through [`SimulatedCameraControls::emit_frame`]
    pub frame_interval: Option<Duration>,
    /// Hold back the "started" signal until
    /// [`SimulatedCameraControls::complete_start`] is called
    pub deferred_start: bool,
    /// Landmarks per payload emitted by the detection engine
    pub payload_cardinality: usize,
    pub permission_granted: bool,
}

impl Default for RigOptions {
    fn default() -> Self {
        Self {
            frame_interval: None,
            deferred_start: false,
            payload_cardinality: LANDMARK_COUNT,
            permission_granted: true,
        }
    }
}

impl RigOptions {
    /// Camera pumping frames at `fps`
    pub fn streaming(fps: u32) -> Self {
        Self {
            frame_interval: Some(Duration::from_secs(1) / fps.max(1)),
            ..Self::default()
        }
    }
}

/// Test-side handles into a simulated collaborator set
#[derive(Clone)]
pub struct SimulatedRig {
    pub log: SimulationLog,
    pub camera: SimulatedCameraControls,
    pub gpu: SimulatedGpuControls,
    pub permission: SimulatedPermission,
}

/// Build a complete simulated collaborator set
///
/// `events` is the lifecycle channel the display reports surface events on.
pub fn simulated_rig(events: &LifecycleSender, options: RigOptions) -> (Collaborators, SimulatedRig) {
    let log = SimulationLog::default();

    let camera = SimulatedCamera::new(
        log.clone(),
        Size::new(simulation::SENSOR_WIDTH, simulation::SENSOR_HEIGHT),
        true,
    )
    .with_frame_interval(options.frame_interval)
    .with_deferred_start(options.deferred_start);
    let camera_controls = camera.controls();

    let converter = SimulatedConverterBackend::new(log.clone());
    let gpu_controls = converter.controls();

    let engine =
        SimulatedDetectionEngine::new(log.clone()).with_cardinality(options.payload_cardinality);

    let display = SimulatedDisplay::new(
        log.clone(),
        SurfaceRef(1),
        Size::new(simulation::VIEW_WIDTH, simulation::VIEW_HEIGHT),
        events.clone(),
    );

    let permission = SimulatedPermission::new(options.permission_granted);

    let collaborators = Collaborators::new(
        Box::new(camera),
        Box::new(converter),
        Arc::new(Mutex::new(engine)),
        Box::new(display),
        Arc::new(permission.clone()),
        GpuContext::new("simulated"),
    )
    .with_streaming_sink(Box::new(SimulatedStreamingSink::new(log.clone())));

    let rig = SimulatedRig {
        log,
        camera: camera_controls,
        gpu: gpu_controls,
        permission,
    };
    (collaborators, rig)
}
