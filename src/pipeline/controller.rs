// SPDX-License-Identifier: GPL-3.0-only

//! Camera lifecycle state machine
//!
//! The controller is the only owner of the camera session: current facing,
//! the GPU conversion handle and the active flag. It runs on the GPU thread
//! and is driven exclusively by [`LifecycleEvent`]s, so handle operations
//! are serialized without locks.
//!
//! ```text
//!          start            started            switch
//!   Idle ────────► Starting ───────► Running ──────────► Switching
//!    ▲                ▲ │              │                    │
//!    │ stop           │ │ pause        │ pause              │ new handle,
//!    │                │ ▼              ▼                    │ start camera
//!    └──────────── Paused ◄────────────┘                    ▼
//!                    resume ─────────────────────────► Starting
//! ```

use super::Collaborators;
use super::events::{ControlRequest, LifecycleEvent, LifecycleSender, LifecycleSnapshot, SourceListener};
use crate::backends::camera::frame_loop::LoopAction;
use crate::backends::camera::{
    CameraFacing, CameraFrame, CameraPermission, FrameSource, Size, SurfaceSource,
};
use crate::backends::detection::{SharedDetectionEngine, lock_engine};
use crate::backends::display::{DisplaySurface, SurfaceRef};
use crate::backends::gpu::GpuContext;
use crate::config::Config;
use crate::errors::{CameraError, PipelineResult, StageError};
use crate::gpu::FrameConversionStage;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Camera session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No camera acquired
    Idle,
    /// Camera acquisition requested, waiting for the "started" signal
    Starting,
    /// Frames flowing, display visible
    Running,
    /// Facing change in progress
    Switching,
    /// Resources released, display hidden
    Paused,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Idle => "Idle",
            LifecycleState::Starting => "Starting",
            LifecycleState::Running => "Running",
            LifecycleState::Switching => "Switching",
            LifecycleState::Paused => "Paused",
        };
        write!(f, "{}", name)
    }
}

/// Coordinates camera acquisition, GPU stage reconfiguration and frame
/// submission across start, stop, switch, pause and resume
pub struct CameraLifecycleController {
    state: LifecycleState,
    facing: CameraFacing,
    /// Bumped on every camera start and teardown; signals tagged with an
    /// older value belong to a replaced camera
    generation: u64,
    stage: FrameConversionStage,
    frame_source: Box<dyn FrameSource>,
    engine: SharedDetectionEngine,
    display: Box<dyn DisplaySurface>,
    permission: Arc<dyn CameraPermission>,
    context: GpuContext,
    events: LifecycleSender,
    active_source: Option<SurfaceSource>,
    view_size: Option<Size>,
    target_resolution: Option<Size>,
    frames_submitted: u64,
    /// Resumed without permission; start once it is granted
    awaiting_permission: bool,
}

impl CameraLifecycleController {
    /// Create an idle controller
    ///
    /// `events` must be the sender of the channel this controller is fed
    /// from; frame sources get clones of it.
    pub fn new(collaborators: Collaborators, config: &Config, events: LifecycleSender) -> Self {
        let Collaborators {
            frame_source,
            conversion,
            engine,
            display,
            permission,
            gpu_context,
            ..
        } = collaborators;

        Self {
            state: LifecycleState::Idle,
            facing: config.initial_facing,
            generation: 0,
            stage: FrameConversionStage::new(conversion, config.converter_buffer_count),
            frame_source,
            engine,
            display,
            permission,
            context: gpu_context,
            events,
            active_source: None,
            view_size: None,
            target_resolution: config.target_resolution,
            frames_submitted: 0,
            awaiting_permission: false,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_handle_open(&self) -> bool {
        self.stage.is_open()
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            state: self.state,
            facing: self.facing,
            handle_open: self.stage.is_open(),
            display_visible: self.display.is_visible(),
            frames_submitted: self.frames_submitted,
        }
    }

    /// Process one lifecycle event
    pub fn handle_event(&mut self, event: LifecycleEvent) -> LoopAction {
        match event {
            LifecycleEvent::Request { request, reply } => {
                let result = self.handle_request(request).map(|()| self.snapshot());
                if let Err(e) = &result {
                    warn!(request = request.name(), state = %self.state, error = %e, "Request failed");
                }
                if let Some(reply) = reply
                    && reply.send(result).is_err()
                {
                    debug!(request = request.name(), "Requester went away before the reply");
                }
            }
            LifecycleEvent::SourceStarted { generation, source } => {
                self.on_source_started(generation, source)
            }
            LifecycleEvent::FrameAvailable { generation, frame } => self.on_frame(generation, frame),
            LifecycleEvent::SurfaceCreated(surface) => self.on_surface_created(surface),
            LifecycleEvent::SurfaceChanged(size) => self.on_surface_changed(size),
            LifecycleEvent::SurfaceDestroyed => self.on_surface_destroyed(),
            LifecycleEvent::PermissionGranted => self.on_permission_granted(),
            LifecycleEvent::Shutdown => {
                info!("Lifecycle controller shutting down");
                self.request_stop();
                return LoopAction::Stop;
            }
        }
        LoopAction::Continue
    }

    fn handle_request(&mut self, request: ControlRequest) -> PipelineResult<()> {
        match request {
            ControlRequest::Start(facing) => self.request_start(facing),
            ControlRequest::Switch => self.request_switch(),
            ControlRequest::Pause => self.request_pause(),
            ControlRequest::Resume => self.request_resume(),
            ControlRequest::Stop => {
                self.request_stop();
                Ok(())
            }
            ControlRequest::Snapshot => Ok(()),
        }
    }

    /// Acquire a frame source for `facing`
    ///
    /// Valid from `Idle` or `Paused`. The controller moves to `Starting`; the
    /// source's "started" signal later moves it to `Running`. On failure the
    /// state is left as it was and the error is returned, with no retry.
    pub fn request_start(&mut self, facing: CameraFacing) -> PipelineResult<()> {
        if !matches!(self.state, LifecycleState::Idle | LifecycleState::Paused) {
            return Err(self.invalid("start camera"));
        }

        if !self.permission.camera_permission_granted() {
            info!(facing = %facing, "Camera permission not granted, not starting");
            return Err(CameraError::Unavailable("camera permission not granted".into()).into());
        }

        let opened_here = !self.stage.is_open();
        self.ensure_handle()?;

        let previous_facing = self.facing;
        self.facing = facing;
        if let Err(e) = self.begin_capture() {
            self.facing = previous_facing;
            if opened_here {
                self.release_handle();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Switch between front and back camera
    ///
    /// Valid only from `Running`. The old handle is fully released before the
    /// new one is allocated; the display is hidden before the old camera is
    /// replaced. Any failure after the release leaves the controller `Paused`
    /// with no handle.
    pub fn request_switch(&mut self) -> PipelineResult<()> {
        if self.state != LifecycleState::Running {
            return Err(self.invalid("switch camera"));
        }

        self.transition(LifecycleState::Switching);
        self.retire_source();

        self.release_handle();
        self.display.set_visible(false);
        self.facing = self.facing.flipped();

        if let Err(e) = self.ensure_handle().and_then(|()| self.begin_capture()) {
            error!(facing = %self.facing, error = %e, "Camera switch failed");
            self.release_handle();
            self.transition(LifecycleState::Paused);
            return Err(e);
        }
        Ok(())
    }

    /// Stop the camera, release GPU resources and hide the display
    ///
    /// Calling it again while `Paused` is a no-op.
    pub fn request_pause(&mut self) -> PipelineResult<()> {
        match self.state {
            LifecycleState::Running | LifecycleState::Starting | LifecycleState::Switching => {
                self.retire_source();
                self.release_handle();
                self.display.set_visible(false);
                self.transition(LifecycleState::Paused);
            }
            LifecycleState::Paused => {
                self.awaiting_permission = false;
                if self.stage.is_open() {
                    // Resumed but still waiting for permission
                    self.release_handle();
                } else {
                    debug!("Already paused");
                }
            }
            LifecycleState::Idle => return Err(self.invalid("pause")),
        }
        Ok(())
    }

    /// Allocate a fresh handle and restart the camera if permitted
    ///
    /// Valid from `Paused`. Without permission the controller stays `Paused`
    /// with the handle attached until [`LifecycleEvent::PermissionGranted`].
    pub fn request_resume(&mut self) -> PipelineResult<()> {
        if self.state != LifecycleState::Paused {
            return Err(self.invalid("resume"));
        }

        self.ensure_handle()?;

        if !self.permission.camera_permission_granted() {
            info!("Camera permission not granted, waiting before restart");
            self.awaiting_permission = true;
            return Ok(());
        }
        self.begin_capture()
    }

    /// Release everything and return to `Idle`; valid from any state
    pub fn request_stop(&mut self) {
        self.retire_source();
        self.awaiting_permission = false;
        self.release_handle();
        self.display.set_visible(false);
        if self.state != LifecycleState::Idle {
            self.transition(LifecycleState::Idle);
        }
    }

    fn on_source_started(&mut self, generation: u64, source: SurfaceSource) {
        if generation != self.generation || self.state != LifecycleState::Starting {
            debug!(
                generation,
                current = self.generation,
                state = %self.state,
                "Discarding stale camera start signal"
            );
            return;
        }

        info!(facing = %source.facing, source = source.id, "Camera started");
        self.active_source = Some(source);
        self.transition(LifecycleState::Running);
        self.display.set_visible(true);
        self.configure_output();
    }

    fn on_frame(&mut self, generation: u64, frame: CameraFrame) {
        if generation != self.generation || self.state != LifecycleState::Running {
            debug!(
                generation,
                sequence = frame.sequence,
                state = %self.state,
                "Discarding frame outside running session"
            );
            return;
        }

        match self.stage.submit(&frame) {
            Ok(true) => {
                self.frames_submitted += 1;
                trace!(
                    sequence = frame.sequence,
                    latency_us = frame.received_at.elapsed().as_micros() as u64,
                    "Frame submitted"
                );
            }
            Ok(false) => debug!(sequence = frame.sequence, "Frame dropped, output not configured"),
            Err(StageError::NotInitialized) => self.sequencing_error("submit frame"),
            Err(e) => warn!(sequence = frame.sequence, error = %e, "Frame conversion failed"),
        }
    }

    fn on_surface_created(&mut self, surface: SurfaceRef) {
        debug!(surface = surface.0, "Display surface created");
        lock_engine(&self.engine).set_video_surface_output(Some(surface));
    }

    fn on_surface_changed(&mut self, view_size: Size) {
        debug!(view = %view_size, "Display surface changed");
        self.view_size = Some(view_size);
        self.configure_output();
    }

    fn on_surface_destroyed(&mut self) {
        debug!("Display surface destroyed");
        self.view_size = None;
        lock_engine(&self.engine).set_video_surface_output(None);
    }

    fn on_permission_granted(&mut self) {
        if !self.awaiting_permission || self.state != LifecycleState::Paused {
            debug!(state = %self.state, "Permission granted, nothing pending");
            return;
        }

        info!("Camera permission granted, starting camera");
        if let Err(e) = self.ensure_handle().and_then(|()| self.begin_capture()) {
            warn!(error = %e, "Camera start after permission grant failed");
        }
    }

    /// Bind the active source to the handle at the display-derived size
    ///
    /// No-op until a handle, a started source and a view size all exist.
    fn configure_output(&mut self) {
        let (Some(view_size), Some(source)) = (self.view_size, self.active_source) else {
            return;
        };
        if !self.stage.is_open() {
            debug!("No conversion handle, ignoring surface size");
            return;
        }

        let display_size = self.frame_source.compute_display_size(view_size);
        let output = if self.frame_source.is_camera_rotated() {
            display_size.transposed()
        } else {
            display_size
        };

        match self.stage.attach_source(&source, output.width, output.height) {
            Ok(()) => info!(view = %view_size, output = %output, "Configured conversion output"),
            Err(StageError::NotInitialized) => self.sequencing_error("attach source"),
            Err(e) => warn!(error = %e, "Failed to configure conversion output"),
        }
    }

    /// Open a handle if none is live and attach the engine as consumer
    fn ensure_handle(&mut self) -> PipelineResult<()> {
        if !self.stage.is_open() {
            self.stage.open(&self.context)?;
        }
        self.stage.set_consumer(Some(Arc::clone(&self.engine)))?;
        Ok(())
    }

    /// Ask the frame source for the current facing and move to `Starting`
    fn begin_capture(&mut self) -> PipelineResult<()> {
        self.generation += 1;
        self.active_source = None;
        let listener = SourceListener::new(self.generation, self.events.clone());

        self.frame_source
            .start_camera(self.facing, self.target_resolution, listener)
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;

        self.awaiting_permission = false;
        self.transition(LifecycleState::Starting);
        Ok(())
    }

    /// Stop the current camera and invalidate anything it already queued
    fn retire_source(&mut self) {
        self.generation += 1;
        self.active_source = None;
        if let Err(e) = self.frame_source.stop_camera() {
            warn!(facing = %self.facing, error = %e, "Failed to stop camera");
        }
    }

    /// Close the handle; release failures never block the transition
    fn release_handle(&mut self) {
        if let Err(e) = self.stage.close() {
            warn!(error = %e, "Failed to release conversion handle");
        }
    }

    fn transition(&mut self, to: LifecycleState) {
        info!(from = %self.state, to = %to, facing = %self.facing, "Camera lifecycle transition");
        self.state = to;
    }

    fn invalid(&self, request: &'static str) -> crate::errors::PipelineError {
        CameraError::InvalidTransition {
            from: self.state,
            request,
        }
        .into()
    }

    fn sequencing_error(&self, operation: &str) {
        error!(operation, state = %self.state, "Conversion stage used before open");
        debug_assert!(false, "conversion stage used before open: {}", operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::{RigOptions, SimEvent, SimulatedRig, simulated_rig};
    use crate::pipeline::{LifecycleReceiver, lifecycle_channel};

    fn setup(options: RigOptions) -> (CameraLifecycleController, LifecycleReceiver, SimulatedRig) {
        let (tx, rx) = lifecycle_channel();
        let (collaborators, rig) = simulated_rig(&tx, options);
        let controller = CameraLifecycleController::new(collaborators, &Config::default(), tx);
        (controller, rx, rig)
    }

    fn drain(controller: &mut CameraLifecycleController, rx: &mut LifecycleReceiver) {
        while let Ok(event) = rx.try_recv() {
            controller.handle_event(event);
        }
    }

    #[test]
    fn test_initial_state() {
        let (controller, _rx, _rig) = setup(RigOptions::default());
        assert_eq!(controller.state(), LifecycleState::Idle);
        assert_eq!(controller.facing(), CameraFacing::Back);
        assert!(!controller.is_handle_open());
    }

    #[test]
    fn test_start_runs_after_signal() {
        let (mut controller, mut rx, rig) = setup(RigOptions::default());

        controller.request_start(CameraFacing::Back).unwrap();
        assert_eq!(controller.state(), LifecycleState::Starting);

        drain(&mut controller, &mut rx);
        assert_eq!(controller.state(), LifecycleState::Running);
        assert!(controller.snapshot().display_visible);

        // Surface events from the display configured the output
        assert_eq!(
            rig.log.count(|e| matches!(e, SimEvent::SourceAttached { width: 1280, height: 720, .. })),
            1
        );
        assert!(rig.log.events().contains(&SimEvent::OutputSurface(Some(SurfaceRef(1)))));
    }

    #[test]
    fn test_switch_from_idle_is_rejected() {
        let (mut controller, _rx, _rig) = setup(RigOptions::default());
        let err = controller.request_switch().unwrap_err();
        assert_eq!(err.to_string(), "Camera error: Cannot switch camera while Idle");
        assert_eq!(controller.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_stale_start_signal_is_discarded() {
        let (mut controller, mut rx, rig) = setup(RigOptions {
            deferred_start: true,
            ..RigOptions::default()
        });

        controller.request_start(CameraFacing::Back).unwrap();

        // Signal queued by the camera but handled only after the pause
        assert!(rig.camera.complete_start());
        controller.request_pause().unwrap();
        drain(&mut controller, &mut rx);
        assert_eq!(controller.state(), LifecycleState::Paused);
        assert!(!controller.snapshot().display_visible);
    }

    #[test]
    fn test_frames_only_submitted_while_running() {
        let (mut controller, mut rx, rig) = setup(RigOptions::default());
        controller.request_start(CameraFacing::Back).unwrap();
        drain(&mut controller, &mut rx);

        assert!(rig.camera.emit_frame());
        assert!(rig.camera.emit_frame());
        drain(&mut controller, &mut rx);
        assert_eq!(controller.snapshot().frames_submitted, 2);

        assert!(rig.camera.emit_frame());
        controller.request_pause().unwrap();
        drain(&mut controller, &mut rx);
        assert_eq!(controller.snapshot().frames_submitted, 2);
        assert!(!rig.camera.emit_frame(), "camera stopped on pause");
    }

    #[test]
    fn test_stop_from_any_state() {
        let (mut controller, mut rx, rig) = setup(RigOptions::default());
        controller.request_start(CameraFacing::Front).unwrap();
        drain(&mut controller, &mut rx);

        controller.request_stop();
        assert_eq!(controller.state(), LifecycleState::Idle);
        assert!(!controller.is_handle_open());
        assert_eq!(rig.gpu.live_converters(), 0);

        controller.request_stop();
        assert_eq!(controller.state(), LifecycleState::Idle);
    }
}
