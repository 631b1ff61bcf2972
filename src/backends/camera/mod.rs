// SPDX-License-Identifier: GPL-3.0-only

//! Frame-source abstraction
//!
//! The camera driver is an external collaborator. The core only needs to ask
//! it to start and stop a camera for a given facing, learn when the camera
//! actually runs, and query display geometry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ CameraLifecycleController│  ← state machine on the GPU thread
//! └────────────┬─────────────┘
//!              │ start_camera(facing, listener)
//!              ▼
//! ┌──────────────────────────┐
//! │    FrameSource trait     │  ← common interface
//! └────────────┬─────────────┘
//!              │ listener.started(source) / listener.deliver_frame(frame)
//!              ▼            (camera driver thread)
//!        lifecycle event channel
//! ```

pub mod frame_loop;
pub mod types;

pub use types::*;

use crate::pipeline::SourceListener;

/// Camera frame source
///
/// Implementations must not call back into the controller synchronously;
/// all signals go through the [`SourceListener`], which queues them onto
/// the GPU thread.
pub trait FrameSource: Send {
    /// Start the camera with the given facing
    ///
    /// Returns once the request is accepted. The camera signals that it is
    /// running via [`SourceListener::started`], possibly from another thread.
    /// Starting a new camera replaces any previously started one.
    ///
    /// # Arguments
    /// * `facing` - Which camera to open
    /// * `target_resolution` - Preferred resolution, `None` lets the source decide
    /// * `listener` - Channel for the "started" signal and raw frames
    fn start_camera(
        &mut self,
        facing: CameraFacing,
        target_resolution: Option<Size>,
        listener: SourceListener,
    ) -> BackendResult<()>;

    /// Stop the camera started last, if any
    ///
    /// Once this returns the source sends no further signals or frames for
    /// that camera. A no-op when nothing is running.
    fn stop_camera(&mut self) -> BackendResult<()>;

    /// Ideal size of the camera preview for a display view of `view_size`
    fn compute_display_size(&self, view_size: Size) -> Size;

    /// Whether the camera sensor is rotated relative to the display
    fn is_camera_rotated(&self) -> bool;
}

/// Camera permission check (external collaborator)
pub trait CameraPermission: Send + Sync {
    /// Whether the camera permission is currently granted
    fn camera_permission_granted(&self) -> bool;
}
