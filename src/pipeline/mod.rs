// SPDX-License-Identifier: GPL-3.0-only

//! Camera lifecycle and pipeline assembly
//!
//! ```text
//!  host shell ──requests──┐
//!  camera driver ─signals─┼─► lifecycle channel ─► GPU thread (controller)
//!  display ──surfaces─────┘                              │ frames
//!                                                        ▼
//!                                              detection engine
//!                                                        │ packets
//!                                                        ▼
//!                         reports ◄── ingest thread ◄── packet channel
//! ```

pub mod controller;
pub mod events;
pub mod facade;

pub use controller::{CameraLifecycleController, LifecycleState};
pub use events::{
    ControlRequest, LifecycleEvent, LifecycleReceiver, LifecycleSender, LifecycleSnapshot,
    ReplySender, SourceListener, lifecycle_channel,
};
pub use facade::PipelineFacade;

use crate::backends::camera::{CameraPermission, FrameSource};
use crate::backends::detection::SharedDetectionEngine;
use crate::backends::display::{DisplaySurface, StreamingSink};
use crate::backends::gpu::{ConversionBackend, GpuContext};
use std::sync::Arc;

/// External collaborators the pipeline is assembled from
pub struct Collaborators {
    pub frame_source: Box<dyn FrameSource>,
    pub conversion: Box<dyn ConversionBackend>,
    pub engine: SharedDetectionEngine,
    pub display: Box<dyn DisplaySurface>,
    pub permission: Arc<dyn CameraPermission>,
    /// Optional network sink for the display surface
    pub streaming_sink: Option<Box<dyn StreamingSink>>,
    /// Context conversion handles are bound to
    pub gpu_context: GpuContext,
}

impl Collaborators {
    pub fn new(
        frame_source: Box<dyn FrameSource>,
        conversion: Box<dyn ConversionBackend>,
        engine: SharedDetectionEngine,
        display: Box<dyn DisplaySurface>,
        permission: Arc<dyn CameraPermission>,
        gpu_context: GpuContext,
    ) -> Self {
        Self {
            frame_source,
            conversion,
            engine,
            display,
            permission,
            streaming_sink: None,
            gpu_context,
        }
    }

    pub fn with_streaming_sink(mut self, sink: Box<dyn StreamingSink>) -> Self {
        self.streaming_sink = Some(sink);
        self
    }
}
