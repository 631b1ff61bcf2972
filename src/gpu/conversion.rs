// SPDX-License-Identifier: GPL-3.0-only

//! GPU frame conversion stage
//!
//! Owns at most one conversion handle at a time. The handle binds the
//! camera's source texture to a GPU texture the detection engine consumes.
//! Every method must run on the GPU thread; ordering between closing an old
//! handle and opening a new one is the caller's job.

use crate::backends::camera::{CameraFrame, Size, SurfaceSource};
use crate::backends::detection::{SharedDetectionEngine, lock_engine};
use crate::backends::gpu::{ConversionBackend, ConverterId, ConverterOptions, GpuContext};
use crate::constants::FLIP_FRAMES_VERTICALLY;
use crate::errors::{StageError, StageResult};
use tracing::{debug, info, trace, warn};

/// Live conversion handle
#[derive(Debug)]
struct ConversionHandle {
    id: ConverterId,
    /// Bound source and output raster size
    source: Option<(SurfaceSource, Size)>,
}

/// Converts raw camera frames into detection-engine textures
pub struct FrameConversionStage {
    backend: Box<dyn ConversionBackend>,
    buffer_count: usize,
    handle: Option<ConversionHandle>,
    consumer: Option<SharedDetectionEngine>,
}

impl FrameConversionStage {
    /// Create a stage around a backend; no handle is open yet
    pub fn new(backend: Box<dyn ConversionBackend>, buffer_count: usize) -> Self {
        Self {
            backend,
            buffer_count,
            handle: None,
            consumer: None,
        }
    }

    /// Allocate a conversion handle bound to `context`
    ///
    /// Vertical flip is always enabled. Fails with [`StageError::AlreadyOpen`]
    /// while another handle is live.
    pub fn open(&mut self, context: &GpuContext) -> StageResult<ConverterId> {
        if self.handle.is_some() {
            return Err(StageError::AlreadyOpen);
        }

        let options = ConverterOptions {
            flip_y: FLIP_FRAMES_VERTICALLY,
            buffer_count: self.buffer_count,
        };
        let id = self
            .backend
            .create_converter(context, options)
            .map_err(|e| StageError::Backend(e.to_string()))?;

        info!(converter = %id, context = context.id(), "Opened conversion handle");
        self.handle = Some(ConversionHandle { id, source: None });
        Ok(id)
    }

    /// Release the live handle and detach the consumer
    ///
    /// Safe to call with no handle open. The handle is forgotten even when
    /// the backend reports a release failure.
    pub fn close(&mut self) -> StageResult<()> {
        self.consumer = None;
        let Some(handle) = self.handle.take() else {
            debug!("Close requested with no conversion handle open");
            return Ok(());
        };

        info!(converter = %handle.id, "Closing conversion handle");
        self.backend
            .release(handle.id)
            .map_err(|e| StageError::Backend(e.to_string()))
    }

    /// Bind a frame source to the handle and set the output raster size
    pub fn attach_source(&mut self, source: &SurfaceSource, width: u32, height: u32) -> StageResult<()> {
        let handle = self.handle.as_mut().ok_or(StageError::NotInitialized)?;

        self.backend
            .attach_surface_source(handle.id, source, width, height)
            .map_err(|e| StageError::Backend(e.to_string()))?;

        let size = Size::new(width, height);
        debug!(converter = %handle.id, source = source.id, size = %size, "Attached surface source");
        handle.source = Some((*source, size));
        Ok(())
    }

    /// Set (or clear) the detection engine that receives converted frames
    pub fn set_consumer(&mut self, consumer: Option<SharedDetectionEngine>) -> StageResult<()> {
        if self.handle.is_none() {
            return Err(StageError::NotInitialized);
        }
        self.consumer = consumer;
        Ok(())
    }

    /// Convert one frame and hand it to the consumer
    ///
    /// Returns `Ok(false)` when the frame was dropped because no source is
    /// bound, the frame belongs to another source, or no consumer is set.
    pub fn submit(&mut self, frame: &CameraFrame) -> StageResult<bool> {
        let handle = self.handle.as_ref().ok_or(StageError::NotInitialized)?;

        let bound = matches!(handle.source, Some((source, _)) if source.id == frame.source_id);
        let Some(consumer) = self.consumer.as_ref().filter(|_| bound) else {
            trace!(converter = %handle.id, sequence = frame.sequence, "No route for frame, dropping");
            return Ok(false);
        };

        let texture = self
            .backend
            .convert(handle.id, frame)
            .map_err(|e| StageError::Backend(e.to_string()))?;

        if let Err(e) = lock_engine(consumer).on_new_frame(texture) {
            warn!(sequence = frame.sequence, error = %e, "Detection engine rejected frame");
            return Ok(false);
        }
        trace!(converter = %handle.id, sequence = frame.sequence, "Submitted frame");
        Ok(true)
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Identifier of the live handle
    pub fn handle_id(&self) -> Option<ConverterId> {
        self.handle.as_ref().map(|h| h.id)
    }

    /// Output raster size of the live handle, once a source is bound
    pub fn output_size(&self) -> Option<Size> {
        self.handle
            .as_ref()
            .and_then(|h| h.source.map(|(_, size)| size))
    }

    pub fn has_consumer(&self) -> bool {
        self.consumer.is_some()
    }
}

impl Drop for FrameConversionStage {
    fn drop(&mut self) {
        if self.handle.is_some()
            && let Err(e) = self.close()
        {
            warn!(error = %e, "Failed to release conversion handle on drop");
        }
    }
}
