// SPDX-License-Identifier: GPL-3.0-only

//! GPU conversion backend abstraction
//!
//! A conversion backend turns the camera's external texture into a regular
//! texture the detection engine can consume. Every call happens on the GPU
//! thread; the backend itself does not synchronize.

use super::camera::{BackendResult, CameraFrame, SurfaceSource};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Shared GPU context that conversion handles are bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuContext {
    id: u64,
    label: String,
}

impl GpuContext {
    /// Create a new context token with a unique id
    pub fn new(label: &str) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            label: label.to_string(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Identifier of a live conversion handle inside a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConverterId(pub u64);

impl std::fmt::Display for ConverterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "converter#{}", self.0)
    }
}

/// Options fixed at handle creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterOptions {
    /// Flip frames vertically during conversion
    pub flip_y: bool,
    /// Number of output buffers in the handle's pool
    pub buffer_count: usize,
}

/// A converted texture ready for the detection engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureFrame {
    /// Handle that produced the texture
    pub converter: ConverterId,
    /// Sequence number of the source frame
    pub sequence: u64,
    /// Presentation timestamp in microseconds
    pub timestamp_us: i64,
    pub width: u32,
    pub height: u32,
}

/// GPU-side conversion backend
pub trait ConversionBackend: Send {
    /// Allocate a conversion handle bound to `context`
    fn create_converter(
        &mut self,
        context: &GpuContext,
        options: ConverterOptions,
    ) -> BackendResult<ConverterId>;

    /// Bind a source texture to a handle and set its output raster size
    ///
    /// Re-binding replaces the previous source.
    fn attach_surface_source(
        &mut self,
        converter: ConverterId,
        source: &SurfaceSource,
        width: u32,
        height: u32,
    ) -> BackendResult<()>;

    /// Convert one camera frame into an output texture
    fn convert(&mut self, converter: ConverterId, frame: &CameraFrame)
    -> BackendResult<TextureFrame>;

    /// Release all GPU resources held by a handle
    fn release(&mut self, converter: ConverterId) -> BackendResult<()>;
}
