// SPDX-License-Identifier: GPL-3.0-only

//! Detection engine abstraction
//!
//! The pose detection engine is opaque: converted textures go in, serialized
//! landmark lists come out through packet callbacks on the engine's own
//! thread.

use super::camera::BackendResult;
use super::display::SurfaceRef;
use super::gpu::TextureFrame;
use std::sync::{Arc, Mutex, MutexGuard};

/// Output packet delivered by the engine for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkPacket {
    /// Timestamp of the frame the packet belongs to (microseconds)
    pub timestamp_us: i64,
    /// Serialized landmark list
    pub payload: Arc<[u8]>,
}

impl LandmarkPacket {
    pub fn new(timestamp_us: i64, payload: impl Into<Arc<[u8]>>) -> Self {
        Self {
            timestamp_us,
            payload: payload.into(),
        }
    }
}

/// Callback invoked on the engine's thread for each output packet
pub type PacketCallback = Box<dyn Fn(LandmarkPacket) + Send + Sync>;

/// Engine shared between the controller (output routing) and the GPU stage
/// (frame consumer)
pub type SharedDetectionEngine = Arc<Mutex<dyn DetectionEngine>>;

/// Pose detection engine
pub trait DetectionEngine: Send {
    /// Register a callback for packets on the named output stream
    fn add_packet_callback(&mut self, stream_name: &str, callback: PacketCallback)
    -> BackendResult<()>;

    /// Feed one converted texture into the engine's input stream
    fn on_new_frame(&mut self, frame: TextureFrame) -> BackendResult<()>;

    /// Route the rendered output video to a display surface, or detach it
    fn set_video_surface_output(&mut self, surface: Option<SurfaceRef>);
}

/// Lock a shared engine, recovering the guard if a holder panicked
pub fn lock_engine(engine: &SharedDetectionEngine) -> MutexGuard<'_, dyn DetectionEngine + 'static> {
    engine
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
