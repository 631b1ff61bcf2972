// SPDX-License-Identifier: GPL-3.0-only
// Shared types for collaborator backends

//! Shared types for camera and GPU backends

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Which physical camera is the active frame source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraFacing {
    /// User-facing camera
    Front,
    /// World-facing camera
    #[default]
    Back,
}

impl CameraFacing {
    /// The other camera
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::Back => write!(f, "back"),
        }
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Same area with width and height exchanged
    pub fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Largest size with this aspect ratio that fits inside `bounds`
    pub fn fit_within(self, bounds: Size) -> Size {
        if self.width == 0 || self.height == 0 {
            return bounds;
        }
        let scale = (bounds.width as f64 / self.width as f64)
            .min(bounds.height as f64 / self.height as f64);
        Size {
            width: (self.width as f64 * scale).round() as u32,
            height: (self.height as f64 * scale).round() as u32,
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Texture source produced by a started camera
///
/// This is the handle the frame source gives back once the camera runs. The
/// GPU conversion stage binds it to its conversion handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSource {
    /// Backend-assigned identifier of the source texture
    pub id: u64,
    /// Camera feeding this source
    pub facing: CameraFacing,
}

/// A single raw frame delivered by the frame source
///
/// Pixel data stays on the GPU side; the core only needs identity and timing.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Source texture the frame was written to
    pub source_id: u64,
    /// Monotonic frame counter within the source
    pub sequence: u64,
    /// Presentation timestamp in microseconds
    pub timestamp_us: i64,
    /// When the frame reached the core (for latency diagnostics)
    pub received_at: Instant,
}

impl CameraFrame {
    pub fn new(source_id: u64, sequence: u64, timestamp_us: i64) -> Self {
        Self {
            source_id,
            sequence,
            timestamp_us,
            received_at: Instant::now(),
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for collaborator backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera permission has not been granted
    PermissionDenied,
    /// Camera could not be started
    StartFailed(String),
    /// GPU call failed
    Gpu(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::PermissionDenied => write!(f, "Camera permission denied"),
            BackendError::StartFailed(msg) => write!(f, "Camera start failed: {}", msg),
            BackendError::Gpu(msg) => write!(f, "GPU error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_flip() {
        assert_eq!(CameraFacing::Back.flipped(), CameraFacing::Front);
        assert_eq!(CameraFacing::Front.flipped().flipped(), CameraFacing::Front);
    }

    #[test]
    fn test_fit_within_keeps_aspect() {
        let sensor = Size::new(720, 1280);
        let fitted = sensor.fit_within(Size::new(1080, 1080));
        assert_eq!(fitted, Size::new(608, 1080));
    }

    #[test]
    fn test_transposed() {
        assert_eq!(Size::new(640, 480).transposed(), Size::new(480, 640));
    }
}
