// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Stream names and the landmark cardinality are part of the contract with the
//! pose detection graph and are intentionally not runtime-configurable.

use std::time::Duration;

/// Number of landmarks in a pose landmark set
pub const LANDMARK_COUNT: usize = 33;

/// Flip frames vertically before handing them to the detection graph.
///
/// GPU textures put the image origin at the bottom-left corner while the
/// detection graph assumes top-left, so this is applied to every conversion.
pub const FLIP_FRAMES_VERTICALLY: bool = true;

/// Number of output buffers allocated by a GPU conversion handle
pub const DEFAULT_CONVERTER_BUFFER_COUNT: usize = 2;

/// Finished reports held for the host before new ones are dropped
pub const REPORT_CHANNEL_CAPACITY: usize = 8;

/// Orientation (degrees) handed to the streaming sink together with the display surface
pub const DEFAULT_STREAM_ORIENTATION: u32 = 90;

/// Detection graph contract
pub mod graph {
    /// Binary graph loaded by the detection engine
    pub const BINARY_GRAPH_NAME: &str = "pose_tracking_gpu.binarypb";

    /// Graph input stream receiving converted camera textures
    pub const INPUT_VIDEO_STREAM_NAME: &str = "input_video";

    /// Graph output stream rendered onto the display surface
    pub const OUTPUT_VIDEO_STREAM_NAME: &str = "output_video";

    /// Graph output stream carrying serialized pose landmarks
    pub const OUTPUT_LANDMARKS_STREAM_NAME: &str = "pose_landmarks";
}

/// Timing used by the simulated collaborators and the CLI
pub mod simulation {
    use super::Duration;

    /// Default frame rate of the simulated camera
    pub const DEFAULT_FPS: u32 = 30;

    /// Native sensor size of the simulated camera (landscape)
    pub const SENSOR_WIDTH: u32 = 1280;
    pub const SENSOR_HEIGHT: u32 = 720;

    /// Default view size of the simulated display (portrait phone)
    pub const VIEW_WIDTH: u32 = 720;
    pub const VIEW_HEIGHT: u32 = 1280;

    /// How long the CLI waits for reports after the last frame
    pub const REPORT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

    /// Poll interval while draining reports
    pub const REPORT_POLL_INTERVAL: Duration = Duration::from_millis(5);
}
