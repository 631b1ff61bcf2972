// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the pose pipeline
//!
//! Each layer has its own error channel so that failures never leak across
//! component boundaries: landmark decoding failures stay inside the ingest
//! pipeline, lifecycle failures stay inside the controller.

use crate::backends::camera::BackendError;
use crate::pipeline::LifecycleState;
use std::fmt;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for landmark decoding
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type alias for GPU conversion stage operations
pub type StageResult<T> = Result<T, StageError>;

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error returned by the pipeline facade and controller requests
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Landmark payload could not be turned into a report
    Decode(DecodeError),
    /// Camera lifecycle errors
    Camera(CameraError),
    /// GPU conversion stage errors
    Stage(StageError),
    /// Configuration errors
    Config(ConfigError),
    /// A collaborator refused setup (callback registration, thread spawn)
    Backend(BackendError),
    /// The GPU thread is gone (pipeline shut down)
    Disconnected,
}

/// Landmark payload decoding errors
///
/// Both variants are recoverable: the frame's result is dropped and the
/// pipeline keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is not a landmark list
    Malformed(String),
    /// Payload decoded, but does not hold exactly the expected number of landmarks
    WrongCardinality { expected: usize, actual: usize },
}

/// Camera lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Frame source could not be acquired (permission denied, device busy, ...)
    Unavailable(String),
    /// Request is not accepted in the current lifecycle state
    InvalidTransition {
        from: LifecycleState,
        request: &'static str,
    },
}

/// GPU conversion stage errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// Stage used before a conversion handle was opened
    NotInitialized,
    /// A conversion handle is already open; it must be closed first
    AlreadyOpen,
    /// The GPU backend reported a failure
    Backend(String),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Reading or writing the configuration file failed
    Io(String),
    /// Configuration file is not valid JSON for the expected schema
    Parse(String),
    /// No configuration directory could be determined
    NoConfigDir,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Decode(e) => write!(f, "Decode error: {}", e),
            PipelineError::Camera(e) => write!(f, "Camera error: {}", e),
            PipelineError::Stage(e) => write!(f, "GPU stage error: {}", e),
            PipelineError::Config(e) => write!(f, "Configuration error: {}", e),
            PipelineError::Backend(e) => write!(f, "Backend error: {}", e),
            PipelineError::Disconnected => write!(f, "Pipeline is shut down"),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(msg) => write!(f, "Malformed landmark payload: {}", msg),
            DecodeError::WrongCardinality { expected, actual } => write!(
                f,
                "Expected {} landmarks, payload holds {}",
                expected, actual
            ),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::Unavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            CameraError::InvalidTransition { from, request } => {
                write!(f, "Cannot {} while {}", request, from)
            }
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::NotInitialized => write!(f, "Conversion stage used before open"),
            StageError::AlreadyOpen => write!(f, "Conversion handle already open"),
            StageError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::NoConfigDir => write!(f, "No configuration directory available"),
        }
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for DecodeError {}
impl std::error::Error for CameraError {}
impl std::error::Error for StageError {}
impl std::error::Error for ConfigError {}

// Conversions from sub-errors to PipelineError
impl From<DecodeError> for PipelineError {
    fn from(err: DecodeError) -> Self {
        PipelineError::Decode(err)
    }
}

impl From<CameraError> for PipelineError {
    fn from(err: CameraError) -> Self {
        PipelineError::Camera(err)
    }
}

impl From<StageError> for PipelineError {
    fn from(err: StageError) -> Self {
        PipelineError::Stage(err)
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err)
    }
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        PipelineError::Backend(err)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
