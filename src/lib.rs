// SPDX-License-Identifier: GPL-3.0-only

//! Pose Camera - real-time body pose pipeline
//!
//! This library turns camera frames into joint angles: frames are converted
//! on the GPU, handed to an external pose detection engine, and the landmark
//! lists it returns are decoded into per-joint angle reports.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`landmarks`]: Landmark data model, joint angle calculation and ingest
//! - [`pipeline`]: Camera lifecycle state machine and the pipeline facade
//! - [`gpu`]: Frame conversion stage and the GPU thread
//! - [`backends`]: Traits for the external collaborators, plus simulated ones
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let (tx, rx) = lifecycle_channel();
//! let (collaborators, _rig) = simulated_rig(&tx, RigOptions::streaming(30));
//! let mut pipeline = PipelineFacade::launch(&Config::default(), collaborators, (tx, rx))?;
//! let mut reports = pipeline.take_reports().unwrap();
//! pipeline.start(CameraFacing::Back)?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gpu;
pub mod landmarks;
pub mod pipeline;

// Re-export commonly used types
pub use backends::camera::{CameraFacing, Size};
pub use config::Config;
pub use errors::{PipelineError, PipelineResult};
pub use landmarks::{Joint, JointAngleReport, LandmarkIngestPipeline, LandmarkSet, TimestampedReport};
pub use pipeline::{CameraLifecycleController, LifecycleState, PipelineFacade};
