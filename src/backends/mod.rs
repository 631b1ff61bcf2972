// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for the external collaborators
//!
//! The pipeline core never talks to platform camera, GPU or detection APIs
//! directly. Each collaborator sits behind a trait so backends can be swapped
//! without touching the lifecycle state machine:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Pipeline Core                   │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │ FrameSource │    │ ConversionBackend│   │
//! │  │  (camera)   │    │      (GPU)       │   │
//! │  └─────────────┘    └──────────────────┘   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │  Detection  │    │ Display/Streaming│   │
//! │  │   Engine    │    │     surfaces     │   │
//! │  └─────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Frame source and permission traits, shared types
//! - [`gpu`]: GPU conversion backend trait
//! - [`detection`]: Detection engine trait and landmark packets
//! - [`display`]: Display surface and streaming sink traits
//! - [`simulated`]: In-process implementations of every collaborator

pub mod camera;
pub mod detection;
pub mod display;
pub mod gpu;
pub mod simulated;

