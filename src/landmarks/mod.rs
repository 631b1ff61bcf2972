// SPDX-License-Identifier: GPL-3.0-only

//! Pose landmarks and joint angles
//!
//! This module turns serialized landmark lists from the detection engine into
//! joint angle reports:
//!
//! ```text
//! payload bytes ─► LandmarkSet (33 points) ─► angle() ×6 ─► JointAngleReport
//! ```

pub mod angles;
pub mod ingest;
pub mod types;

pub use angles::{angle, joint_angles};
pub use ingest::{
    IngestMessage, IngestSender, IngestStats, IngestWorker, LandmarkIngestPipeline,
    ReportReceiver, ReportSender, packet_forwarder, report_channel,
};
pub use types::{
    Joint, JointAngleReport, LandmarkPoint, LandmarkSet, PoseLandmark, TimestampedReport,
    encode_payload,
};
