// SPDX-License-Identifier: GPL-3.0-only

//! Landmark ingest pipeline
//!
//! Detection-engine callbacks push packets into a channel; a dedicated ingest
//! thread decodes each packet, computes the joint angles and forwards the
//! report. Nothing here touches lifecycle state, and a packet that fails to
//! decode is logged and dropped without affecting the next one. The report
//! channel is bounded: when the host falls behind, new reports are dropped
//! rather than queued.

use super::angles::joint_angles;
use super::types::{JointAngleReport, LandmarkSet, TimestampedReport};
use crate::backends::detection::{LandmarkPacket, PacketCallback};
use crate::constants::REPORT_CHANNEL_CAPACITY;
use crate::errors::{DecodeError, DecodeResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Stateless decoder from landmark payloads to joint angle reports
///
/// Holds no per-frame state, so concurrent calls from overlapping engine
/// callbacks need no locking.
#[derive(Debug, Clone, Default)]
pub struct LandmarkIngestPipeline {
    log_reports: bool,
    stats: Arc<IngestStats>,
}

/// Running totals of ingest outcomes
#[derive(Debug, Default)]
pub struct IngestStats {
    reports: AtomicU64,
    malformed: AtomicU64,
    wrong_cardinality: AtomicU64,
    overflowed: AtomicU64,
}

impl IngestStats {
    /// Packets that produced a report
    pub fn reports(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }

    /// Packets dropped because they could not be parsed
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Packets dropped because they held the wrong number of landmarks
    pub fn wrong_cardinality(&self) -> u64 {
        self.wrong_cardinality.load(Ordering::Relaxed)
    }

    /// All dropped packets
    pub fn dropped(&self) -> u64 {
        self.malformed() + self.wrong_cardinality()
    }

    /// Reports discarded because the report channel was full
    pub fn overflowed(&self) -> u64 {
        self.overflowed.load(Ordering::Relaxed)
    }
}

impl LandmarkIngestPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every successful report at info level
    pub fn with_report_logging(mut self, enabled: bool) -> Self {
        self.log_reports = enabled;
        self
    }

    /// Shared outcome counters
    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Decode a payload and compute all joint angles
    ///
    /// A payload that does not hold exactly 33 landmarks never yields a
    /// partial report.
    pub fn ingest(&self, payload: &[u8]) -> DecodeResult<JointAngleReport> {
        let set = LandmarkSet::decode(payload)?;
        trace!(landmarks = %set, "Decoded landmark set");
        Ok(joint_angles(&set))
    }

    /// Ingest one engine packet, logging and discarding failures
    pub fn process_packet(&self, packet: &LandmarkPacket) -> Option<TimestampedReport> {
        trace!(timestamp_us = packet.timestamp_us, "Received pose landmarks packet");

        match self.ingest(&packet.payload) {
            Ok(angles) => {
                self.stats.reports.fetch_add(1, Ordering::Relaxed);
                if self.log_reports {
                    info!(timestamp_us = packet.timestamp_us, "{}", angles);
                }
                Some(TimestampedReport {
                    timestamp_us: packet.timestamp_us,
                    angles,
                })
            }
            Err(e) => {
                match &e {
                    DecodeError::Malformed(_) => {
                        self.stats.malformed.fetch_add(1, Ordering::Relaxed)
                    }
                    DecodeError::WrongCardinality { .. } => {
                        self.stats.wrong_cardinality.fetch_add(1, Ordering::Relaxed)
                    }
                };
                warn!(
                    timestamp_us = packet.timestamp_us,
                    error = %e,
                    "Dropping landmark packet"
                );
                None
            }
        }
    }
}

/// Messages consumed by the ingest thread
#[derive(Debug)]
pub enum IngestMessage {
    Packet(LandmarkPacket),
    Shutdown,
}

/// Sender half feeding the ingest thread
pub type IngestSender = mpsc::UnboundedSender<IngestMessage>;

/// Sender half for finished reports
pub type ReportSender = mpsc::Sender<TimestampedReport>;

/// Receiver half for finished reports
pub type ReportReceiver = mpsc::Receiver<TimestampedReport>;

/// Create the bounded report channel
pub fn report_channel() -> (ReportSender, ReportReceiver) {
    mpsc::channel(REPORT_CHANNEL_CAPACITY)
}

/// Build the packet callback to register on the landmarks output stream
///
/// The callback only enqueues; decoding happens on the ingest thread.
pub fn packet_forwarder(sender: IngestSender) -> PacketCallback {
    Box::new(move |packet: LandmarkPacket| {
        if sender.send(IngestMessage::Packet(packet)).is_err() {
            trace!("Ingest thread gone, dropping landmark packet");
        }
    })
}

fn forward_report(reports: &ReportSender, stats: &IngestStats, report: TimestampedReport) {
    match reports.try_send(report) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(report)) => {
            stats.overflowed.fetch_add(1, Ordering::Relaxed);
            debug!(timestamp_us = report.timestamp_us, "Report channel full, dropping report");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => trace!("Report receiver dropped"),
    }
}

/// Dedicated thread draining landmark packets
pub struct IngestWorker {
    sender: IngestSender,
    thread_handle: Option<JoinHandle<()>>,
}

impl IngestWorker {
    /// Spawn the ingest thread
    ///
    /// Reports go to `reports` without ever blocking the thread. While the
    /// channel is full, or after its receiver is dropped, reports are still
    /// computed (and logged) but discarded.
    pub fn spawn(pipeline: LandmarkIngestPipeline, reports: ReportSender) -> std::io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<IngestMessage>();

        let thread_handle = thread::Builder::new()
            .name("landmark-ingest".to_string())
            .spawn(move || {
                debug!("Landmark ingest thread started");
                while let Some(message) = receiver.blocking_recv() {
                    match message {
                        IngestMessage::Packet(packet) => {
                            if let Some(report) = pipeline.process_packet(&packet) {
                                forward_report(&reports, &pipeline.stats, report);
                            }
                        }
                        IngestMessage::Shutdown => break,
                    }
                }
                info!(
                    reports = pipeline.stats.reports(),
                    dropped = pipeline.stats.dropped(),
                    "Landmark ingest thread exiting"
                );
            })?;

        Ok(Self {
            sender,
            thread_handle: Some(thread_handle),
        })
    }

    /// Sender for packets (clone freely)
    pub fn sender(&self) -> IngestSender {
        self.sender.clone()
    }

    /// Stop the thread after already queued packets and wait for it
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = self.sender.send(IngestMessage::Shutdown);
            if let Err(e) = handle.join() {
                warn!("Landmark ingest thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for IngestWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LANDMARK_COUNT;
    use crate::landmarks::types::{Joint, LandmarkPoint, encode_payload};
    use std::time::Duration;

    fn standing_pose() -> Vec<LandmarkPoint> {
        let mut points = vec![LandmarkPoint::new(0.5, 0.5, 0.9); LANDMARK_COUNT];
        // Straight right leg: hip, knee, ankle on one vertical line
        points[24] = LandmarkPoint::new(0.45, 0.55, 0.9);
        points[26] = LandmarkPoint::new(0.45, 0.70, 0.9);
        points[28] = LandmarkPoint::new(0.45, 0.85, 0.9);
        points
    }

    #[test]
    fn test_ingest_valid_payload() {
        let pipeline = LandmarkIngestPipeline::new();
        let report = pipeline.ingest(&encode_payload(&standing_pose())).unwrap();
        assert!((report.angle(Joint::RightKnee) - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_ingest_thirty_points_is_wrong_cardinality() {
        let pipeline = LandmarkIngestPipeline::new();
        let result = pipeline.ingest(&encode_payload(&standing_pose()[..30]));
        assert_eq!(
            result,
            Err(DecodeError::WrongCardinality {
                expected: LANDMARK_COUNT,
                actual: 30
            })
        );
    }

    #[test]
    fn test_process_packet_counts_failures() {
        let pipeline = LandmarkIngestPipeline::new();
        let stats = pipeline.stats();

        assert!(pipeline.process_packet(&LandmarkPacket::new(1, &b"{"[..])).is_none());
        assert!(
            pipeline
                .process_packet(&LandmarkPacket::new(2, encode_payload(&standing_pose()[..5])))
                .is_none()
        );
        let report = pipeline
            .process_packet(&LandmarkPacket::new(3, encode_payload(&standing_pose())))
            .unwrap();

        assert_eq!(report.timestamp_us, 3);
        assert_eq!(stats.malformed(), 1);
        assert_eq!(stats.wrong_cardinality(), 1);
        assert_eq!(stats.reports(), 1);
    }

    #[tokio::test]
    async fn test_worker_forwards_reports_after_bad_packet() {
        let (report_tx, mut report_rx) = report_channel();
        let mut worker = IngestWorker::spawn(LandmarkIngestPipeline::new(), report_tx).unwrap();

        let forward = packet_forwarder(worker.sender());
        forward(LandmarkPacket::new(10, &b"not a landmark list"[..]));
        forward(LandmarkPacket::new(20, encode_payload(&standing_pose())));

        let report = tokio::time::timeout(Duration::from_secs(2), report_rx.recv())
            .await
            .expect("report in time")
            .expect("channel open");
        assert_eq!(report.timestamp_us, 20);

        worker.shutdown();
    }

    #[test]
    fn test_unread_reports_stay_bounded() {
        let (report_tx, mut report_rx) = report_channel();
        let pipeline = LandmarkIngestPipeline::new();
        let stats = pipeline.stats();
        let mut worker = IngestWorker::spawn(pipeline, report_tx).unwrap();

        let forward = packet_forwarder(worker.sender());
        let total = REPORT_CHANNEL_CAPACITY as i64 * 4;
        for timestamp in 0..total {
            forward(LandmarkPacket::new(timestamp, encode_payload(&standing_pose())));
        }
        worker.shutdown();

        assert_eq!(stats.reports(), total as u64);
        assert_eq!(stats.overflowed(), total as u64 - REPORT_CHANNEL_CAPACITY as u64);

        // The oldest reports are kept, later ones were dropped
        let mut buffered = Vec::new();
        while let Ok(report) = report_rx.try_recv() {
            buffered.push(report.timestamp_us);
        }
        assert_eq!(buffered, (0..REPORT_CHANNEL_CAPACITY as i64).collect::<Vec<_>>());
    }
}
