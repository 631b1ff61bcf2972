// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline facade
//!
//! Wires the collaborators together, starts the GPU and ingest threads and
//! offers the host shell a synchronous request API. Requests are marshalled
//! onto the GPU thread; the calling thread never touches GPU state.

use super::Collaborators;
use super::controller::CameraLifecycleController;
use super::events::{
    ControlRequest, LifecycleEvent, LifecycleReceiver, LifecycleSender, LifecycleSnapshot,
};
use crate::backends::camera::{BackendError, CameraFacing, Size};
use crate::backends::detection::lock_engine;
use crate::backends::display::{StreamingSink, SurfaceRef};
use crate::config::Config;
use crate::constants::graph;
use crate::errors::{PipelineError, PipelineResult};
use crate::gpu::GpuThread;
use crate::landmarks::{
    IngestStats, IngestWorker, LandmarkIngestPipeline, ReportReceiver, packet_forwarder, report_channel,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Running pose pipeline
pub struct PipelineFacade {
    events: LifecycleSender,
    gpu_thread: Option<GpuThread>,
    ingest: Option<IngestWorker>,
    reports: Option<ReportReceiver>,
    stats: Arc<IngestStats>,
    /// Kept alive for the lifetime of the pipeline
    _streaming_sink: Option<Box<dyn StreamingSink>>,
}

impl PipelineFacade {
    /// Assemble and start the pipeline
    ///
    /// `channel` is the lifecycle channel; its sender may already be held by
    /// collaborators (the display reports surface events on it). The camera
    /// is not started; call [`PipelineFacade::start`].
    pub fn launch(
        config: &Config,
        mut collaborators: Collaborators,
        channel: (LifecycleSender, LifecycleReceiver),
    ) -> PipelineResult<Self> {
        let config = config.clone().sanitized();
        let (events, receiver) = channel;

        let pipeline = LandmarkIngestPipeline::new().with_report_logging(config.log_reports);
        let stats = pipeline.stats();
        let (report_tx, report_rx) = report_channel();
        let ingest = IngestWorker::spawn(pipeline, report_tx)
            .map_err(|e| BackendError::Other(format!("Failed to spawn ingest thread: {}", e)))?;

        lock_engine(&collaborators.engine).add_packet_callback(
            graph::OUTPUT_LANDMARKS_STREAM_NAME,
            packet_forwarder(ingest.sender()),
        )?;

        let mut streaming_sink = collaborators.streaming_sink.take();
        if let Some(sink) = streaming_sink.as_mut() {
            let surface = collaborators.display.surface_ref();
            info!(
                surface = surface.0,
                orientation = config.stream_orientation_degrees,
                "Attaching display surface to streaming sink"
            );
            sink.attach_surface(surface, config.stream_orientation_degrees);
        }

        let controller = CameraLifecycleController::new(collaborators, &config, events.clone());
        let gpu_thread = GpuThread::spawn("gpu-pipeline", controller, receiver, |controller, event| {
            controller.handle_event(event)
        })
        .map_err(|e| BackendError::Other(format!("Failed to spawn GPU thread: {}", e)))?;

        info!(facing = %config.initial_facing, "Pose pipeline launched");
        Ok(Self {
            events,
            gpu_thread: Some(gpu_thread),
            ingest: Some(ingest),
            reports: Some(report_rx),
            stats,
            _streaming_sink: streaming_sink,
        })
    }

    /// Send a request to the GPU thread and wait for the resulting snapshot
    ///
    /// Blocks the calling thread; must not be called from inside an async
    /// runtime.
    pub fn request(&self, request: ControlRequest) -> PipelineResult<LifecycleSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.events
            .send(LifecycleEvent::Request {
                request,
                reply: Some(reply_tx),
            })
            .map_err(|_| PipelineError::Disconnected)?;
        reply_rx
            .blocking_recv()
            .map_err(|_| PipelineError::Disconnected)?
    }

    /// Queue a request without waiting for its outcome
    pub fn post(&self, request: ControlRequest) -> PipelineResult<()> {
        self.send(LifecycleEvent::Request {
            request,
            reply: None,
        })
    }

    pub fn start(&self, facing: CameraFacing) -> PipelineResult<LifecycleSnapshot> {
        self.request(ControlRequest::Start(facing))
    }

    pub fn switch_camera(&self) -> PipelineResult<LifecycleSnapshot> {
        self.request(ControlRequest::Switch)
    }

    pub fn pause(&self) -> PipelineResult<LifecycleSnapshot> {
        self.request(ControlRequest::Pause)
    }

    pub fn resume(&self) -> PipelineResult<LifecycleSnapshot> {
        self.request(ControlRequest::Resume)
    }

    pub fn stop(&self) -> PipelineResult<LifecycleSnapshot> {
        self.request(ControlRequest::Stop)
    }

    pub fn snapshot(&self) -> PipelineResult<LifecycleSnapshot> {
        self.request(ControlRequest::Snapshot)
    }

    pub fn notify_surface_created(&self, surface: SurfaceRef) -> PipelineResult<()> {
        self.send(LifecycleEvent::SurfaceCreated(surface))
    }

    pub fn notify_surface_changed(&self, view_size: Size) -> PipelineResult<()> {
        self.send(LifecycleEvent::SurfaceChanged(view_size))
    }

    pub fn notify_surface_destroyed(&self) -> PipelineResult<()> {
        self.send(LifecycleEvent::SurfaceDestroyed)
    }

    /// The permission collaborator now reports the camera as granted
    pub fn notify_permission_granted(&self) -> PipelineResult<()> {
        self.send(LifecycleEvent::PermissionGranted)
    }

    /// Sender for collaborators created after launch
    pub fn events(&self) -> LifecycleSender {
        self.events.clone()
    }

    /// Take the joint angle report stream (only once)
    pub fn take_reports(&mut self) -> Option<ReportReceiver> {
        self.reports.take()
    }

    pub fn ingest_stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Stop the camera, release the handle and join both threads
    pub fn shutdown(&mut self) {
        if let Some(mut gpu_thread) = self.gpu_thread.take() {
            if self.events.send(LifecycleEvent::Shutdown).is_err() {
                debug!("GPU thread already gone");
            }
            gpu_thread.join();
        }
        if let Some(mut ingest) = self.ingest.take() {
            ingest.shutdown();
            info!(
                reports = self.stats.reports(),
                dropped = self.stats.dropped(),
                overflowed = self.stats.overflowed(),
                "Pose pipeline shut down"
            );
        }
    }

    fn send(&self, event: LifecycleEvent) -> PipelineResult<()> {
        self.events
            .send(event)
            .map_err(|_| PipelineError::Disconnected)
    }
}

impl Drop for PipelineFacade {
    fn drop(&mut self) {
        self.shutdown();
    }
}
