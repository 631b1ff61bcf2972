// SPDX-License-Identifier: GPL-3.0-only

//! Lifecycle event channel
//!
//! Every trigger that can mutate the camera session (user requests, camera
//! driver signals, display surface events) is turned into a
//! [`LifecycleEvent`] and queued onto the GPU thread. The controller only
//! ever sees these events in order, on one thread.

use super::controller::LifecycleState;
use crate::backends::camera::{CameraFacing, CameraFrame, Size, SurfaceSource};
use crate::backends::display::SurfaceRef;
use crate::errors::PipelineResult;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// Request issued by the hosting shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Start(CameraFacing),
    Switch,
    Pause,
    Resume,
    Stop,
    /// Read-only state query
    Snapshot,
}

impl ControlRequest {
    /// Short name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            ControlRequest::Start(_) => "start camera",
            ControlRequest::Switch => "switch camera",
            ControlRequest::Pause => "pause",
            ControlRequest::Resume => "resume",
            ControlRequest::Stop => "stop",
            ControlRequest::Snapshot => "snapshot",
        }
    }
}

/// Reply channel for a control request
pub type ReplySender = oneshot::Sender<PipelineResult<LifecycleSnapshot>>;

/// Events processed by the GPU thread
#[derive(Debug)]
pub enum LifecycleEvent {
    /// User request, optionally answered with the resulting snapshot
    Request {
        request: ControlRequest,
        reply: Option<ReplySender>,
    },
    /// Frame source reports the camera is running
    SourceStarted {
        generation: u64,
        source: SurfaceSource,
    },
    /// Raw frame from the frame source
    FrameAvailable { generation: u64, frame: CameraFrame },
    SurfaceCreated(SurfaceRef),
    /// Display view size changed
    SurfaceChanged(Size),
    SurfaceDestroyed,
    /// Camera permission became available
    PermissionGranted,
    /// Stop the camera and exit the GPU thread
    Shutdown,
}

pub type LifecycleSender = mpsc::UnboundedSender<LifecycleEvent>;
pub type LifecycleReceiver = mpsc::UnboundedReceiver<LifecycleEvent>;

/// Create the lifecycle event channel
pub fn lifecycle_channel() -> (LifecycleSender, LifecycleReceiver) {
    mpsc::unbounded_channel()
}

/// Handle given to a frame source for one camera start
///
/// Tags everything it sends with the session generation it was created for,
/// so signals from a camera that has since been replaced are recognized and
/// discarded by the controller.
#[derive(Debug, Clone)]
pub struct SourceListener {
    generation: u64,
    events: LifecycleSender,
}

impl SourceListener {
    pub fn new(generation: u64, events: LifecycleSender) -> Self {
        Self { generation, events }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Signal that the camera is running and producing into `source`
    ///
    /// Returns false once the GPU thread is gone.
    pub fn started(&self, source: SurfaceSource) -> bool {
        self.events
            .send(LifecycleEvent::SourceStarted {
                generation: self.generation,
                source,
            })
            .is_ok()
    }

    /// Queue one raw frame for conversion
    ///
    /// Returns false once the GPU thread is gone.
    pub fn deliver_frame(&self, frame: CameraFrame) -> bool {
        trace!(generation = self.generation, sequence = frame.sequence, "Delivering frame");
        self.events
            .send(LifecycleEvent::FrameAvailable {
                generation: self.generation,
                frame,
            })
            .is_ok()
    }
}

/// Observable controller state returned by control requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    pub state: LifecycleState,
    pub facing: CameraFacing,
    /// Whether a GPU conversion handle is live
    pub handle_open: bool,
    pub display_visible: bool,
    /// Frames handed to the detection engine since launch
    pub frames_submitted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_tags_generation() {
        let (tx, mut rx) = lifecycle_channel();
        let listener = SourceListener::new(4, tx);
        let source = SurfaceSource {
            id: 1,
            facing: CameraFacing::Front,
        };

        assert!(listener.started(source));
        assert!(listener.deliver_frame(CameraFrame::new(1, 0, 0)));

        match rx.try_recv() {
            Ok(LifecycleEvent::SourceStarted { generation, .. }) => assert_eq!(generation, 4),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.try_recv() {
            Ok(LifecycleEvent::FrameAvailable { generation, frame }) => {
                assert_eq!(generation, 4);
                assert_eq!(frame.source_id, 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_listener_reports_closed_channel() {
        let (tx, rx) = lifecycle_channel();
        let listener = SourceListener::new(1, tx);
        drop(rx);
        assert!(!listener.deliver_frame(CameraFrame::new(1, 0, 0)));
    }
}
