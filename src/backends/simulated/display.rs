// SPDX-License-Identifier: GPL-3.0-only

//! Simulated display, permission and streaming collaborators

use super::{SimEvent, SimulationLog};
use crate::backends::camera::{CameraPermission, Size};
use crate::backends::display::{DisplaySurface, StreamingSink, SurfaceRef};
use crate::pipeline::{LifecycleEvent, LifecycleSender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Preview view whose surface exists only while visible
///
/// Showing the view reports surface created and its size; hiding it reports
/// the surface destroyed. Reports go through the lifecycle channel, as the
/// host shell's surface callbacks would.
pub struct SimulatedDisplay {
    log: SimulationLog,
    surface: SurfaceRef,
    view_size: Size,
    visible: bool,
    events: LifecycleSender,
}

impl SimulatedDisplay {
    pub fn new(log: SimulationLog, surface: SurfaceRef, view_size: Size, events: LifecycleSender) -> Self {
        Self {
            log,
            surface,
            view_size,
            visible: false,
            events,
        }
    }

    fn notify(&self, event: LifecycleEvent) {
        if self.events.send(event).is_err() {
            debug!("Lifecycle channel closed, surface event dropped");
        }
    }
}

impl DisplaySurface for SimulatedDisplay {
    fn surface_ref(&self) -> SurfaceRef {
        self.surface
    }

    fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        self.log.record(SimEvent::DisplayVisibility(visible));

        if visible {
            self.notify(LifecycleEvent::SurfaceCreated(self.surface));
            self.notify(LifecycleEvent::SurfaceChanged(self.view_size));
        } else {
            self.notify(LifecycleEvent::SurfaceDestroyed);
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Permission flag the test or host flips at will
#[derive(Debug, Clone)]
pub struct SimulatedPermission {
    granted: Arc<AtomicBool>,
}

impl SimulatedPermission {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(granted)),
        }
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }
}

impl CameraPermission for SimulatedPermission {
    fn camera_permission_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}

/// Streaming sink that only records what it was handed
pub struct SimulatedStreamingSink {
    log: SimulationLog,
}

impl SimulatedStreamingSink {
    pub fn new(log: SimulationLog) -> Self {
        Self { log }
    }
}

impl StreamingSink for SimulatedStreamingSink {
    fn attach_surface(&mut self, surface: SurfaceRef, orientation_degrees: u32) {
        self.log.record(SimEvent::StreamingAttached {
            surface,
            orientation: orientation_degrees,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lifecycle_channel;

    #[test]
    fn test_visibility_drives_surface_events() {
        let (tx, mut rx) = lifecycle_channel();
        let mut display =
            SimulatedDisplay::new(SimulationLog::default(), SurfaceRef(9), Size::new(720, 1280), tx);

        display.set_visible(true);
        display.set_visible(true);
        display.set_visible(false);

        assert!(matches!(rx.try_recv(), Ok(LifecycleEvent::SurfaceCreated(SurfaceRef(9)))));
        assert!(matches!(rx.try_recv(), Ok(LifecycleEvent::SurfaceChanged(_))));
        assert!(matches!(rx.try_recv(), Ok(LifecycleEvent::SurfaceDestroyed)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_permission_toggle() {
        let permission = SimulatedPermission::new(false);
        assert!(!permission.camera_permission_granted());
        permission.clone().set_granted(true);
        assert!(permission.camera_permission_granted());
    }
}
