// SPDX-License-Identifier: GPL-3.0-only

//! Simulated GPU conversion backend
//!
//! Models a GPU context with exclusive resources: creating a second converter
//! while one is live fails, as it would on the real device.

use super::{SimEvent, SimulationLog};
use crate::backends::camera::{BackendError, BackendResult, CameraFrame, SurfaceSource};
use crate::backends::gpu::{ConversionBackend, ConverterId, ConverterOptions, GpuContext, TextureFrame};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

#[derive(Debug)]
struct LiveConverter {
    context: u64,
    source: Option<(u64, u32, u32)>,
}

#[derive(Debug, Default)]
struct GpuShared {
    fail_next_release: AtomicBool,
    max_live: AtomicUsize,
    live: AtomicUsize,
}

/// In-memory conversion backend
pub struct SimulatedConverterBackend {
    log: SimulationLog,
    next_id: u64,
    converters: HashMap<ConverterId, LiveConverter>,
    shared: Arc<GpuShared>,
}

impl SimulatedConverterBackend {
    pub fn new(log: SimulationLog) -> Self {
        Self {
            log,
            next_id: 1,
            converters: HashMap::new(),
            shared: Arc::new(GpuShared::default()),
        }
    }

    pub fn controls(&self) -> SimulatedGpuControls {
        SimulatedGpuControls {
            shared: Arc::clone(&self.shared),
        }
    }

    fn live(&mut self, converter: ConverterId) -> BackendResult<&mut LiveConverter> {
        self.converters
            .get_mut(&converter)
            .ok_or_else(|| BackendError::Gpu(format!("{} is not live", converter)))
    }
}

impl ConversionBackend for SimulatedConverterBackend {
    fn create_converter(
        &mut self,
        context: &GpuContext,
        options: ConverterOptions,
    ) -> BackendResult<ConverterId> {
        if self.converters.values().any(|c| c.context == context.id()) {
            return Err(BackendError::Gpu(format!(
                "context {} already has a live converter",
                context.label()
            )));
        }

        let id = ConverterId(self.next_id);
        self.next_id += 1;
        self.converters.insert(
            id,
            LiveConverter {
                context: context.id(),
                source: None,
            },
        );

        let live = self.converters.len();
        self.shared.live.store(live, Ordering::SeqCst);
        self.shared.max_live.fetch_max(live, Ordering::SeqCst);

        self.log.record(SimEvent::ConverterCreated {
            converter: id,
            flip_y: options.flip_y,
            buffer_count: options.buffer_count,
        });
        Ok(id)
    }

    fn attach_surface_source(
        &mut self,
        converter: ConverterId,
        source: &SurfaceSource,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        self.live(converter)?.source = Some((source.id, width, height));
        self.log.record(SimEvent::SourceAttached {
            converter,
            source: source.id,
            width,
            height,
        });
        Ok(())
    }

    fn convert(&mut self, converter: ConverterId, frame: &CameraFrame) -> BackendResult<TextureFrame> {
        let (source, width, height) = self
            .live(converter)?
            .source
            .ok_or_else(|| BackendError::Gpu(format!("{} has no source", converter)))?;
        if source != frame.source_id {
            return Err(BackendError::Gpu(format!(
                "frame from source {} on {} bound to source {}",
                frame.source_id, converter, source
            )));
        }

        self.log.record(SimEvent::FrameConverted {
            converter,
            sequence: frame.sequence,
        });
        Ok(TextureFrame {
            converter,
            sequence: frame.sequence,
            timestamp_us: frame.timestamp_us,
            width,
            height,
        })
    }

    fn release(&mut self, converter: ConverterId) -> BackendResult<()> {
        // Resources are gone either way; a failure is only reported
        let removed = self.converters.remove(&converter).is_some();
        self.shared.live.store(self.converters.len(), Ordering::SeqCst);
        if removed {
            self.log.record(SimEvent::ConverterReleased { converter });
        }
        debug!(converter = %converter, removed, "Simulated converter released");

        if self.shared.fail_next_release.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Gpu(format!("driver failed to free {}", converter)));
        }
        if !removed {
            return Err(BackendError::Gpu(format!("{} is not live", converter)));
        }
        Ok(())
    }
}

/// Test-side controls of a [`SimulatedConverterBackend`]
#[derive(Debug, Clone)]
pub struct SimulatedGpuControls {
    shared: Arc<GpuShared>,
}

impl SimulatedGpuControls {
    /// Make the next release report a driver failure
    pub fn fail_next_release(&self) {
        self.shared.fail_next_release.store(true, Ordering::SeqCst);
    }

    /// Converters currently live
    pub fn live_converters(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// Highest number of converters ever live at once
    pub fn max_live_converters(&self) -> usize {
        self.shared.max_live.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::CameraFacing;

    fn options() -> ConverterOptions {
        ConverterOptions {
            flip_y: true,
            buffer_count: 2,
        }
    }

    #[test]
    fn test_context_is_exclusive() {
        let mut backend = SimulatedConverterBackend::new(SimulationLog::default());
        let context = GpuContext::new("test");

        let first = backend.create_converter(&context, options()).unwrap();
        assert!(backend.create_converter(&context, options()).is_err());

        backend.release(first).unwrap();
        assert!(backend.create_converter(&context, options()).is_ok());
        assert_eq!(backend.controls().max_live_converters(), 1);
    }

    #[test]
    fn test_convert_needs_matching_source() {
        let mut backend = SimulatedConverterBackend::new(SimulationLog::default());
        let id = backend
            .create_converter(&GpuContext::new("test"), options())
            .unwrap();
        let frame = CameraFrame::new(5, 0, 0);
        assert!(backend.convert(id, &frame).is_err());

        let source = SurfaceSource {
            id: 5,
            facing: CameraFacing::Back,
        };
        backend.attach_surface_source(id, &source, 720, 1280).unwrap();
        let texture = backend.convert(id, &frame).unwrap();
        assert_eq!((texture.width, texture.height), (720, 1280));
    }

    #[test]
    fn test_failed_release_still_frees() {
        let mut backend = SimulatedConverterBackend::new(SimulationLog::default());
        let controls = backend.controls();
        let context = GpuContext::new("test");
        let id = backend.create_converter(&context, options()).unwrap();

        controls.fail_next_release();
        assert!(backend.release(id).is_err());
        assert_eq!(controls.live_converters(), 0);
        assert!(backend.create_converter(&context, options()).is_ok());
    }
}
