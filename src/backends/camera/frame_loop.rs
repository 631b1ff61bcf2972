// SPDX-License-Identifier: GPL-3.0-only
//! Paced frame delivery threads
//!
//! Frame sources run their delivery loop on a dedicated "camera driver"
//! thread, independent of the GPU thread and of the detection engine. This
//! module owns the lifecycle of such a thread: start, pace, stop, join.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by a loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep running
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a paced frame loop running on its own thread
///
/// The tick closure runs once per interval until it returns
/// [`LoopAction::Stop`] or [`FramePump::stop`] is called. Ticks that overrun
/// the interval are not made up for.
///
/// # Example
///
/// ```ignore
/// let pump = FramePump::start("camera-back", Duration::from_millis(33), move || {
///     if listener.deliver_frame(next_frame()) {
///         LoopAction::Continue
///     } else {
///         LoopAction::Stop // controller went away
///     }
/// });
/// ```
pub struct FramePump {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl FramePump {
    /// Start a paced loop on a new named thread
    pub fn start<F>(name: &str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, interval_ms = interval.as_millis() as u64, "Starting frame pump");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut next_tick = Instant::now();
                loop {
                    if stop_signal_clone.load(Ordering::SeqCst) {
                        debug!(name = %name_clone, "Stop signal received");
                        break;
                    }

                    if tick() == LoopAction::Stop {
                        debug!(name = %name_clone, "Loop requested stop");
                        break;
                    }

                    next_tick += interval;
                    let now = Instant::now();
                    if next_tick > now {
                        thread::sleep(next_tick - now);
                    } else {
                        next_tick = now;
                    }
                }

                info!(name = %name_clone, "Frame pump exiting");
            });

        let thread_handle = match thread_handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to spawn frame pump thread");
                None
            }
        };

        Self {
            thread_handle,
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop thread is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting frame pump stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Frame pump thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Frame pump thread finished");
            }
        }
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}
