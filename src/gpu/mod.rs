// SPDX-License-Identifier: GPL-3.0-only

//! GPU thread and frame conversion stage
//!
//! All conversion-stage operations must run on one thread. [`GpuThread`]
//! owns a piece of state (the lifecycle controller) on a dedicated thread
//! and feeds it messages from a channel, one at a time.

pub mod conversion;

pub use conversion::FrameConversionStage;

use crate::backends::camera::frame_loop::LoopAction;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Dedicated thread that owns `S` and handles messages for it in order
pub struct GpuThread {
    thread_handle: Option<JoinHandle<()>>,
    name: String,
}

impl GpuThread {
    /// Spawn the thread
    ///
    /// The handler runs once per message until it returns
    /// [`LoopAction::Stop`] or every sender is dropped. `state` is dropped on
    /// the thread, so its GPU resources are released there too.
    pub fn spawn<S, T, F>(
        name: &str,
        mut state: S,
        mut receiver: mpsc::UnboundedReceiver<T>,
        mut handler: F,
    ) -> std::io::Result<Self>
    where
        S: Send + 'static,
        T: Send + 'static,
        F: FnMut(&mut S, T) -> LoopAction + Send + 'static,
    {
        let thread_name = name.to_string();
        let thread_handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            info!(thread = %thread_name, "GPU thread started");
            while let Some(message) = receiver.blocking_recv() {
                if handler(&mut state, message) == LoopAction::Stop {
                    debug!(thread = %thread_name, "Handler requested stop");
                    break;
                }
            }
            drop(state);
            info!(thread = %thread_name, "GPU thread exiting");
        })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            name: name.to_string(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Wait for the thread to exit
    ///
    /// The caller must have made the handler stop (or dropped every sender)
    /// first, otherwise this blocks.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take()
            && let Err(e) = handle.join()
        {
            warn!(thread = %self.name, "GPU thread panicked: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_messages_handled_in_order_until_stop() {
        let (tx, rx) = mpsc::unbounded_channel::<u32>();
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);

        let mut thread = GpuThread::spawn("test-gpu", Vec::new(), rx, move |log: &mut Vec<u32>, n| {
            log.push(n);
            seen_clone.store(log.iter().sum(), Ordering::SeqCst);
            if n == 0 { LoopAction::Stop } else { LoopAction::Continue }
        })
        .unwrap();

        for n in [1, 2, 3, 0, 100] {
            let _ = tx.send(n);
        }
        thread.join();

        assert_eq!(seen.load(Ordering::SeqCst), 6);
        assert!(!thread.is_running());
    }

    #[test]
    fn test_exits_when_senders_dropped() {
        let (tx, rx) = mpsc::unbounded_channel::<()>();
        let mut thread =
            GpuThread::spawn("test-gpu", (), rx, |_: &mut (), _| LoopAction::Continue).unwrap();
        drop(tx);
        thread.join();
        assert!(!thread.is_running());
    }
}
