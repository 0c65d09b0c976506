//! In-memory radio medium.
//!
//! Every injected frame is delivered to every monitor attached at the time,
//! which is what a shared channel looks like to several capture cards in
//! monitor mode. Frames injected with no monitor attached are lost, as they
//! would be over the air.

use std::io;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::core::RawFrameSink;

/// Frames buffered per monitor before the slowest one starts losing them.
pub const DEFAULT_MEDIUM_CAPACITY: usize = 1024;

/// A shared broadcast medium.
#[derive(Debug, Clone)]
pub struct LoopbackRadio {
    medium: broadcast::Sender<Arc<[u8]>>,
}

impl Default for LoopbackRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackRadio {
    /// Create a medium with [`DEFAULT_MEDIUM_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEDIUM_CAPACITY)
    }

    /// Create a medium buffering up to `capacity` frames per monitor.
    pub fn with_capacity(capacity: usize) -> Self {
        let (medium, _) = broadcast::channel(capacity.max(1));
        Self { medium }
    }

    /// A frame sink injecting into this medium.
    pub fn injector(&self) -> LoopbackInjector {
        LoopbackInjector {
            medium: self.medium.clone(),
        }
    }

    /// Attach a new monitor; it sees frames injected from now on.
    pub fn monitor(&self) -> LoopbackMonitor {
        LoopbackMonitor {
            frames: self.medium.subscribe(),
        }
    }

    /// Monitors currently attached.
    pub fn monitor_count(&self) -> usize {
        self.medium.receiver_count()
    }
}

/// Injection handle for a [`LoopbackRadio`].
#[derive(Debug, Clone)]
pub struct LoopbackInjector {
    medium: broadcast::Sender<Arc<[u8]>>,
}

impl RawFrameSink for LoopbackInjector {
    fn send_raw_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        // No monitor listening is not an error on a radio
        let _ = self.medium.send(Arc::from(frame));
        Ok(())
    }
}

/// Capture handle for a [`LoopbackRadio`].
#[derive(Debug)]
pub struct LoopbackMonitor {
    frames: broadcast::Receiver<Arc<[u8]>>,
}

impl LoopbackMonitor {
    /// Wait for the next captured frame.
    ///
    /// Returns `None` once the medium and every injector are dropped. A
    /// monitor that falls behind skips the frames it missed.
    pub async fn recv(&mut self) -> Option<Arc<[u8]>> {
        loop {
            match self.frames.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "monitor overrun");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take a frame if one is already waiting.
    pub fn try_recv(&mut self) -> Option<Arc<[u8]>> {
        loop {
            match self.frames.try_recv() {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "monitor overrun");
                }
                Err(_) => return None,
            }
        }
    }
}
