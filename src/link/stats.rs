//! Receive counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free receive counters, updated from every capture interface.
#[derive(Debug, Default)]
pub struct RxStats {
    packets_all: AtomicU64,
    fragments_ok: AtomicU64,
    decrypt_errors: AtomicU64,
    bad_frames: AtomicU64,
    frames_lost: AtomicU64,
    session_keys: AtomicU64,
}

impl RxStats {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_frame(&self) {
        self.packets_all.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fragment(&self) {
        self.fragments_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decrypt_error(&self) {
        self.decrypt_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bad_frame(&self) {
        self.bad_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lost(&self, count: u16) {
        if count > 0 {
            self.frames_lost
                .fetch_add(u64::from(count), Ordering::Relaxed);
        }
    }

    pub(crate) fn record_session_key(&self) {
        self.session_keys.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> RxStatsSnapshot {
        RxStatsSnapshot {
            packets_all: self.packets_all.load(Ordering::Relaxed),
            fragments_ok: self.fragments_ok.load(Ordering::Relaxed),
            decrypt_errors: self.decrypt_errors.load(Ordering::Relaxed),
            bad_frames: self.bad_frames.load(Ordering::Relaxed),
            frames_lost: self.frames_lost.load(Ordering::Relaxed),
            session_keys: self.session_keys.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`RxStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStatsSnapshot {
    /// Frames handed to the receiver for our port.
    pub packets_all: u64,
    /// Data fragments decoded.
    pub fragments_ok: u64,
    /// Fragments that failed authentication or arrived without a key.
    pub decrypt_errors: u64,
    /// Malformed, truncated or bad-FCS frames.
    pub bad_frames: u64,
    /// Gaps in the per-interface 802.11 sequence.
    pub frames_lost: u64,
    /// KEY packets that opened successfully.
    pub session_keys: u64,
}
