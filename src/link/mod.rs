//! Transmit and receive pipelines.
//!
//! ```text
//!  payload ──▶ Transmitter ──▶ radiotap | 802.11 | packet ──▶ RawFrameSink
//!                  │
//!                  └── KEY frame every announce interval
//!
//!  capture(if 0..N) ──▶ Receiver::process_frame ──▶ RxEvent
//!                           │
//!                           ├── KEY  ──▶ RxKeyManager
//!                           └── DATA ──▶ codec::decode under key snapshot
//! ```
//!
//! The transmitter is single-owner. The receiver is shared by reference
//! across capture interfaces.

mod rx;
mod stats;
mod tx;

pub use rx::*;
pub use stats::*;
pub use tx::*;
