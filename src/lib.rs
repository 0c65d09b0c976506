//! # wfb-link
//!
//! Link-layer core for long-range, unidirectional data links over raw
//! 802.11 frame injection (the wifibroadcast model).
//!
//! A transmitter injects broadcast frames in monitor mode; one or more
//! receivers capture them on any number of interfaces. There is no
//! association and no acknowledgment, so the link:
//!
//! - **Authenticates every fragment**: ChaCha20-Poly1305 with the block
//!   header as AAD
//! - **Distributes keys one way**: the transmitter seals fresh session keys
//!   to the receiver's long-term X25519 key and re-announces them every
//!   second
//! - **Budgets frames**: payload sizes are derived from the hardware frame
//!   ceiling so an encoded fragment always fits one injected frame
//! - **Names fragments for FEC**: a (block, fragment) pair doubles as the
//!   AEAD nonce
//!
//! ## Frame Layout
//!
//! ```text
//! | radiotap (13) | 802.11 (24) | type (1) | nonce (8) | ciphertext ... | tag (16) |
//! ```
//!
//! ## Feature Flags
//!
//! - `transport` (default): tokio loopback radio and background tasks
//! - `config` (default): TOML link configuration
//!
//! ## Modules
//!
//! - [`core`]: Constants, frame budgets, error types and the sink trait
//! - [`frame`]: Radiotap, 802.11 and block-layer header layouts
//! - [`crypto`]: AEAD, nonces, long-term keys and the session key schedule
//! - [`codec`]: Data fragment encode/decode
//! - [`link`]: Transmitter and receiver pipelines
//! - [`transport`]: Async adapters (requires `transport` feature)
//! - [`config`]: Configuration file (requires `config` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use wfb_link::prelude::*;
//!
//! let (tx_keys, rx_keys) = LinkKeys::generate_pair();
//! let mut tx = Transmitter::new(tx_keys, 0);
//! let rx = Receiver::new(rx_keys, 0);
//!
//! let mut air: Vec<Vec<u8>> = Vec::new();
//! let block = tx.next_block();
//! tx.send_fragment(block, 0, b"hello", 1, &mut air)?;
//!
//! for frame in &air {
//!     if let Ok(RxEvent::Fragment { fragment, .. }) = rx.process_frame(0, frame) {
//!         assert_eq!(fragment.payload, b"hello");
//!     }
//! }
//! # Ok::<(), WfbError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

pub mod codec;
pub mod crypto;
pub mod frame;
pub mod link;

// Async adapters (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Configuration (feature-gated)
#[cfg(feature = "config")]
#[cfg_attr(docsrs, doc(cfg(feature = "config")))]
pub mod config;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::codec::{DataFragment, Packet, decode, encode, parse_packet};
    pub use crate::crypto::{LinkKeys, SessionKey, StaticKeypair};
    pub use crate::link::{Receiver, RxEvent, RxStatsSnapshot, Transmitter};

    #[cfg(feature = "transport")]
    pub use crate::transport::{LoopbackRadio, pump_interface, spawn_key_announcer};

    #[cfg(feature = "config")]
    pub use crate::config::LinkConfig;
}

// Re-export commonly used items at crate root
pub use crate::core::{ConfigError, CryptoError, LinkError, RawFrameSink, WfbError};
pub use crate::link::{Receiver, RxEvent, Transmitter};
