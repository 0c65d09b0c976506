//! Link security layer.
//!
//! - ChaCha20-Poly1305 AEAD for data fragments
//! - Block/fragment nonce packing
//! - Long-term X25519 keys and session key sealing
//! - Session key schedule (transmit) and installation (receive)

mod aead;
mod keys;
mod nonce;
mod sealed;
mod session;

pub use aead::*;
pub use keys::*;
pub use nonce::*;
pub use sealed::*;
pub use session::*;
