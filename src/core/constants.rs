//! Link constants.
//!
//! Wire sizes are fixed by the frame layout and MUST NOT be changed without
//! changing every peer. Payload budgets are derived here from those sizes and
//! are the only place higher layers should read them from.

use std::time::Duration;

// =============================================================================
// RADIO LIMITS
// =============================================================================

/// Hardware frame ceiling for one injected packet, headers included.
pub const MAX_PACKET_SIZE: usize = 1510;

/// Upper bound on simultaneously captured interfaces (diversity reception).
pub const MAX_RX_INTERFACES: usize = 8;

// =============================================================================
// HEADER SIZES
// =============================================================================

/// Radiotap injection template size.
pub const RADIOTAP_HEADER_SIZE: usize = 13;

/// Pseudo-802.11 data header size.
pub const LINK_HEADER_SIZE: usize = 24;

/// Block header size (packet type + LE64 nonce).
pub const BLOCK_HEADER_SIZE: usize = 1 + 8;

/// Data packet header size (LE32 sequence + LE16 payload size).
pub const DATA_PACKET_HEADER_SIZE: usize = 4 + 2;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Poly1305 authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// IETF ChaCha20-Poly1305 nonce size.
pub const AEAD_NONCE_SIZE: usize = 12;

/// Session key size.
pub const SESSION_KEY_SIZE: usize = 32;

/// XChaCha20 nonce size used when sealing a session key.
pub const KEY_EXCHANGE_NONCE_SIZE: usize = 24;

/// X25519 public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 secret key size.
pub const SECRET_KEY_SIZE: usize = 32;

/// Session key message size (type + exchange nonce + sealed key + tag).
pub const SESSION_KEY_MESSAGE_SIZE: usize =
    1 + KEY_EXCHANGE_NONCE_SIZE + SESSION_KEY_SIZE + AEAD_TAG_SIZE;

// =============================================================================
// PACKET TYPES
// =============================================================================

/// Encrypted data fragment.
pub const PACKET_TYPE_DATA: u8 = 0x01;

/// Sealed session key announcement.
pub const PACKET_TYPE_KEY: u8 = 0x02;

// =============================================================================
// ADDRESSING
// =============================================================================

/// Mask applied to block indices (56 bits).
pub const BLOCK_INDEX_MASK: u64 = (1 << 56) - 1;

/// Number of bits the block index is shifted above the fragment index.
pub const FRAGMENT_INDEX_BITS: u32 = 8;

// =============================================================================
// TIMING
// =============================================================================

/// How often the transmitter announces its session key.
pub const SESSION_KEY_ANNOUNCE_INTERVAL: Duration = Duration::from_millis(1000);

/// How often the transmitter generates a fresh session key.
pub const SESSION_KEY_ROTATE_INTERVAL: Duration = SESSION_KEY_ANNOUNCE_INTERVAL;

// =============================================================================
// PAYLOAD BUDGETS
// =============================================================================

/// Payload budgets derived from a frame size ceiling.
///
/// Each budget is the ceiling minus every header and tag layered above that
/// boundary:
///
/// ```text
/// | radiotap | 802.11 | block hdr | [ data hdr | payload ] | tag |
///                     |<---------- forwarder packet ----------->|
///                                 |<--- fec payload ---->|
///                                              |<-pl->|
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBudget {
    /// Frame ceiling this budget was derived from.
    pub max_packet_size: usize,
    /// Largest application payload per fragment.
    pub max_payload_size: usize,
    /// Largest plaintext (data header included) per fragment.
    pub max_fec_payload: usize,
    /// Largest block-layer packet carried after the radio headers.
    pub max_forwarder_packet_size: usize,
}

impl FrameBudget {
    /// Budget for the default hardware ceiling.
    pub const DEFAULT: Self = Self::new(MAX_PACKET_SIZE);

    /// Smallest ceiling that still carries a one-byte payload.
    pub const MIN_PACKET_SIZE: usize = RADIOTAP_HEADER_SIZE
        + LINK_HEADER_SIZE
        + BLOCK_HEADER_SIZE
        + AEAD_TAG_SIZE
        + DATA_PACKET_HEADER_SIZE
        + 1;

    /// Derive budgets for `max_packet_size`.
    ///
    /// Saturates at zero for ceilings below the header stack; use
    /// [`FrameBudget::is_usable`] to reject those.
    pub const fn new(max_packet_size: usize) -> Self {
        let max_forwarder_packet_size =
            max_packet_size.saturating_sub(RADIOTAP_HEADER_SIZE + LINK_HEADER_SIZE);
        let max_fec_payload =
            max_forwarder_packet_size.saturating_sub(BLOCK_HEADER_SIZE + AEAD_TAG_SIZE);
        let max_payload_size = max_fec_payload.saturating_sub(DATA_PACKET_HEADER_SIZE);
        Self {
            max_packet_size,
            max_payload_size,
            max_fec_payload,
            max_forwarder_packet_size,
        }
    }

    /// Whether at least one payload byte fits.
    pub const fn is_usable(&self) -> bool {
        self.max_packet_size >= Self::MIN_PACKET_SIZE && self.max_packet_size <= MAX_PACKET_SIZE
    }
}

impl Default for FrameBudget {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Largest application payload per fragment.
pub const MAX_PAYLOAD_SIZE: usize = FrameBudget::DEFAULT.max_payload_size;

/// Largest FEC unit (data header + payload) per fragment.
pub const MAX_FEC_PAYLOAD: usize = FrameBudget::DEFAULT.max_fec_payload;

/// Largest block-layer packet after the radio headers.
pub const MAX_FORWARDER_PACKET_SIZE: usize = FrameBudget::DEFAULT.max_forwarder_packet_size;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        assert_eq!(MAX_PAYLOAD_SIZE, 1510 - 13 - 24 - 9 - 16 - 6);
        assert_eq!(MAX_PAYLOAD_SIZE, 1442);
        assert_eq!(MAX_FEC_PAYLOAD, 1448);
        assert_eq!(MAX_FORWARDER_PACKET_SIZE, 1473);
    }

    #[test]
    fn test_session_key_message_size() {
        assert_eq!(SESSION_KEY_MESSAGE_SIZE, 73);
    }

    #[test]
    fn test_custom_budget() {
        let budget = FrameBudget::new(1000);
        assert_eq!(budget.max_payload_size, 1000 - 68);
        assert!(budget.is_usable());

        let tiny = FrameBudget::new(10);
        assert_eq!(tiny.max_payload_size, 0);
        assert!(!tiny.is_usable());

        assert!(!FrameBudget::new(MAX_PACKET_SIZE + 1).is_usable());
        assert_eq!(FrameBudget::new(FrameBudget::MIN_PACKET_SIZE).max_payload_size, 1);
    }
}
