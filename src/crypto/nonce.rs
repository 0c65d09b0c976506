//! Block/fragment addressing and AEAD nonce construction.
//!
//! Every fragment is named by a 64-bit value:
//!
//! ```text
//! [ block index (56 bits) | fragment index (8 bits) ]
//! ```
//!
//! The same value is the on-wire block header nonce and the AEAD nonce seed,
//! so a (block, fragment) pair MUST NOT repeat under one session key.
//!
//! The 12-byte IETF ChaCha20-Poly1305 nonce is the packed value in
//! little-endian followed by four zero bytes:
//!
//! ```text
//! [ LE64(packed) (8) | zeros (4) ]
//! ```

use crate::core::{AEAD_NONCE_SIZE, BLOCK_INDEX_MASK, FRAGMENT_INDEX_BITS};

/// Pack a block index and fragment index.
///
/// The block index is masked to 56 bits; larger values truncate silently,
/// matching the fixed wire width.
pub fn pack_nonce(block_index: u64, fragment_index: u8) -> u64 {
    ((block_index & BLOCK_INDEX_MASK) << FRAGMENT_INDEX_BITS) | u64::from(fragment_index)
}

/// Split a packed value back into `(block_index, fragment_index)`.
pub fn unpack_nonce(nonce: u64) -> (u64, u8) {
    (nonce >> FRAGMENT_INDEX_BITS, (nonce & 0xff) as u8)
}

/// Expand a packed value to the AEAD nonce width.
pub fn construct_nonce(nonce: u64) -> [u8; AEAD_NONCE_SIZE] {
    let mut out = [0u8; AEAD_NONCE_SIZE];

    // Packed value (bytes 0-7, little-endian)
    out[..8].copy_from_slice(&nonce.to_le_bytes());

    // Zeros (bytes 8-11) - already zeroed

    out
}

/// Sender-side block index source.
///
/// Hands out consecutive 56-bit block indices and wraps to zero after
/// [`BLOCK_INDEX_MASK`]. At realistic fragment rates the wrap is never
/// reached within one key's lifetime.
#[derive(Debug, Clone, Default)]
pub struct BlockCounter {
    next: u64,
}

impl BlockCounter {
    /// Start at block zero.
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Claim the next block index.
    pub fn next_block(&mut self) -> u64 {
        let block = self.next;
        self.next = (self.next + 1) & BLOCK_INDEX_MASK;
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_example() {
        assert_eq!(pack_nonce(1, 5), 261);
        assert_eq!(unpack_nonce(261), (1, 5));
    }

    #[test]
    fn test_pack_roundtrip_edges() {
        for (block, fragment) in [
            (0, 0),
            (0, 255),
            (BLOCK_INDEX_MASK, 0),
            (BLOCK_INDEX_MASK, 255),
            (0x00AB_CDEF_0123_4567, 0x42),
        ] {
            assert_eq!(unpack_nonce(pack_nonce(block, fragment)), (block, fragment));
        }
    }

    #[test]
    fn test_block_index_truncates() {
        // Bit 56 and above are dropped
        assert_eq!(pack_nonce(1 << 56, 3), 3);
        assert_eq!(unpack_nonce(pack_nonce(u64::MAX, 9)), (BLOCK_INDEX_MASK, 9));
    }

    #[test]
    fn test_distinct_pairs_distinct_nonces() {
        let mut seen = std::collections::HashSet::new();
        for block in 0..64u64 {
            for fragment in 0..=255u8 {
                assert!(seen.insert(pack_nonce(block, fragment)));
            }
        }
    }

    #[test]
    fn test_nonce_construction() {
        let nonce = construct_nonce(0x0102_0304_0506_0708);

        assert_eq!(nonce.len(), AEAD_NONCE_SIZE);
        assert_eq!(&nonce[..8], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&nonce[8..], &[0u8; 4]);
    }

    #[test]
    fn test_block_counter_wraps() {
        let mut counter = BlockCounter::new();
        assert_eq!(counter.next_block(), 0);
        assert_eq!(counter.next_block(), 1);

        let mut counter = BlockCounter {
            next: BLOCK_INDEX_MASK,
        };
        assert_eq!(counter.next_block(), BLOCK_INDEX_MASK);
        assert_eq!(counter.next_block(), 0);
    }
}
