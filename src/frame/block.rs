//! Block-layer packet headers.
//!
//! Everything after the 802.11 header starts with a block header:
//!
//! ```text
//! DATA: | type=0x01 | nonce (LE64) | ciphertext ... | tag (16) |
//! KEY:  | type=0x02 | exchange nonce (24) | sealed key (32) | tag (16) |
//! ```
//!
//! Inside a DATA ciphertext the plaintext starts with a data packet header:
//!
//! ```text
//! | sequence (LE32) | payload size (LE16) | payload ... |
//! ```

use crate::core::{
    AEAD_TAG_SIZE, BLOCK_HEADER_SIZE, DATA_PACKET_HEADER_SIZE, KEY_EXCHANGE_NONCE_SIZE,
    LinkError, PACKET_TYPE_DATA, PACKET_TYPE_KEY, SESSION_KEY_MESSAGE_SIZE, SESSION_KEY_SIZE,
};
use crate::crypto::{pack_nonce, unpack_nonce};

/// Sealed session key size (key + tag).
pub const SEALED_KEY_SIZE: usize = SESSION_KEY_SIZE + AEAD_TAG_SIZE;

/// Block-layer packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Encrypted data fragment.
    Data = PACKET_TYPE_DATA,
    /// Session key announcement.
    Key = PACKET_TYPE_KEY,
}

impl PacketType {
    /// Parse packet type from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            PACKET_TYPE_DATA => Some(Self::Data),
            PACKET_TYPE_KEY => Some(Self::Key),
            _ => None,
        }
    }

    /// Convert to its byte representation.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Classify a block-layer packet by its first byte.
pub fn peek_packet_type(bytes: &[u8]) -> Result<PacketType, LinkError> {
    let byte = *bytes.first().ok_or(LinkError::MalformedHeader {
        context: "block header",
        expected: 1,
        actual: 0,
    })?;
    PacketType::from_byte(byte).ok_or(LinkError::UnknownPacketType(byte))
}

/// Data packet block header; authenticated as AAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Packet type (always DATA for encoded fragments).
    pub packet_type: PacketType,
    /// Packed block/fragment index.
    pub nonce: u64,
}

impl BlockHeader {
    /// Header for one data fragment.
    pub fn data(block_index: u64, fragment_index: u8) -> Self {
        Self {
            packet_type: PacketType::Data,
            nonce: pack_nonce(block_index, fragment_index),
        }
    }

    /// Block index (upper 56 bits of the nonce).
    pub fn block_index(&self) -> u64 {
        unpack_nonce(self.nonce).0
    }

    /// Fragment index (low 8 bits of the nonce).
    pub fn fragment_index(&self) -> u8 {
        unpack_nonce(self.nonce).1
    }

    /// Serialize to bytes (9 bytes).
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut buf = [0u8; BLOCK_HEADER_SIZE];
        buf[0] = self.packet_type.as_byte();
        buf[1..9].copy_from_slice(&self.nonce.to_le_bytes());
        buf
    }

    /// Parse from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LinkError> {
        if bytes.len() < BLOCK_HEADER_SIZE {
            return Err(LinkError::MalformedHeader {
                context: "block header",
                expected: BLOCK_HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let packet_type =
            PacketType::from_byte(bytes[0]).ok_or(LinkError::UnknownPacketType(bytes[0]))?;

        let mut nonce_bytes = [0u8; 8];
        nonce_bytes.copy_from_slice(&bytes[1..9]);

        Ok(Self {
            packet_type,
            nonce: u64::from_le_bytes(nonce_bytes),
        })
    }
}

/// Plaintext header in front of every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPacketHeader {
    /// Application-level sequence number.
    pub sequence: u32,
    /// Payload bytes that follow.
    pub payload_size: u16,
}

impl DataPacketHeader {
    /// Create a new data packet header.
    pub fn new(sequence: u32, payload_size: u16) -> Self {
        Self {
            sequence,
            payload_size,
        }
    }

    /// Serialize to bytes (6 bytes).
    pub fn to_bytes(&self) -> [u8; DATA_PACKET_HEADER_SIZE] {
        let mut buf = [0u8; DATA_PACKET_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.sequence.to_le_bytes());
        buf[4..6].copy_from_slice(&self.payload_size.to_le_bytes());
        buf
    }

    /// Parse from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LinkError> {
        if bytes.len() < DATA_PACKET_HEADER_SIZE {
            return Err(LinkError::MalformedHeader {
                context: "data packet header",
                expected: DATA_PACKET_HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            sequence: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            payload_size: u16::from_le_bytes([bytes[4], bytes[5]]),
        })
    }
}

/// Sealed session key announcement.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeyMessage {
    /// Random XChaCha20 nonce used to seal the key.
    pub nonce: [u8; KEY_EXCHANGE_NONCE_SIZE],
    /// Encrypted session key followed by its tag.
    pub sealed_key: [u8; SEALED_KEY_SIZE],
}

impl SessionKeyMessage {
    /// Serialize to bytes (73 bytes).
    pub fn to_bytes(&self) -> [u8; SESSION_KEY_MESSAGE_SIZE] {
        let mut buf = [0u8; SESSION_KEY_MESSAGE_SIZE];
        buf[0] = PACKET_TYPE_KEY;
        buf[1..1 + KEY_EXCHANGE_NONCE_SIZE].copy_from_slice(&self.nonce);
        buf[1 + KEY_EXCHANGE_NONCE_SIZE..].copy_from_slice(&self.sealed_key);
        buf
    }

    /// Parse from bytes; the packet must be exactly one message long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LinkError> {
        if bytes.len() != SESSION_KEY_MESSAGE_SIZE {
            return Err(LinkError::MalformedHeader {
                context: "session key message",
                expected: SESSION_KEY_MESSAGE_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[0] != PACKET_TYPE_KEY {
            return Err(match PacketType::from_byte(bytes[0]) {
                Some(_) => LinkError::UnexpectedPacketType(bytes[0]),
                None => LinkError::UnknownPacketType(bytes[0]),
            });
        }

        let mut nonce = [0u8; KEY_EXCHANGE_NONCE_SIZE];
        let mut sealed_key = [0u8; SEALED_KEY_SIZE];
        nonce.copy_from_slice(&bytes[1..1 + KEY_EXCHANGE_NONCE_SIZE]);
        sealed_key.copy_from_slice(&bytes[1 + KEY_EXCHANGE_NONCE_SIZE..]);

        Ok(Self { nonce, sealed_key })
    }
}

impl std::fmt::Debug for SessionKeyMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyMessage")
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}
