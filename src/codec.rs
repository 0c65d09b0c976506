//! Data fragment codec.
//!
//! Turns one application payload into one authenticated block-layer packet
//! and back:
//!
//! ```text
//! plaintext = DataPacketHeader { sequence, len } || payload
//! aad       = BlockHeader { DATA, pack_nonce(block, fragment) }     (9 bytes)
//! wire      = aad || ChaCha20-Poly1305(key, construct_nonce(..), aad, plaintext)
//! ```
//!
//! The codec holds no state; the caller supplies the key snapshot and the
//! addressing. Encoding the same `(block, fragment)` twice under one key
//! reuses an AEAD nonce, so callers MUST hand out indices from a
//! [`BlockCounter`](crate::crypto::BlockCounter).

use crate::core::{
    AEAD_TAG_SIZE, BLOCK_HEADER_SIZE, DATA_PACKET_HEADER_SIZE, FrameBudget, LinkError,
};
use crate::crypto::{SessionKey, construct_nonce, decrypt, encrypt};
use crate::frame::{BlockHeader, DataPacketHeader, PacketType, SessionKeyMessage};

/// Smallest well-formed DATA packet (empty payload).
pub const MIN_DATA_PACKET_SIZE: usize = BLOCK_HEADER_SIZE + DATA_PACKET_HEADER_SIZE + AEAD_TAG_SIZE;

/// A decoded, authenticated data fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFragment {
    /// Block this fragment belongs to.
    pub block_index: u64,
    /// Position within the block.
    pub fragment_index: u8,
    /// Application-level sequence number.
    pub sequence: u32,
    /// Application payload.
    pub payload: Vec<u8>,
}

/// Encode one fragment under the default frame budget.
///
/// # Errors
/// `PayloadTooLarge` when `payload` exceeds [`MAX_PAYLOAD_SIZE`](crate::core::MAX_PAYLOAD_SIZE).
pub fn encode(
    key: &SessionKey,
    block_index: u64,
    fragment_index: u8,
    payload: &[u8],
    sequence: u32,
) -> Result<Vec<u8>, LinkError> {
    encode_with_budget(
        key,
        block_index,
        fragment_index,
        payload,
        sequence,
        &FrameBudget::DEFAULT,
    )
}

/// Encode one fragment under an explicit frame budget.
pub fn encode_with_budget(
    key: &SessionKey,
    block_index: u64,
    fragment_index: u8,
    payload: &[u8],
    sequence: u32,
    budget: &FrameBudget,
) -> Result<Vec<u8>, LinkError> {
    if payload.len() > budget.max_payload_size {
        return Err(LinkError::PayloadTooLarge {
            size: payload.len(),
            max: budget.max_payload_size,
        });
    }
    let payload_size = u16::try_from(payload.len()).map_err(|_| LinkError::PayloadTooLarge {
        size: payload.len(),
        max: usize::from(u16::MAX),
    })?;

    let header = BlockHeader::data(block_index, fragment_index);
    let aad = header.to_bytes();

    let mut plaintext = Vec::with_capacity(DATA_PACKET_HEADER_SIZE + payload.len());
    plaintext.extend_from_slice(&DataPacketHeader::new(sequence, payload_size).to_bytes());
    plaintext.extend_from_slice(payload);

    let ciphertext = encrypt(key, &construct_nonce(header.nonce), &aad, &plaintext)
        .map_err(LinkError::Crypto)?;

    let mut wire = Vec::with_capacity(BLOCK_HEADER_SIZE + ciphertext.len());
    wire.extend_from_slice(&aad);
    wire.extend_from_slice(&ciphertext);
    Ok(wire)
}

/// Authenticate and decode one DATA packet.
///
/// # Errors
/// - `MalformedHeader`: shorter than an empty DATA packet
/// - `UnknownPacketType`: first byte is neither DATA nor KEY
/// - `AuthenticationFailure`: wrong key or any modified byte, the type byte
///   included (it is part of the AAD)
/// - `PayloadLengthMismatch`: declared size exceeds the authenticated plaintext
///
/// KEY packets are routed by [`parse_packet`]; handed to `decode` they fail
/// authentication.
pub fn decode(key: &SessionKey, wire: &[u8]) -> Result<DataFragment, LinkError> {
    let header = BlockHeader::from_bytes(wire)?;
    if wire.len() < MIN_DATA_PACKET_SIZE {
        return Err(LinkError::MalformedHeader {
            context: "data packet",
            expected: MIN_DATA_PACKET_SIZE,
            actual: wire.len(),
        });
    }

    let (aad, ciphertext) = wire.split_at(BLOCK_HEADER_SIZE);
    let plaintext = decrypt(key, &construct_nonce(header.nonce), aad, ciphertext)
        .map_err(|_| LinkError::AuthenticationFailure)?;

    let data_header = DataPacketHeader::from_bytes(&plaintext)?;
    let body = &plaintext[DATA_PACKET_HEADER_SIZE..];
    let declared = usize::from(data_header.payload_size);
    if declared > body.len() {
        return Err(LinkError::PayloadLengthMismatch {
            declared,
            available: body.len(),
        });
    }

    Ok(DataFragment {
        block_index: header.block_index(),
        fragment_index: header.fragment_index(),
        sequence: data_header.sequence,
        payload: body[..declared].to_vec(),
    })
}

/// A block-layer packet classified without a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet<'a> {
    /// Encrypted data fragment.
    Data {
        /// Authenticated block header.
        header: BlockHeader,
        /// Ciphertext and tag.
        body: &'a [u8],
    },
    /// Session key announcement.
    SessionKey(SessionKeyMessage),
}

/// Classify a block-layer packet by type and check its fixed sizes.
pub fn parse_packet(wire: &[u8]) -> Result<Packet<'_>, LinkError> {
    let header = BlockHeader::from_bytes(wire)?;
    match header.packet_type {
        PacketType::Key => Ok(Packet::SessionKey(SessionKeyMessage::from_bytes(wire)?)),
        PacketType::Data => {
            if wire.len() < MIN_DATA_PACKET_SIZE {
                return Err(LinkError::MalformedHeader {
                    context: "data packet",
                    expected: MIN_DATA_PACKET_SIZE,
                    actual: wire.len(),
                });
            }
            Ok(Packet::Data {
                header,
                body: &wire[BLOCK_HEADER_SIZE..],
            })
        }
    }
}
