//! Pseudo-802.11 data header.
//!
//! Frames are plain 802.11 data frames to the broadcast address. Real MAC
//! addressing is meaningless on an unassociated injection link, so the last
//! byte of the transmitter address carries the source port and the last byte
//! of the BSSID carries the destination port:
//!
//! ```text
//! 08 01 00 00              frame control, duration
//! ff ff ff ff ff ff        addr1: broadcast
//! 13 22 33 44 55 [src]     addr2
//! 13 22 33 44 55 [dst]     addr3
//! [seq lo] [seq hi]        sequence control (LE16)
//! ```
//!
//! A port selects one of 256 logical streams sharing the channel.

use crate::core::{LINK_HEADER_SIZE, LinkError};

/// Base header copied for every outbound frame.
pub const LINK_HEADER_TEMPLATE: [u8; LINK_HEADER_SIZE] = [
    0x08, 0x01, 0x00, 0x00, //
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, //
    0x13, 0x22, 0x33, 0x44, 0x55, 0x66, //
    0x13, 0x22, 0x33, 0x44, 0x55, 0x66, //
    0x00, 0x00,
];

const SRC_PORT_OFFSET: usize = 15;
const DEST_PORT_OFFSET: usize = 21;
const SEQ_OFFSET: usize = 22;

/// Bytes of addr2/addr3 that must match the template on receive.
const ADDR_PREFIX: [u8; 5] = [0x13, 0x22, 0x33, 0x44, 0x55];

/// Routing metadata carried by the link header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkAddress {
    /// Destination port (last byte of addr3).
    pub dest_port: u8,
    /// Source port (last byte of addr2).
    pub src_port: u8,
    /// Raw sequence-control field.
    pub seq: u16,
}

impl LinkAddress {
    /// Split into `(dest_port, src_port, seq)`.
    pub fn into_parts(self) -> (u8, u8, u16) {
        (self.dest_port, self.src_port, self.seq)
    }
}

/// Build a link header for one outbound frame.
pub fn build_link_header(dest_port: u8, src_port: u8, seq: u16) -> [u8; LINK_HEADER_SIZE] {
    let mut header = LINK_HEADER_TEMPLATE;
    header[SRC_PORT_OFFSET] = src_port;
    header[DEST_PORT_OFFSET] = dest_port;
    header[SEQ_OFFSET..SEQ_OFFSET + 2].copy_from_slice(&seq.to_le_bytes());
    header
}

/// Parse the link header at the start of `bytes`.
pub fn parse_link_header(bytes: &[u8]) -> Result<LinkAddress, LinkError> {
    if bytes.len() < LINK_HEADER_SIZE {
        return Err(LinkError::MalformedHeader {
            context: "link header",
            expected: LINK_HEADER_SIZE,
            actual: bytes.len(),
        });
    }

    Ok(LinkAddress {
        dest_port: bytes[DEST_PORT_OFFSET],
        src_port: bytes[SRC_PORT_OFFSET],
        seq: u16::from_le_bytes([bytes[SEQ_OFFSET], bytes[SEQ_OFFSET + 1]]),
    })
}

/// Whether `bytes` starts with a data frame shaped like our template.
///
/// Monitor interfaces capture every frame on the channel; this filters out
/// beacons and foreign data traffic before any parsing.
pub fn is_link_frame(bytes: &[u8]) -> bool {
    bytes.len() >= LINK_HEADER_SIZE
        && bytes[0] == LINK_HEADER_TEMPLATE[0]
        && bytes[10..15] == ADDR_PREFIX
        && bytes[16..21] == ADDR_PREFIX
}

/// Outbound 802.11 sequence-control counter.
///
/// The field holds a 12-bit sequence number above a 4-bit fragment number;
/// link frames are never 802.11-fragmented, so the counter steps by 16 and
/// wraps at 16 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSequence(u16);

impl LinkSequence {
    /// Increment applied per frame.
    pub const STEP: u16 = 1 << 4;

    /// Start at zero.
    pub fn new() -> Self {
        Self(0)
    }

    /// Value for the next frame; advances the counter.
    pub fn next_seq(&mut self) -> u16 {
        let seq = self.0;
        self.0 = self.0.wrapping_add(Self::STEP);
        seq
    }

    /// Value the next frame will carry.
    pub fn peek(&self) -> u16 {
        self.0
    }
}

/// Frames missing between two consecutive captures of one transmitter.
///
/// Duplicates and reordered frames (a backwards step of less than half the
/// sequence space) count as zero.
pub fn frames_lost(prev: u16, cur: u16) -> u16 {
    let delta = cur.wrapping_sub(prev) >> 4;
    if delta == 0 || delta >= 0x800 {
        0
    } else {
        delta - 1
    }
}
