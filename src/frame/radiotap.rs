//! Radiotap injection template and captured-header parsing.
//!
//! Outbound frames carry a fixed 13-byte header:
//!
//! ```text
//! 00 00        version, pad
//! 0d 00        header length (LE16)
//! 00 80 08 00  present: TX_FLAGS | MCS
//! 08 00        TX flags: NOACK
//! 07 05 01     MCS known, MCS flags, MCS index
//! ```
//!
//! Captured frames carry whatever header the capturing driver produced, so
//! [`parse_radiotap`] only trusts the length field and the FLAGS field.

use crate::core::{LinkError, RADIOTAP_HEADER_SIZE};

/// Radiotap present-word bits used here.
pub mod present_flags {
    /// 64-bit TSF timer.
    pub const TSFT: u32 = 1 << 0;
    /// One byte of frame flags.
    pub const FLAGS: u32 = 1 << 1;
    /// Transmit flags.
    pub const TX_FLAGS: u32 = 1 << 15;
    /// 802.11n MCS rate info.
    pub const MCS: u32 = 1 << 19;
    /// Another present word follows.
    pub const EXT: u32 = 1 << 31;
}

/// Radiotap FLAGS field bits.
pub mod frame_flags {
    /// Frame carries a trailing 4-byte FCS.
    pub const FCS: u8 = 0x10;
    /// Driver saw a bad FCS.
    pub const BAD_FCS: u8 = 0x40;
}

/// MCS `known` and `flags` bits.
pub mod mcs {
    /// Bandwidth field valid.
    pub const HAVE_BW: u8 = 0x01;
    /// MCS index valid.
    pub const HAVE_MCS: u8 = 0x02;
    /// Guard interval valid.
    pub const HAVE_GI: u8 = 0x04;
    /// HT format valid.
    pub const HAVE_FMT: u8 = 0x08;

    /// Short guard interval.
    pub const SGI: u8 = 0x04;
    /// Greenfield format.
    pub const FMT_GF: u8 = 0x08;
}

/// TX flag: do not wait for an ACK.
pub const TX_FLAG_NOACK: u16 = 0x0008;

const FIXED_HEADER_SIZE: usize = 8;
const TSFT_SIZE: usize = 8;
const FCS_SIZE: usize = 4;

/// The injection template: MCS #1, 40 MHz, short GI.
pub const RADIOTAP_TEMPLATE: [u8; RADIOTAP_HEADER_SIZE] = McsParams::DEFAULT.to_header();

/// The fixed template prepended to every outbound frame.
pub fn radio_injection_template() -> &'static [u8; RADIOTAP_HEADER_SIZE] {
    &RADIOTAP_TEMPLATE
}

/// HT channel width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Bandwidth {
    /// 20 MHz.
    Bw20,
    /// 40 MHz.
    #[default]
    Bw40,
    /// Lower 20 MHz of a 40 MHz channel.
    Bw20Lower,
    /// Upper 20 MHz of a 40 MHz channel.
    Bw20Upper,
}

impl Bandwidth {
    /// Radiotap MCS bandwidth code.
    pub const fn as_bits(self) -> u8 {
        match self {
            Bandwidth::Bw20 => 0,
            Bandwidth::Bw40 => 1,
            Bandwidth::Bw20Lower => 2,
            Bandwidth::Bw20Upper => 3,
        }
    }
}

/// Rate selection rendered into the injection header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct McsParams {
    /// MCS index (0-31).
    pub index: u8,
    /// Channel width.
    pub bandwidth: Bandwidth,
    /// Use the short guard interval.
    pub short_gi: bool,
    /// Use HT greenfield format.
    pub greenfield: bool,
}

impl McsParams {
    /// MCS #1, QPSK 1/2, 40 MHz, short GI.
    pub const DEFAULT: Self = Self {
        index: 1,
        bandwidth: Bandwidth::Bw40,
        short_gi: true,
        greenfield: false,
    };

    /// Render a complete injection header.
    pub const fn to_header(&self) -> [u8; RADIOTAP_HEADER_SIZE] {
        let present = present_flags::TX_FLAGS | present_flags::MCS;
        let present = present.to_le_bytes();
        let tx_flags = TX_FLAG_NOACK.to_le_bytes();
        let length = (RADIOTAP_HEADER_SIZE as u16).to_le_bytes();

        let mut known = mcs::HAVE_MCS | mcs::HAVE_BW | mcs::HAVE_GI;
        let mut flags = self.bandwidth.as_bits();
        if self.short_gi {
            flags |= mcs::SGI;
        }
        if self.greenfield {
            known |= mcs::HAVE_FMT;
            flags |= mcs::FMT_GF;
        }

        [
            0x00, 0x00, length[0], length[1], present[0], present[1], present[2], present[3],
            tx_flags[0], tx_flags[1], known, flags, self.index,
        ]
    }
}

impl Default for McsParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What the receive path needs from a captured radiotap header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadiotapInfo {
    /// Header length; the 802.11 frame starts here.
    pub length: usize,
    /// FLAGS field, when the driver reported one.
    pub flags: Option<u8>,
}

impl RadiotapInfo {
    /// Whether a 4-byte FCS trails the frame.
    pub fn has_fcs(&self) -> bool {
        self.flags.is_some_and(|f| f & frame_flags::FCS != 0)
    }

    /// Whether the driver flagged the FCS as bad.
    pub fn bad_fcs(&self) -> bool {
        self.flags.is_some_and(|f| f & frame_flags::BAD_FCS != 0)
    }

    /// Trailing bytes to strip after the payload.
    pub fn trailer_len(&self) -> usize {
        if self.has_fcs() { FCS_SIZE } else { 0 }
    }
}

/// Parse the radiotap header at the start of a captured frame.
///
/// Walks extended present words and the TSFT field (8-byte aligned) to reach
/// FLAGS; any other fields are skipped via the length field.
pub fn parse_radiotap(bytes: &[u8]) -> Result<RadiotapInfo, LinkError> {
    if bytes.len() < FIXED_HEADER_SIZE {
        return Err(LinkError::MalformedHeader {
            context: "radiotap header",
            expected: FIXED_HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    if bytes[0] != 0 {
        return Err(LinkError::InvalidRadiotap("unsupported version"));
    }

    let length = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
    if length < FIXED_HEADER_SIZE {
        return Err(LinkError::InvalidRadiotap("length below fixed header"));
    }
    if length > bytes.len() {
        return Err(LinkError::MalformedHeader {
            context: "radiotap header",
            expected: length,
            actual: bytes.len(),
        });
    }

    let present = read_u32(bytes, 4);
    let mut offset = FIXED_HEADER_SIZE;
    let mut word = present;
    while word & present_flags::EXT != 0 {
        if offset + 4 > length {
            return Err(LinkError::InvalidRadiotap("truncated present bitmap"));
        }
        word = read_u32(bytes, offset);
        offset += 4;
    }

    if present & present_flags::TSFT != 0 {
        offset = offset.next_multiple_of(TSFT_SIZE) + TSFT_SIZE;
    }

    let flags = if present & present_flags::FLAGS != 0 {
        if offset >= length {
            return Err(LinkError::InvalidRadiotap("truncated flags field"));
        }
        Some(bytes[offset])
    } else {
        None
    };

    Ok(RadiotapInfo { length, flags })
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
