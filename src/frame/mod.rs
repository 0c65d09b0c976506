//! Frame layout.
//!
//! An injected frame is three nested layers:
//!
//! ```text
//! ┌───────────────┬────────────────────┬──────────────────────────────┐
//! │ radiotap (13) │ 802.11 header (24) │ block-layer packet           │
//! └───────────────┴────────────────────┴──────────────────────────────┘
//! ```
//!
//! This module owns the byte layout of each layer; payload budgets derived
//! from it live in [`crate::core::FrameBudget`].

mod block;
mod link;
mod radiotap;

pub use block::*;
pub use link::*;
pub use radiotap::*;

use crate::core::{LINK_HEADER_SIZE, LinkError, RADIOTAP_HEADER_SIZE};

/// Concatenate the three layers into one injectable frame.
pub fn assemble_frame(
    radiotap: &[u8; RADIOTAP_HEADER_SIZE],
    link_header: &[u8; LINK_HEADER_SIZE],
    packet: &[u8],
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(RADIOTAP_HEADER_SIZE + LINK_HEADER_SIZE + packet.len());
    frame.extend_from_slice(radiotap);
    frame.extend_from_slice(link_header);
    frame.extend_from_slice(packet);
    frame
}

/// A captured frame split into its layers.
#[derive(Debug, Clone, Copy)]
pub struct CapturedFrame<'a> {
    /// Radiotap fields the receive path cares about.
    pub radiotap: RadiotapInfo,
    /// Routing metadata from the 802.11 header.
    pub address: LinkAddress,
    /// Block-layer packet, FCS stripped.
    pub packet: &'a [u8],
}

/// Split a captured frame into radiotap info, link address and packet.
///
/// Drops frames with a bad FCS, frames that are not link data frames and
/// frames too short for their headers.
pub fn split_captured(raw: &[u8]) -> Result<CapturedFrame<'_>, LinkError> {
    let radiotap = parse_radiotap(raw)?;
    if radiotap.bad_fcs() {
        return Err(LinkError::BadFcs);
    }

    let body = &raw[radiotap.length..];
    let trailer = radiotap.trailer_len();
    if body.len() < LINK_HEADER_SIZE + trailer {
        return Err(LinkError::MalformedHeader {
            context: "link header",
            expected: LINK_HEADER_SIZE + trailer,
            actual: body.len(),
        });
    }
    let body = &body[..body.len() - trailer];

    if !is_link_frame(body) {
        return Err(LinkError::ForeignFrame);
    }
    let address = parse_link_header(body)?;

    Ok(CapturedFrame {
        radiotap,
        address,
        packet: &body[LINK_HEADER_SIZE..],
    })
}
