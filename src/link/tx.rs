//! Transmit pipeline.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::codec::encode_with_budget;
use crate::core::{FrameBudget, LinkError, RADIOTAP_HEADER_SIZE, RawFrameSink, WfbError};
use crate::crypto::{ActiveKey, BlockCounter, LinkKeys, TxKeyManager};
use crate::frame::{LinkSequence, McsParams, assemble_frame, build_link_header};

/// Frame-producing half of a link.
///
/// Owns everything a single sender needs: the 802.11 sequence counter, the
/// block counter and the session key schedule. Not shared; wrap it in a
/// mutex to drive it from more than one task.
#[derive(Debug)]
pub struct Transmitter {
    radio_port: u8,
    radiotap: [u8; RADIOTAP_HEADER_SIZE],
    sequence: LinkSequence,
    blocks: BlockCounter,
    keys: TxKeyManager,
    budget: FrameBudget,
}

impl Transmitter {
    /// Transmitter on `radio_port` with default MCS, schedule and budget.
    pub fn new(keys: LinkKeys, radio_port: u8) -> Self {
        Self::from_key_manager(TxKeyManager::new(keys), radio_port)
    }

    /// Transmitter driven by an existing key manager.
    pub fn from_key_manager(keys: TxKeyManager, radio_port: u8) -> Self {
        Self {
            radio_port,
            radiotap: McsParams::DEFAULT.to_header(),
            sequence: LinkSequence::new(),
            blocks: BlockCounter::new(),
            keys,
            budget: FrameBudget::DEFAULT,
        }
    }

    /// Use a different injection rate.
    pub fn with_mcs(mut self, mcs: McsParams) -> Self {
        self.radiotap = mcs.to_header();
        self
    }

    /// Use a smaller frame ceiling.
    pub fn with_budget(mut self, budget: FrameBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Logical stream this transmitter writes to.
    pub fn radio_port(&self) -> u8 {
        self.radio_port
    }

    /// Frame budget in use.
    pub fn budget(&self) -> &FrameBudget {
        &self.budget
    }

    /// Key data is currently encrypted under.
    pub fn active_key(&self) -> Option<Arc<ActiveKey>> {
        self.keys.active_key()
    }

    /// Claim the next block index.
    pub fn next_block(&mut self) -> u64 {
        self.blocks.next_block()
    }

    /// Inject a KEY frame if the schedule calls for one.
    ///
    /// Returns whether a frame was injected. A new key only becomes active
    /// once its KEY frame has been accepted by the sink; on a sink failure it
    /// stays pending and is announced again on the next call.
    pub fn announce_if_due<S>(&mut self, now: Instant, sink: &mut S) -> Result<bool, WfbError>
    where
        S: RawFrameSink + ?Sized,
    {
        let Some(prepared) = self.keys.prepare(now)? else {
            return Ok(false);
        };

        self.inject(&prepared.message().to_bytes(), sink)?;
        let announcement = self.keys.commit(prepared, now);
        debug!(
            port = self.radio_port,
            epoch = announcement.epoch,
            rotated = announcement.rotated,
            "session key announced"
        );
        Ok(true)
    }

    /// Encode and inject one data fragment.
    ///
    /// Announces the session key first when due, so the first fragment on a
    /// fresh transmitter is always preceded by a KEY frame.
    ///
    /// # Errors
    /// `PayloadTooLarge` before anything is injected; sealing or sink failures.
    pub fn send_fragment<S>(
        &mut self,
        block_index: u64,
        fragment_index: u8,
        payload: &[u8],
        sequence: u32,
        sink: &mut S,
    ) -> Result<(), WfbError>
    where
        S: RawFrameSink + ?Sized,
    {
        if payload.len() > self.budget.max_payload_size {
            return Err(LinkError::PayloadTooLarge {
                size: payload.len(),
                max: self.budget.max_payload_size,
            }
            .into());
        }

        self.announce_if_due(Instant::now(), sink)?;

        let active = self.keys.active_key().ok_or(LinkError::NoSessionKey)?;
        let packet = encode_with_budget(
            active.key(),
            block_index,
            fragment_index,
            payload,
            sequence,
            &self.budget,
        )?;

        self.inject(&packet, sink)?;
        trace!(block_index, fragment_index, len = payload.len(), "fragment sent");
        Ok(())
    }

    fn inject<S>(&mut self, packet: &[u8], sink: &mut S) -> Result<(), WfbError>
    where
        S: RawFrameSink + ?Sized,
    {
        let link_header = build_link_header(self.radio_port, self.radio_port, self.sequence.peek());
        let frame = assemble_frame(&self.radiotap, &link_header, packet);
        sink.send_raw_frame(&frame)?;
        // Frames that never left do not open a gap at the receiver
        self.sequence.next_seq();
        Ok(())
    }
}
