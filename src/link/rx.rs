//! Receive pipeline.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::stats::{RxStats, RxStatsSnapshot};
use crate::codec::{DataFragment, Packet, parse_packet};
use crate::core::{LinkError, MAX_RX_INTERFACES};
use crate::crypto::{ActiveKey, KeyUpdate, LinkKeys, RxKeyManager};
use crate::frame::{SessionKeyMessage, frames_lost, split_captured};

/// Result of one captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxEvent {
    /// An authenticated data fragment.
    Fragment {
        /// Capture interface it arrived on.
        interface: usize,
        /// Epoch of the key it decrypted under.
        key_epoch: u32,
        /// The fragment.
        fragment: DataFragment,
    },
    /// A new session key; block-index tracking above should restart.
    KeyInstalled {
        /// Epoch of the new key.
        epoch: u32,
    },
    /// Re-announcement of the active key.
    KeyUnchanged,
}

/// Frame-consuming half of a link.
///
/// `process_frame` takes `&self`: one receiver serves every capture
/// interface, with the active key and counters shared between them.
#[derive(Debug)]
pub struct Receiver {
    radio_port: u8,
    keys: RxKeyManager,
    stats: RxStats,
    last_seq: Mutex<[Option<u16>; MAX_RX_INTERFACES]>,
}

impl Receiver {
    /// Receiver for `radio_port`.
    pub fn new(keys: LinkKeys, radio_port: u8) -> Self {
        Self {
            radio_port,
            keys: RxKeyManager::new(keys),
            stats: RxStats::new(),
            last_seq: Mutex::new([None; MAX_RX_INTERFACES]),
        }
    }

    /// Logical stream this receiver accepts.
    pub fn radio_port(&self) -> u8 {
        self.radio_port
    }

    /// Snapshot of the active key.
    pub fn active_key(&self) -> Option<Arc<ActiveKey>> {
        self.keys.active_key()
    }

    /// Counters so far.
    pub fn stats(&self) -> RxStatsSnapshot {
        self.stats.snapshot()
    }

    /// Process one captured frame (radiotap header included).
    ///
    /// Every error is a per-frame drop; see [`LinkError::is_silent_drop`].
    pub fn process_frame(&self, interface: usize, raw: &[u8]) -> Result<RxEvent, LinkError> {
        if interface >= MAX_RX_INTERFACES {
            return Err(LinkError::InvalidInterface(interface));
        }

        let captured = match split_captured(raw) {
            Ok(captured) => captured,
            Err(LinkError::ForeignFrame) => return Err(LinkError::ForeignFrame),
            Err(e) => {
                self.stats.record_bad_frame();
                return Err(e);
            }
        };

        if captured.address.dest_port != self.radio_port {
            return Err(LinkError::ForeignPort(captured.address.dest_port));
        }

        self.stats.record_frame();
        self.track_sequence(interface, captured.address.seq);

        let packet = parse_packet(captured.packet).inspect_err(|e| {
            trace!(interface, error = %e, "malformed packet");
            self.stats.record_bad_frame();
        })?;

        match packet {
            Packet::SessionKey(message) => self.handle_key(interface, &message),
            Packet::Data { .. } => self.handle_data(interface, captured.packet),
        }
    }

    fn handle_key(
        &self,
        interface: usize,
        message: &SessionKeyMessage,
    ) -> Result<RxEvent, LinkError> {
        match self.keys.handle_key_message(message, Instant::now()) {
            Ok(update) => {
                self.stats.record_session_key();
                Ok(match update {
                    KeyUpdate::Installed { epoch } => RxEvent::KeyInstalled { epoch },
                    KeyUpdate::Unchanged => RxEvent::KeyUnchanged,
                })
            }
            Err(e) => {
                debug!(interface, error = %e, "session key rejected");
                self.stats.record_decrypt_error();
                Err(LinkError::AuthenticationFailure)
            }
        }
    }

    fn handle_data(&self, interface: usize, packet: &[u8]) -> Result<RxEvent, LinkError> {
        match self.keys.decode(packet) {
            Ok((fragment, key_epoch)) => {
                self.stats.record_fragment();
                Ok(RxEvent::Fragment {
                    interface,
                    key_epoch,
                    fragment,
                })
            }
            Err(e) => {
                if e.is_decrypt_error() {
                    self.stats.record_decrypt_error();
                } else {
                    self.stats.record_bad_frame();
                }
                trace!(interface, error = %e, "fragment dropped");
                Err(e)
            }
        }
    }

    fn track_sequence(&self, interface: usize, seq: u16) {
        let mut last = self.last_seq.lock();
        if let Some(prev) = last[interface] {
            self.stats.record_lost(frames_lost(prev, seq));
        }
        last[interface] = Some(seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WfbError;
    use crate::frame::{
        LINK_HEADER_TEMPLATE, RADIOTAP_TEMPLATE, assemble_frame, build_link_header,
    };
    use crate::link::Transmitter;

    fn link(port: u8) -> (Transmitter, Receiver) {
        let (tx_keys, rx_keys) = LinkKeys::generate_pair();
        (Transmitter::new(tx_keys, port), Receiver::new(rx_keys, port))
    }

    fn send(tx: &mut Transmitter, payload: &[u8], seq: u32) -> Result<Vec<Vec<u8>>, WfbError> {
        let mut frames = Vec::new();
        let block = tx.next_block();
        tx.send_fragment(block, 0, payload, seq, &mut frames)?;
        Ok(frames)
    }

    #[test]
    fn test_key_then_fragment() {
        let (mut tx, rx) = link(7);
        let frames = send(&mut tx, b"telemetry", 42).unwrap();

        assert_eq!(
            rx.process_frame(0, &frames[0]).unwrap(),
            RxEvent::KeyInstalled { epoch: 1 }
        );
        match rx.process_frame(0, &frames[1]).unwrap() {
            RxEvent::Fragment {
                interface,
                key_epoch,
                fragment,
            } => {
                assert_eq!(interface, 0);
                assert_eq!(key_epoch, 1);
                assert_eq!(fragment.sequence, 42);
                assert_eq!(fragment.payload, b"telemetry");
            }
            other => panic!("expected fragment, got {other:?}"),
        }

        let stats = rx.stats();
        assert_eq!(stats.packets_all, 2);
        assert_eq!(stats.fragments_ok, 1);
        assert_eq!(stats.session_keys, 1);
        assert_eq!(stats.frames_lost, 0);
    }

    #[test]
    fn test_data_before_key_is_dropped() {
        let (mut tx, rx) = link(7);
        let frames = send(&mut tx, b"x", 0).unwrap();

        let err = rx.process_frame(0, &frames[1]).unwrap_err();
        assert!(matches!(err, LinkError::NoSessionKey));
        assert!(err.is_silent_drop());
        assert_eq!(rx.stats().decrypt_errors, 1);
    }

    #[test]
    fn test_reannouncement_on_second_interface() {
        let (mut tx, rx) = link(1);
        let frames = send(&mut tx, b"x", 0).unwrap();

        assert!(matches!(
            rx.process_frame(0, &frames[0]).unwrap(),
            RxEvent::KeyInstalled { .. }
        ));
        assert_eq!(
            rx.process_frame(1, &frames[0]).unwrap(),
            RxEvent::KeyUnchanged
        );
        assert!(matches!(
            rx.process_frame(1, &frames[1]).unwrap(),
            RxEvent::Fragment { interface: 1, .. }
        ));
    }

    #[test]
    fn test_foreign_port_and_frame() {
        let (mut tx, _) = link(1);
        let (_, rx) = link(2);
        let frames = send(&mut tx, b"x", 0).unwrap();

        assert!(matches!(
            rx.process_frame(0, &frames[0]),
            Err(LinkError::ForeignPort(1))
        ));

        let mut header = LINK_HEADER_TEMPLATE;
        header[10] = 0x00;
        let beacon = assemble_frame(&RADIOTAP_TEMPLATE, &header, &[0u8; 8]);
        assert!(matches!(
            rx.process_frame(0, &beacon),
            Err(LinkError::ForeignFrame)
        ));
        assert_eq!(rx.stats().packets_all, 0);
    }

    #[test]
    fn test_key_from_other_transmitter_rejected() {
        let (mut tx, rx) = link(1);
        let (mut stranger, _) = link(1);

        let good = send(&mut tx, b"x", 0).unwrap();
        rx.process_frame(0, &good[0]).unwrap();

        let bad = send(&mut stranger, b"y", 0).unwrap();
        assert!(matches!(
            rx.process_frame(0, &bad[0]),
            Err(LinkError::AuthenticationFailure)
        ));
        assert!(matches!(
            rx.process_frame(0, &bad[1]),
            Err(LinkError::AuthenticationFailure)
        ));

        // Original key still in force
        assert!(rx.process_frame(0, &good[1]).is_ok());
        assert_eq!(rx.stats().decrypt_errors, 2);
    }

    #[test]
    fn test_lost_frames_counted_per_interface() {
        let rx = Receiver::new(LinkKeys::generate_pair().1, 4);
        let frame = |seq: u16| {
            assemble_frame(
                &RADIOTAP_TEMPLATE,
                &build_link_header(4, 4, seq),
                &[0x01, 0x00],
            )
        };

        // Undecodable but on our port: still counted for gaps
        let _ = rx.process_frame(0, &frame(0));
        let _ = rx.process_frame(1, &frame(0));
        let _ = rx.process_frame(0, &frame(4 * 16));
        let _ = rx.process_frame(1, &frame(16));

        let stats = rx.stats();
        assert_eq!(stats.packets_all, 4);
        assert_eq!(stats.frames_lost, 3);
        assert_eq!(stats.bad_frames, 4);
    }

    #[test]
    fn test_invalid_interface() {
        let (mut tx, rx) = link(0);
        let frames = send(&mut tx, b"x", 0).unwrap();
        let err = rx
            .process_frame(MAX_RX_INTERFACES, &frames[0])
            .unwrap_err();
        assert!(err.is_caller_bug());
    }
}
