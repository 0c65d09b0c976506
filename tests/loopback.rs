//! End-to-end link tests over the in-memory radio.
//!
//! One transmitter, one shared receiver, several capture interfaces.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use wfb_link::crypto::{KeySchedule, TxKeyManager};
use wfb_link::prelude::*;

// ==============================================================
// Helpers
// ==============================================================

const PORT: u8 = 0x20;

fn payload(i: u32) -> Vec<u8> {
    format!("fragment #{i}").into_bytes()
}

async fn next_event(events: &mut mpsc::Receiver<RxEvent>) -> RxEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

// ==============================================================
// Tests
// ==============================================================

#[tokio::test]
async fn two_monitors_share_one_receiver() {
    let (tx_keys, rx_keys) = LinkKeys::generate_pair();
    let radio = LoopbackRadio::new();
    let receiver = Arc::new(Receiver::new(rx_keys, PORT));
    let (events_tx, mut events) = mpsc::channel(256);

    for interface in 0..2 {
        tokio::spawn(pump_interface(
            radio.monitor(),
            Arc::clone(&receiver),
            interface,
            events_tx.clone(),
        ));
    }
    drop(events_tx);

    let mut tx = Transmitter::new(tx_keys, PORT);
    let mut injector = radio.injector();
    const COUNT: u32 = 20;
    for i in 0..COUNT {
        let block = tx.next_block();
        tx.send_fragment(block, 0, &payload(i), i, &mut injector)
            .unwrap();
    }

    // Every fragment arrives once per interface
    let mut copies: HashMap<u64, HashSet<usize>> = HashMap::new();
    let mut installs = 0;
    while copies.values().map(HashSet::len).sum::<usize>() < 2 * COUNT as usize {
        match next_event(&mut events).await {
            RxEvent::Fragment {
                interface,
                fragment,
                ..
            } => {
                assert_eq!(fragment.payload, payload(fragment.sequence));
                assert_eq!(fragment.block_index, u64::from(fragment.sequence));
                copies
                    .entry(fragment.block_index)
                    .or_default()
                    .insert(interface);
            }
            RxEvent::KeyInstalled { .. } => installs += 1,
            RxEvent::KeyUnchanged => {}
        }
    }

    assert_eq!(copies.len(), COUNT as usize);
    assert!(copies.values().all(|ifaces| ifaces.len() == 2));
    assert!(installs >= 1);

    let stats = receiver.stats();
    assert_eq!(stats.fragments_ok, 2 * u64::from(COUNT));
    assert_eq!(stats.decrypt_errors, 0);
    assert_eq!(stats.frames_lost, 0);
}

#[test]
fn rotation_invalidates_previous_key() {
    let (tx_keys, rx_keys) = LinkKeys::generate_pair();
    let schedule = KeySchedule {
        rekey_interval: Duration::ZERO,
        announce_interval: Duration::from_secs(1),
    };
    let mut tx = Transmitter::from_key_manager(TxKeyManager::with_schedule(tx_keys, schedule), PORT);
    let rx = Receiver::new(rx_keys, PORT);

    // Every send rotates: KEY(1) DATA KEY(2) DATA
    let mut air: Vec<Vec<u8>> = Vec::new();
    tx.send_fragment(0, 0, b"first", 0, &mut air).unwrap();
    tx.send_fragment(1, 0, b"second", 1, &mut air).unwrap();
    assert_eq!(air.len(), 4);

    assert_eq!(
        rx.process_frame(0, &air[0]).unwrap(),
        RxEvent::KeyInstalled { epoch: 1 }
    );
    assert!(matches!(
        rx.process_frame(0, &air[1]).unwrap(),
        RxEvent::Fragment { key_epoch: 1, .. }
    ));
    assert_eq!(
        rx.process_frame(0, &air[2]).unwrap(),
        RxEvent::KeyInstalled { epoch: 2 }
    );
    assert!(matches!(
        rx.process_frame(0, &air[3]).unwrap(),
        RxEvent::Fragment { key_epoch: 2, .. }
    ));

    // A late copy of the first fragment no longer authenticates
    let err = rx.process_frame(1, &air[1]).unwrap_err();
    assert!(matches!(err, LinkError::AuthenticationFailure));
    assert!(err.is_silent_drop());
}

#[test]
fn wrong_receiver_never_decodes() {
    let (tx_keys, _) = LinkKeys::generate_pair();
    let (_, stranger_keys) = LinkKeys::generate_pair();
    let mut tx = Transmitter::new(tx_keys, PORT);
    let rx = Receiver::new(stranger_keys, PORT);

    let mut air: Vec<Vec<u8>> = Vec::new();
    for i in 0..3 {
        tx.send_fragment(i, 0, b"secret", 0, &mut air).unwrap();
    }

    for frame in &air {
        let err = rx.process_frame(0, frame).unwrap_err();
        assert!(err.is_decrypt_error());
    }
    assert!(rx.active_key().is_none());
    assert_eq!(rx.stats().fragments_ok, 0);
}

#[tokio::test]
async fn announcer_and_sender_share_transmitter() {
    let (tx_keys, rx_keys) = LinkKeys::generate_pair();
    let radio = LoopbackRadio::new();
    let receiver = Arc::new(Receiver::new(rx_keys, PORT));
    let (events_tx, mut events) = mpsc::channel(64);
    tokio::spawn(pump_interface(
        radio.monitor(),
        Arc::clone(&receiver),
        0,
        events_tx,
    ));

    let tx = Arc::new(Mutex::new(Transmitter::new(tx_keys, PORT)));
    let announcer = spawn_key_announcer(
        Arc::clone(&tx),
        radio.injector(),
        Duration::from_millis(20),
    );

    // Idle link: a key still arrives
    assert_eq!(next_event(&mut events).await, RxEvent::KeyInstalled { epoch: 1 });

    {
        let mut injector = radio.injector();
        let mut tx = tx.lock();
        let block = tx.next_block();
        tx.send_fragment(block, 0, b"payload", 9, &mut injector)
            .unwrap();
    }

    loop {
        match next_event(&mut events).await {
            RxEvent::Fragment { fragment, .. } => {
                assert_eq!(fragment.payload, b"payload");
                assert_eq!(fragment.sequence, 9);
                break;
            }
            RxEvent::KeyInstalled { .. } | RxEvent::KeyUnchanged => {}
        }
    }

    drop(tx);
    tokio::time::timeout(Duration::from_secs(1), announcer)
        .await
        .unwrap()
        .unwrap();
}
