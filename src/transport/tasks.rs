//! Background tasks driving a link.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use super::loopback::LoopbackMonitor;
use crate::core::RawFrameSink;
use crate::link::{Receiver, RxEvent, Transmitter};

/// Keep announcing session keys on a possibly idle link.
///
/// Polls the transmitter's key schedule every `period`. The task ends once
/// every other handle to the transmitter has been dropped.
pub fn spawn_key_announcer<S>(
    tx: Arc<Mutex<Transmitter>>,
    mut sink: S,
    period: Duration,
) -> JoinHandle<()>
where
    S: RawFrameSink + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let now = ticker.tick().await.into_std();
            if Arc::strong_count(&tx) == 1 {
                debug!("transmitter dropped, key announcer exiting");
                return;
            }

            let result = tx.lock().announce_if_due(now, &mut sink);
            if let Err(e) = result {
                warn!(error = %e, "key announcement failed");
            }
        }
    })
}

/// Feed one capture interface into a shared receiver.
///
/// Forwards every event to `out` and drops failed frames. Returns when the
/// medium closes or `out` has no consumer left.
pub async fn pump_interface(
    mut monitor: LoopbackMonitor,
    receiver: Arc<Receiver>,
    interface: usize,
    out: mpsc::Sender<RxEvent>,
) {
    while let Some(frame) = monitor.recv().await {
        match receiver.process_frame(interface, &frame) {
            Ok(event) => {
                if out.send(event).await.is_err() {
                    debug!(interface, "event consumer gone");
                    return;
                }
            }
            Err(e) if e.is_silent_drop() => {
                trace!(interface, error = %e, "frame dropped");
            }
            Err(e) => {
                warn!(interface, error = %e, "frame rejected");
            }
        }
    }
    debug!(interface, "medium closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::LinkKeys;
    use crate::transport::LoopbackRadio;

    #[tokio::test]
    async fn test_announcer_keeps_idle_link_keyed() {
        let (tx_keys, rx_keys) = LinkKeys::generate_pair();
        let radio = LoopbackRadio::new();
        let mut monitor = radio.monitor();
        let receiver = Receiver::new(rx_keys, 5);

        let tx = Arc::new(Mutex::new(Transmitter::new(tx_keys, 5)));
        let handle = spawn_key_announcer(
            Arc::clone(&tx),
            radio.injector(),
            Duration::from_millis(10),
        );

        let frame = monitor.recv().await.unwrap();
        assert_eq!(
            receiver.process_frame(0, &frame).unwrap(),
            RxEvent::KeyInstalled { epoch: 1 }
        );

        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_pump_forwards_events() {
        let (tx_keys, rx_keys) = LinkKeys::generate_pair();
        let radio = LoopbackRadio::new();
        let receiver = Arc::new(Receiver::new(rx_keys, 9));
        let (events_tx, mut events) = mpsc::channel(16);

        let pump = tokio::spawn(pump_interface(
            radio.monitor(),
            Arc::clone(&receiver),
            0,
            events_tx,
        ));

        let mut tx = Transmitter::new(tx_keys, 9);
        let mut injector = radio.injector();
        // Foreign port: dropped inside the pump
        let mut other = Transmitter::new(LinkKeys::generate_pair().0, 3);
        other.send_fragment(0, 0, b"noise", 0, &mut injector).unwrap();
        tx.send_fragment(0, 0, b"ping", 1, &mut injector).unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            RxEvent::KeyInstalled { epoch: 1 }
        );
        match events.recv().await.unwrap() {
            RxEvent::Fragment { fragment, .. } => assert_eq!(fragment.payload, b"ping"),
            other => panic!("expected fragment, got {other:?}"),
        }

        drop(events);
        drop(injector);
        drop(radio);
        pump.await.unwrap();
    }
}
