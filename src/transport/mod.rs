//! Async transport adapters.
//!
//! The link core is synchronous and never touches a radio. This module wires
//! it to tokio:
//!
//! - [`LoopbackRadio`]: an in-memory shared channel with any number of
//!   monitors, standing in for pcap injection/capture handles
//! - [`spawn_key_announcer`]: keeps session keys flowing on an idle link
//! - [`pump_interface`]: one receive loop per capture interface
//!
//! ```text
//! Transmitter ──▶ LoopbackInjector ──▶ LoopbackRadio ──┬──▶ monitor 0 ──▶ pump ──┐
//!                                                      └──▶ monitor 1 ──▶ pump ──┴──▶ mpsc<RxEvent>
//! ```

mod loopback;
mod tasks;

pub use loopback::*;
pub use tasks::*;
