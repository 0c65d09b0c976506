//! Session key lifecycle.
//!
//! The transmitter owns the key schedule:
//!
//! ```text
//! NoKey ──poll──▶ Pending ──sealed──▶ Active(k0) ──rekey_interval──▶ Pending ──▶ Active(k1) ...
//!                                       │
//!                                       └──announce_interval──▶ re-announce k0
//! ```
//!
//! Announcements are best-effort broadcasts; a new key is active as soon as
//! its announcement has been produced. The receiver installs whatever key
//! it last opened successfully, bumping an epoch so the layer above can reset
//! per-key state such as block-index tracking.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::aead::SessionKey;
use super::keys::LinkKeys;
use super::sealed::{open_session_key, seal_session_key};
use crate::codec::{DataFragment, decode};
use crate::core::{
    CryptoError, LinkError, SESSION_KEY_ANNOUNCE_INTERVAL, SESSION_KEY_ROTATE_INTERVAL,
};
use crate::frame::SessionKeyMessage;

/// A session key together with when it became active.
#[derive(Debug)]
pub struct ActiveKey {
    key: SessionKey,
    epoch: u32,
    activated_at: Instant,
}

impl ActiveKey {
    /// The key itself.
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Install counter; bumped on every key change.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// When the key became active.
    pub fn activated_at(&self) -> Instant {
        self.activated_at
    }
}

/// The active key, shared between readers and the single writer.
///
/// Readers take an `Arc` snapshot; a decode in progress keeps using the key
/// it started with even if a new one is installed meanwhile.
#[derive(Debug, Default)]
pub struct SharedSessionKey {
    inner: RwLock<Option<Arc<ActiveKey>>>,
}

impl SharedSessionKey {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the active key.
    pub fn load(&self) -> Option<Arc<ActiveKey>> {
        self.inner.read().clone()
    }

    /// Epoch of the active key, 0 before the first install.
    pub fn epoch(&self) -> u32 {
        self.inner.read().as_ref().map_or(0, |k| k.epoch)
    }

    /// Replace the active key unconditionally.
    pub fn install(&self, key: SessionKey, now: Instant) -> Arc<ActiveKey> {
        let mut slot = self.inner.write();
        let active = Self::next(slot.as_deref(), key, now);
        *slot = Some(Arc::clone(&active));
        active
    }

    /// Install `key` unless it is already active.
    ///
    /// Returns the new key, or `None` for a re-announcement. Check and
    /// replace happen under one write lock so concurrent receive paths
    /// delivering the same announcement bump the epoch once.
    pub fn install_if_new(&self, key: SessionKey, now: Instant) -> Option<Arc<ActiveKey>> {
        let mut slot = self.inner.write();
        if slot.as_ref().is_some_and(|current| current.key == key) {
            return None;
        }
        let active = Self::next(slot.as_deref(), key, now);
        *slot = Some(Arc::clone(&active));
        Some(active)
    }

    fn next(current: Option<&ActiveKey>, key: SessionKey, now: Instant) -> Arc<ActiveKey> {
        let epoch = current.map_or(1, |k| k.epoch.wrapping_add(1));
        Arc::new(ActiveKey {
            key,
            epoch,
            activated_at: now,
        })
    }
}

/// Transmitter key state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Nothing generated yet.
    NoKey,
    /// Generated but not yet announced.
    Pending,
    /// Announced and in use.
    Active,
}

/// A KEY packet ready for injection.
#[derive(Debug, Clone)]
pub struct KeyAnnouncement {
    /// Sealed key.
    pub message: SessionKeyMessage,
    /// Epoch of the announced key.
    pub epoch: u32,
    /// Whether this announcement introduced a new key.
    pub rotated: bool,
}

/// A sealed KEY packet that has not been emitted yet.
///
/// Produced by [`TxKeyManager::prepare`] and handed back to
/// [`TxKeyManager::commit`] once the frame is on the air.
#[derive(Debug)]
#[must_use = "an announcement only counts once it is committed"]
pub struct PreparedAnnouncement {
    message: SessionKeyMessage,
    rotation: bool,
}

impl PreparedAnnouncement {
    /// Sealed key to inject.
    pub fn message(&self) -> &SessionKeyMessage {
        &self.message
    }

    /// Whether committing installs a new key.
    pub fn is_rotation(&self) -> bool {
        self.rotation
    }
}

/// Key schedule timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySchedule {
    /// How long a key stays active before a fresh one is generated.
    pub rekey_interval: Duration,
    /// How often the active key is re-announced.
    pub announce_interval: Duration,
}

impl Default for KeySchedule {
    fn default() -> Self {
        Self {
            rekey_interval: SESSION_KEY_ROTATE_INTERVAL,
            announce_interval: SESSION_KEY_ANNOUNCE_INTERVAL,
        }
    }
}

/// Transmitter-side key manager.
pub struct TxKeyManager {
    keys: LinkKeys,
    schedule: KeySchedule,
    active: SharedSessionKey,
    pending: Option<SessionKey>,
    last_announce: Option<Instant>,
}

impl TxKeyManager {
    /// Create a manager with the default schedule.
    pub fn new(keys: LinkKeys) -> Self {
        Self::with_schedule(keys, KeySchedule::default())
    }

    /// Create a manager with an explicit schedule.
    pub fn with_schedule(keys: LinkKeys, schedule: KeySchedule) -> Self {
        Self {
            keys,
            schedule,
            active: SharedSessionKey::new(),
            pending: None,
            last_announce: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> KeyState {
        if self.pending.is_some() {
            KeyState::Pending
        } else if self.active.load().is_some() {
            KeyState::Active
        } else {
            KeyState::NoKey
        }
    }

    /// Snapshot of the key data packets are encrypted under.
    pub fn active_key(&self) -> Option<Arc<ActiveKey>> {
        self.active.load()
    }

    /// The schedule in use.
    pub fn schedule(&self) -> KeySchedule {
        self.schedule
    }

    /// Whether [`TxKeyManager::poll`] would produce an announcement at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.rekey_due(now) || self.announce_due(now)
    }

    fn rekey_due(&self, now: Instant) -> bool {
        if self.pending.is_some() {
            return true;
        }
        match self.active.load() {
            None => true,
            Some(active) => {
                now.saturating_duration_since(active.activated_at) >= self.schedule.rekey_interval
            }
        }
    }

    fn announce_due(&self, now: Instant) -> bool {
        self.last_announce
            .is_none_or(|t| now.saturating_duration_since(t) >= self.schedule.announce_interval)
    }

    /// Seal the announcement due at `now` without changing the schedule.
    ///
    /// When a rotation is due the fresh key is parked as pending; it becomes
    /// active only once [`TxKeyManager::commit`] records that the KEY frame
    /// went out. Dropping the result leaves the key pending, so the next call
    /// announces it again.
    ///
    /// # Errors
    /// Sealing failures; any pending key is kept.
    pub fn prepare(&mut self, now: Instant) -> Result<Option<PreparedAnnouncement>, CryptoError> {
        if self.rekey_due(now) {
            let key = self.pending.get_or_insert_with(SessionKey::generate);
            let message = seal_session_key(&self.keys, key)?;
            return Ok(Some(PreparedAnnouncement {
                message,
                rotation: true,
            }));
        }

        if self.announce_due(now) {
            let Some(active) = self.active.load() else {
                return Ok(None);
            };
            let message = seal_session_key(&self.keys, active.key())?;
            return Ok(Some(PreparedAnnouncement {
                message,
                rotation: false,
            }));
        }

        Ok(None)
    }

    /// Record that a prepared announcement was emitted at `now`.
    ///
    /// A rotation installs the pending key as the active one.
    pub fn commit(&mut self, prepared: PreparedAnnouncement, now: Instant) -> KeyAnnouncement {
        self.last_announce = Some(now);

        if prepared.rotation {
            if let Some(key) = self.pending.take() {
                let active = self.active.install(key, now);
                info!(epoch = active.epoch(), "session key rotated");
                return KeyAnnouncement {
                    message: prepared.message,
                    epoch: active.epoch(),
                    rotated: true,
                };
            }
        }

        let epoch = self.active.epoch();
        debug!(epoch, "session key re-announced");
        KeyAnnouncement {
            message: prepared.message,
            epoch,
            rotated: false,
        }
    }

    /// Prepare and commit in one step, for callers that cannot fail to emit.
    ///
    /// Rotates to a fresh key when the rekey interval has elapsed (or no key
    /// exists yet), otherwise re-announces the active key when the announce
    /// interval has elapsed. Returns `None` when nothing is due.
    pub fn poll(&mut self, now: Instant) -> Result<Option<KeyAnnouncement>, CryptoError> {
        Ok(self
            .prepare(now)?
            .map(|prepared| self.commit(prepared, now)))
    }
}

impl std::fmt::Debug for TxKeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxKeyManager")
            .field("state", &self.state())
            .field("epoch", &self.active.epoch())
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

/// Outcome of a KEY packet on the receive side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUpdate {
    /// A new key was installed.
    Installed {
        /// Epoch of the new key.
        epoch: u32,
    },
    /// Re-announcement of the active key.
    Unchanged,
}

/// Receiver-side key manager.
///
/// Shared by reference across all receive paths.
#[derive(Debug)]
pub struct RxKeyManager {
    keys: LinkKeys,
    active: SharedSessionKey,
}

impl RxKeyManager {
    /// Create a manager with no key installed.
    pub fn new(keys: LinkKeys) -> Self {
        Self {
            keys,
            active: SharedSessionKey::new(),
        }
    }

    /// Snapshot of the active key.
    pub fn active_key(&self) -> Option<Arc<ActiveKey>> {
        self.active.load()
    }

    /// Epoch of the active key, 0 before the first install.
    pub fn epoch(&self) -> u32 {
        self.active.epoch()
    }

    /// Open a KEY packet and install its key if it is new.
    ///
    /// # Errors
    /// The message did not open under our keys; the active key is kept.
    pub fn handle_key_message(
        &self,
        message: &SessionKeyMessage,
        now: Instant,
    ) -> Result<KeyUpdate, CryptoError> {
        let key = open_session_key(&self.keys, message)?;
        match self.active.install_if_new(key, now) {
            Some(active) => {
                info!(epoch = active.epoch(), "session key installed");
                Ok(KeyUpdate::Installed {
                    epoch: active.epoch(),
                })
            }
            None => Ok(KeyUpdate::Unchanged),
        }
    }

    /// Decode a DATA packet under the active key.
    pub fn decode(&self, wire: &[u8]) -> Result<(DataFragment, u32), LinkError> {
        let active = self.active.load().ok_or(LinkError::NoSessionKey)?;
        let fragment = decode(active.key(), wire)?;
        Ok((fragment, active.epoch()))
    }
}
