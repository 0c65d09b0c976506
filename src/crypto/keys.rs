//! Long-term X25519 key material.
//!
//! Each endpoint holds its own static secret and the peer's public key. Both
//! are provisioned out of band as a 64-byte key file:
//!
//! ```text
//! [ own secret (32) | peer public (32) ]
//! ```
//!
//! [`LinkKeys::generate_pair`] produces the matching transmitter and receiver
//! files.

use std::fs;
use std::path::Path;

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::core::{CryptoError, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE};

/// Key file size.
pub const KEY_FILE_SIZE: usize = SECRET_KEY_SIZE + PUBLIC_KEY_SIZE;

/// A static X25519 keypair for long-term identity.
///
/// The secret key is zeroized on drop.
#[derive(Clone)]
pub struct StaticKeypair {
    secret: [u8; SECRET_KEY_SIZE],
    public: [u8; PUBLIC_KEY_SIZE],
}

impl StaticKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        Self::from_secret(secret.to_bytes())
    }

    /// Rebuild a keypair from its secret half.
    pub fn from_secret(secret: [u8; SECRET_KEY_SIZE]) -> Self {
        let public = PublicKey::from(&StaticSecret::from(secret));
        Self {
            secret,
            public: public.to_bytes(),
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public
    }

    /// Get the secret key.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn secret_key(&self) -> &[u8; SECRET_KEY_SIZE] {
        &self.secret
    }

    /// Compute the static DH shared secret with a remote public key.
    ///
    /// Rejects non-contributory results (low-order peer points).
    pub fn diffie_hellman(
        &self,
        remote_public: &[u8; PUBLIC_KEY_SIZE],
    ) -> Result<[u8; 32], CryptoError> {
        let secret = StaticSecret::from(self.secret);
        let shared = secret.diffie_hellman(&PublicKey::from(*remote_public));
        if !shared.was_contributory() {
            return Err(CryptoError::KeyExchangeFailed);
        }
        Ok(*shared.as_bytes())
    }
}

impl Drop for StaticKeypair {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

/// One endpoint's long-term keys: own keypair plus the peer's public key.
#[derive(Clone)]
pub struct LinkKeys {
    local: StaticKeypair,
    peer_public: [u8; PUBLIC_KEY_SIZE],
}

impl LinkKeys {
    /// Assemble from a keypair and the peer's public key.
    pub fn new(local: StaticKeypair, peer_public: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self { local, peer_public }
    }

    /// Provision a matching `(transmitter, receiver)` pair.
    pub fn generate_pair() -> (Self, Self) {
        let tx = StaticKeypair::generate();
        let rx = StaticKeypair::generate();
        let tx_keys = Self::new(tx.clone(), *rx.public_key());
        let rx_keys = Self::new(rx, *tx.public_key());
        (tx_keys, rx_keys)
    }

    /// Our keypair.
    pub fn local(&self) -> &StaticKeypair {
        &self.local
    }

    /// The peer's public key.
    pub fn peer_public(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.peer_public
    }

    /// Parse the 64-byte key file layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_FILE_SIZE {
            return Err(CryptoError::InvalidKeyMaterial {
                expected: KEY_FILE_SIZE,
                actual: bytes.len(),
            });
        }

        let mut secret = [0u8; SECRET_KEY_SIZE];
        let mut peer_public = [0u8; PUBLIC_KEY_SIZE];
        secret.copy_from_slice(&bytes[..SECRET_KEY_SIZE]);
        peer_public.copy_from_slice(&bytes[SECRET_KEY_SIZE..]);

        let local = StaticKeypair::from_secret(secret);
        secret.zeroize();
        Ok(Self::new(local, peer_public))
    }

    /// Serialize to the 64-byte key file layout.
    ///
    /// # Security
    /// The result contains the secret key.
    pub fn to_bytes(&self) -> [u8; KEY_FILE_SIZE] {
        let mut buf = [0u8; KEY_FILE_SIZE];
        buf[..SECRET_KEY_SIZE].copy_from_slice(self.local.secret_key());
        buf[SECRET_KEY_SIZE..].copy_from_slice(&self.peer_public);
        buf
    }

    /// Read a key file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CryptoError> {
        let mut bytes = fs::read(path)?;
        let keys = Self::from_bytes(&bytes);
        bytes.zeroize();
        keys
    }

    /// Write a key file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CryptoError> {
        let mut bytes = self.to_bytes();
        let result = fs::write(path, bytes);
        bytes.zeroize();
        result.map_err(CryptoError::from)
    }
}

impl std::fmt::Debug for LinkKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkKeys")
            .field("public", self.local.public_key())
            .field("peer_public", &self.peer_public)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp1 = StaticKeypair::generate();
        let kp2 = StaticKeypair::generate();

        assert_ne!(kp1.public_key(), kp2.public_key());
        assert_ne!(kp1.secret_key(), kp2.secret_key());
    }

    #[test]
    fn test_public_derived_from_secret() {
        let kp = StaticKeypair::generate();
        let again = StaticKeypair::from_secret(*kp.secret_key());
        assert_eq!(kp.public_key(), again.public_key());
    }

    #[test]
    fn test_dh_agrees() {
        let a = StaticKeypair::generate();
        let b = StaticKeypair::generate();
        assert_eq!(
            a.diffie_hellman(b.public_key()).unwrap(),
            b.diffie_hellman(a.public_key()).unwrap()
        );
    }

    #[test]
    fn test_dh_rejects_low_order_point() {
        let a = StaticKeypair::generate();
        assert!(matches!(
            a.diffie_hellman(&[0u8; PUBLIC_KEY_SIZE]),
            Err(CryptoError::KeyExchangeFailed)
        ));
    }

    #[test]
    fn test_generate_pair_cross_references() {
        let (tx, rx) = LinkKeys::generate_pair();
        assert_eq!(tx.peer_public(), rx.local().public_key());
        assert_eq!(rx.peer_public(), tx.local().public_key());
    }

    #[test]
    fn test_key_file_bytes() {
        let (tx, _) = LinkKeys::generate_pair();
        let bytes = tx.to_bytes();
        assert_eq!(&bytes[..32], tx.local().secret_key());
        assert_eq!(&bytes[32..], tx.peer_public());

        let parsed = LinkKeys::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.local().public_key(), tx.local().public_key());

        assert!(matches!(
            LinkKeys::from_bytes(&bytes[..40]),
            Err(CryptoError::InvalidKeyMaterial { expected: 64, actual: 40 })
        ));
    }

    #[test]
    fn test_key_file_save_load() {
        let (tx, _) = LinkKeys::generate_pair();
        let path = std::env::temp_dir().join(format!("wfb-link-test-{}.key", std::process::id()));

        tx.save(&path).unwrap();
        let loaded = LinkKeys::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.to_bytes(), tx.to_bytes());
    }

    #[test]
    fn test_load_missing_file() {
        let result = LinkKeys::load("/nonexistent/wfb-link/none.key");
        assert!(matches!(result, Err(CryptoError::Io(_))));
    }
}
