//! Session key sealing.
//!
//! A session key travels inside a KEY packet, sealed from the transmitter's
//! long-term keypair to the receiver's:
//!
//! ```text
//! shared  = X25519(own secret, peer public)
//! wrap    = HKDF-SHA256(
//!     ikm  = shared,
//!     salt = exchange nonce (24),
//!     info = "wfb-link v1 session key" || sender public || receiver public,
//! )
//! sealed  = XChaCha20-Poly1305(wrap, exchange nonce, session key)
//! ```
//!
//! Binding both public keys into `info` means a message sealed for one
//! receiver does not open under any other keypair, even one sharing the
//! transmitter.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use zeroize::Zeroize;

use super::aead::SessionKey;
use super::keys::LinkKeys;
use crate::core::{CryptoError, KEY_EXCHANGE_NONCE_SIZE, PUBLIC_KEY_SIZE, SESSION_KEY_SIZE};
use crate::frame::{SEALED_KEY_SIZE, SessionKeyMessage};

/// HKDF info label for the key-wrapping key.
const SEAL_LABEL: &[u8] = b"wfb-link v1 session key";

/// Derive the wrapping key for one exchange nonce.
fn derive_wrap_key(
    keys: &LinkKeys,
    sender_public: &[u8; PUBLIC_KEY_SIZE],
    receiver_public: &[u8; PUBLIC_KEY_SIZE],
    nonce: &[u8; KEY_EXCHANGE_NONCE_SIZE],
) -> Result<[u8; 32], CryptoError> {
    let mut shared = keys.local().diffie_hellman(keys.peer_public())?;

    let mut info = Vec::with_capacity(SEAL_LABEL.len() + 2 * PUBLIC_KEY_SIZE);
    info.extend_from_slice(SEAL_LABEL);
    info.extend_from_slice(sender_public);
    info.extend_from_slice(receiver_public);

    let hk = Hkdf::<Sha256>::new(Some(nonce.as_slice()), &shared);
    let mut wrap_key = [0u8; 32];
    let result = hk
        .expand(&info, &mut wrap_key)
        .map_err(|_| CryptoError::KeyDerivationFailed);
    shared.zeroize();
    result?;

    Ok(wrap_key)
}

/// Seal a session key for the peer named in `keys`.
pub fn seal_session_key(
    keys: &LinkKeys,
    session_key: &SessionKey,
) -> Result<SessionKeyMessage, CryptoError> {
    let mut nonce = [0u8; KEY_EXCHANGE_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let mut wrap_key = derive_wrap_key(
        keys,
        keys.local().public_key(),
        keys.peer_public(),
        &nonce,
    )?;
    let cipher = XChaCha20Poly1305::new((&wrap_key).into());
    wrap_key.zeroize();

    let sealed = cipher
        .encrypt(XNonce::from_slice(&nonce), session_key.as_bytes().as_slice())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let sealed_key: [u8; SEALED_KEY_SIZE] =
        sealed
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyMaterial {
                expected: SEALED_KEY_SIZE,
                actual: sealed.len(),
            })?;

    Ok(SessionKeyMessage { nonce, sealed_key })
}

/// Open a session key sealed by the peer named in `keys`.
///
/// Fails with [`CryptoError::DecryptionFailed`] when the message was sealed
/// for a different keypair or has been corrupted.
pub fn open_session_key(
    keys: &LinkKeys,
    message: &SessionKeyMessage,
) -> Result<SessionKey, CryptoError> {
    let mut wrap_key = derive_wrap_key(
        keys,
        keys.peer_public(),
        keys.local().public_key(),
        &message.nonce,
    )?;
    let cipher = XChaCha20Poly1305::new((&wrap_key).into());
    wrap_key.zeroize();

    let mut opened = cipher
        .decrypt(
            XNonce::from_slice(&message.nonce),
            message.sealed_key.as_slice(),
        )
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let mut key = [0u8; SESSION_KEY_SIZE];
    key.copy_from_slice(&opened);
    opened.zeroize();

    Ok(SessionKey::from_bytes(key))
}
