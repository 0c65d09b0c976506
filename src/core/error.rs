//! Error types for the link core.
//!
//! Every per-fragment error is local: the fragment is dropped and the next
//! captured frame is processed. Nothing here is meant to end the process.

use thiserror::Error;

/// Errors raised while building or parsing link frames.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Header too short to hold its fixed layout.
    #[error("malformed {context}: expected at least {expected} bytes, got {actual}")]
    MalformedHeader {
        /// Which header failed.
        context: &'static str,
        /// Minimum size required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Block header carries neither DATA nor KEY.
    #[error("unknown packet type: 0x{0:02x}")]
    UnknownPacketType(u8),

    /// A valid packet type handed to the wrong decode path.
    #[error("unexpected packet type: 0x{0:02x}")]
    UnexpectedPacketType(u8),

    /// AEAD tag mismatch: wrong key, corruption, or a superseded key.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// Encode-time payload above the frame budget.
    #[error("payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge {
        /// Requested payload size.
        size: usize,
        /// Budget for this frame.
        max: usize,
    },

    /// Authenticated plaintext declares more payload than it carries.
    #[error("payload length mismatch: header says {declared}, {available} bytes available")]
    PayloadLengthMismatch {
        /// Size from the data packet header.
        declared: usize,
        /// Bytes remaining after the header.
        available: usize,
    },

    /// No session key has been received yet.
    #[error("no session key installed")]
    NoSessionKey,

    /// Frame addressed to another logical stream.
    #[error("frame for foreign port {0}")]
    ForeignPort(u8),

    /// 802.11 frame not produced by a link transmitter.
    #[error("foreign 802.11 frame")]
    ForeignFrame,

    /// Radiotap header unusable.
    #[error("invalid radiotap header: {0}")]
    InvalidRadiotap(&'static str),

    /// Driver reported a bad frame check sequence.
    #[error("bad frame check sequence")]
    BadFcs,

    /// Receive interface index outside `0..MAX_RX_INTERFACES`.
    #[error("invalid receive interface {0}")]
    InvalidInterface(usize),

    /// Encode-side cipher failure.
    #[error("fragment encryption failed: {0}")]
    Crypto(#[source] CryptoError),

    /// Transport I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Whether the frame should simply be dropped.
    ///
    /// Covers everything radio capture produces under loss, corruption,
    /// foreign traffic and key rotation races.
    pub fn is_silent_drop(&self) -> bool {
        matches!(
            self,
            LinkError::MalformedHeader { .. }
                | LinkError::UnknownPacketType(_)
                | LinkError::UnexpectedPacketType(_)
                | LinkError::AuthenticationFailure
                | LinkError::PayloadLengthMismatch { .. }
                | LinkError::NoSessionKey
                | LinkError::ForeignPort(_)
                | LinkError::ForeignFrame
                | LinkError::InvalidRadiotap(_)
                | LinkError::BadFcs
        )
    }

    /// Whether the error points at the local caller rather than the radio.
    pub fn is_caller_bug(&self) -> bool {
        matches!(
            self,
            LinkError::PayloadTooLarge { .. } | LinkError::InvalidInterface(_)
        )
    }

    /// Whether the frame failed authentication or arrived without a key.
    pub fn is_decrypt_error(&self) -> bool {
        matches!(
            self,
            LinkError::AuthenticationFailure | LinkError::NoSessionKey
        )
    }
}

/// Errors in key management.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// Sealed session key did not open under our long-term keys.
    #[error("session key message failed to open")]
    DecryptionFailed,

    /// X25519 produced a non-contributory shared secret.
    #[error("key exchange produced a low-order shared secret")]
    KeyExchangeFailed,

    /// Key derivation failed.
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// Key material has the wrong size.
    #[error("invalid key material: expected {expected} bytes, got {actual}")]
    InvalidKeyMaterial {
        /// Expected size.
        expected: usize,
        /// Actual size.
        actual: usize,
    },

    /// Key file I/O.
    #[error("key file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("config i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML did not parse.
    #[error("config parse error: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Top-level errors.
#[derive(Debug, Error)]
pub enum WfbError {
    /// Link error.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_drop_errors() {
        assert!(LinkError::AuthenticationFailure.is_silent_drop());
        assert!(LinkError::UnknownPacketType(0x7f).is_silent_drop());
        assert!(LinkError::NoSessionKey.is_silent_drop());
        assert!(LinkError::BadFcs.is_silent_drop());
        assert!(
            LinkError::MalformedHeader {
                context: "block header",
                expected: 9,
                actual: 3
            }
            .is_silent_drop()
        );

        assert!(!LinkError::PayloadTooLarge { size: 2000, max: 1442 }.is_silent_drop());
        assert!(!LinkError::Crypto(CryptoError::EncryptionFailed).is_silent_drop());
        assert!(!LinkError::Io(std::io::Error::other("test")).is_silent_drop());
    }

    #[test]
    fn test_caller_bug_errors() {
        assert!(LinkError::PayloadTooLarge { size: 2000, max: 1442 }.is_caller_bug());
        assert!(LinkError::InvalidInterface(8).is_caller_bug());
        assert!(!LinkError::AuthenticationFailure.is_caller_bug());
    }

    #[test]
    fn test_decrypt_errors() {
        assert!(LinkError::AuthenticationFailure.is_decrypt_error());
        assert!(LinkError::NoSessionKey.is_decrypt_error());
        assert!(!LinkError::ForeignPort(3).is_decrypt_error());
        assert!(!LinkError::Crypto(CryptoError::EncryptionFailed).is_decrypt_error());
    }

    #[test]
    fn test_error_display() {
        let err = LinkError::PayloadTooLarge { size: 1500, max: 1442 };
        assert_eq!(err.to_string(), "payload too large: 1500 bytes (max: 1442)");

        let err: WfbError = LinkError::UnknownPacketType(0x09).into();
        assert_eq!(err.to_string(), "link error: unknown packet type: 0x09");

        let err = LinkError::Crypto(CryptoError::EncryptionFailed);
        assert_eq!(
            err.to_string(),
            "fragment encryption failed: AEAD encryption failed"
        );
    }
}
