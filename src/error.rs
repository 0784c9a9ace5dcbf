//! # Error Handling
//!
//! Error taxonomy for the group keys ratchet. Every fallible public entry
//! point returns `Result<T>`; there is no retry or fallback built in, and a
//! failed `load_key_message` call leaves the keyring and pending state
//! untouched.

use thiserror::Error;

/// Result type alias for ratchet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the group keys ratchet.
#[derive(Error, Debug)]
pub enum Error {
    /// Identity material passed to `Ratchet::new` had the wrong length.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `rekey` was called on a participant without the group secret key.
    #[error("unable to issue a new group encryption key without the group's secret key")]
    AdminRequired,

    /// `load_key_message` was called before the group pubkey/verifier was set.
    #[error("group pubkey is not set; unable to load a key message")]
    GroupKeyMissing,

    /// The wire format was violated: a missing key, a wrong-length field, an
    /// invalid `+` value, a bad padding multiple, or a negative generation.
    #[error("malformed key message: {0}")]
    Malformed(String),

    /// The `~` signature did not verify under the group's Ed25519 pubkey.
    #[error("key message signature is invalid")]
    SignatureInvalid,

    /// AEAD decryption of the admin envelope failed.
    #[error("failed to decrypt admin key from key message")]
    DecryptFailure,

    /// A crypto primitive rejected its input (e.g. an invalid curve point).
    #[error("crypto failure: {0}")]
    CryptoFailure(String),
}
