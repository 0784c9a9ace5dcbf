//! # Cryptography
//!
//! The crypto surface used by the ratchet: a zero-on-drop [`secret::Secret`]
//! wrapper for key material, and the [`primitives`] adapter over the
//! underlying curve/AEAD/hash crates.

pub mod primitives;
pub mod secret;

pub use primitives::{
    aead_decrypt, aead_encrypt, blake2b_keyed, deterministic_random, ed25519_pk_to_x25519,
    ed25519_sk_to_x25519, sign, verify, x25519_scalarmult, KeyedHash,
};
pub use secret::{zeroize_vec, Secret};
