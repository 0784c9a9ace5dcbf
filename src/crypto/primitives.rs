//! # Crypto Primitives Adapter
//!
//! A thin, uniform façade over the handful of primitives the ratchet needs:
//! Ed25519 keypairs, Ed25519→Curve25519 conversion, X25519 scalar
//! multiplication, keyed BLAKE2b, XChaCha20-Poly1305 AEAD, a deterministic
//! PRG, and constant-time zeroing. Nothing above this module touches a
//! crypto crate directly.
//!
//! ## Algorithm choices
//!
//! | Primitive | Crate | Notes |
//! |-----------|-------|-------|
//! | Signatures | `ed25519-dalek` | 64-byte sig, group identity key |
//! | Key exchange | `x25519-dalek` | contributory check catches low-order points |
//! | Ed25519 pk -> X25519 | `curve25519-dalek` | Edwards -> Montgomery |
//! | Ed25519 sk -> X25519 | `sha2` (SHA-512) + manual clamp | RFC 8032 §5.1.5 |
//! | Keyed hash | `blake2` | `Blake2bMac`, variable output (32/56 bytes) |
//! | AEAD | `chacha20poly1305` | XChaCha20-Poly1305, 24-byte nonce |
//! | Deterministic PRG | `rand_chacha` | seeded `ChaCha20Rng` |

use blake2::digest::consts::{U32, U56};
use blake2::digest::{Mac, Update};
use blake2::Blake2bMac;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key as XChaChaKey, XChaCha20Poly1305, XNonce};
use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha512};
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};

use crate::error::{Error, Result};

/// Convert an Ed25519 public key to its X25519 (Montgomery-form) equivalent.
///
/// Fails with [`Error::CryptoFailure`] when `pk` does not decompress to a
/// valid point on the Edwards curve.
pub fn ed25519_pk_to_x25519(pk: &[u8; 32]) -> Result<[u8; 32]> {
    let point = CompressedEdwardsY(*pk)
        .decompress()
        .ok_or_else(|| Error::CryptoFailure("invalid ed25519 public key point".into()))?;
    Ok(point.to_montgomery().to_bytes())
}

/// Convert an Ed25519 expanded secret key (64 bytes: seed ‖ pubkey) to its
/// X25519 scalar, per RFC 8032 §5.1.5: hash the 32-byte seed with SHA-512
/// and clamp the first 32 bytes of the digest.
pub fn ed25519_sk_to_x25519(sk: &[u8; 64]) -> [u8; 32] {
    let digest = Sha512::digest(&sk[0..32]);
    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&digest[0..32]);
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
    scalar
}

/// X25519 scalar multiplication. Fails with [`Error::CryptoFailure`] when
/// the result is non-contributory (the classic low-order-point attack).
pub fn x25519_scalarmult(xsk: &[u8; 32], xpk: &[u8; 32]) -> Result<[u8; 32]> {
    let secret = StaticSecret::from(*xsk);
    let public = XPublicKey::from(*xpk);
    let shared = secret.diffie_hellman(&public);
    if !shared.was_contributory() {
        return Err(Error::CryptoFailure(
            "x25519 scalarmult produced a non-contributory (low-order) result".into(),
        ));
    }
    Ok(*shared.as_bytes())
}

/// Variable-output keyed BLAKE2b, supporting the two output lengths this
/// system uses (32 and 56 bytes). Construct with [`KeyedHash::new`], feed it
/// input with [`KeyedHash::update`], and consume it with
/// [`KeyedHash::finalize`].
pub enum KeyedHash {
    Out32(Box<Blake2bMac<U32>>),
    Out56(Box<Blake2bMac<U56>>),
}

impl KeyedHash {
    /// Start a new keyed hash. `out_len` must be 32 or 56.
    pub fn new(key: &[u8], out_len: usize) -> Result<Self> {
        match out_len {
            32 => Blake2bMac::<U32>::new_from_slice(key)
                .map(|m| KeyedHash::Out32(Box::new(m)))
                .map_err(|_| Error::CryptoFailure("invalid blake2b key length".into())),
            56 => Blake2bMac::<U56>::new_from_slice(key)
                .map(|m| KeyedHash::Out56(Box::new(m)))
                .map_err(|_| Error::CryptoFailure("invalid blake2b key length".into())),
            n => Err(Error::CryptoFailure(format!(
                "unsupported blake2b output length {n}"
            ))),
        }
    }

    /// Absorb more input bytes.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            KeyedHash::Out32(m) => Update::update(m.as_mut(), data),
            KeyedHash::Out56(m) => Update::update(m.as_mut(), data),
        }
    }

    /// Consume the hash, returning the output bytes.
    pub fn finalize(self) -> Vec<u8> {
        match self {
            KeyedHash::Out32(m) => m.finalize().into_bytes().to_vec(),
            KeyedHash::Out56(m) => m.finalize().into_bytes().to_vec(),
        }
    }
}

/// One-shot keyed BLAKE2b over a single input slice.
pub fn blake2b_keyed(key: &[u8], out_len: usize, data: &[u8]) -> Result<Vec<u8>> {
    let mut h = KeyedHash::new(key, out_len)?;
    h.update(data);
    Ok(h.finalize())
}

/// XChaCha20-Poly1305 encryption. Returns ciphertext ‖ 16-byte tag.
pub fn aead_encrypt(key: &[u8; 32], nonce: &[u8; 24], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(XChaChaKey::from_slice(key));
    cipher
        .encrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|_| Error::CryptoFailure("aead encryption failed".into()))
}

/// XChaCha20-Poly1305 decryption.
pub fn aead_decrypt(key: &[u8; 32], nonce: &[u8; 24], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(XChaChaKey::from_slice(key));
    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: b"",
            },
        )
        .map_err(|_| Error::DecryptFailure)
}

/// Deterministically expand a 32-byte seed into `n` pseudo-random bytes.
pub fn deterministic_random(seed: &[u8; 32], n: usize) -> Vec<u8> {
    let mut rng = ChaCha20Rng::from_seed(*seed);
    let mut out = vec![0u8; n];
    rng.fill_bytes(&mut out);
    out
}

/// Sign `msg` with a group Ed25519 expanded secret key (64 bytes: seed ‖ pubkey).
pub fn sign(group_sk: &[u8; 64], msg: &[u8]) -> Result<[u8; 64]> {
    let seed: [u8; 32] = group_sk[0..32]
        .try_into()
        .map_err(|_| Error::CryptoFailure("invalid signing key".into()))?;
    let signing_key = SigningKey::from_bytes(&seed);
    Ok(signing_key.sign(msg).to_bytes())
}

/// Verify a 64-byte Ed25519 signature over `msg` under `group_pk`.
pub fn verify(group_pk: &[u8; 32], msg: &[u8], sig: &[u8; 64]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(group_pk) else {
        return false;
    };
    let signature = Signature::from_bytes(sig);
    verifying_key.verify(msg, &signature).is_ok()
}
