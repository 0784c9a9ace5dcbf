//! Zero-on-drop container for fixed-size secret byte buffers.
//!
//! Every key, shared secret, and PRG seed in this crate flows through
//! `Secret<N>` rather than a bare `[u8; N]`, so that zeroization never has
//! to be remembered at each call site.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A fixed-size buffer of secret bytes, zeroized when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Secret<const N: usize>([u8; N]);

impl<const N: usize> Secret<N> {
    /// Wrap raw bytes as a secret.
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Borrow the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Copy the underlying bytes out. Callers that do this are responsible
    /// for zeroizing the copy themselves.
    pub fn to_bytes(&self) -> [u8; N] {
        self.0
    }
}

impl<const N: usize> Default for Secret<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> PartialEq for Secret<N> {
    fn eq(&self, other: &Self) -> bool {
        // Not constant-time: equality here is used for ordering/dedup of
        // already-public key material (KeyInfo), not for comparing a secret
        // against attacker-controlled input.
        self.0 == other.0
    }
}

impl<const N: usize> Eq for Secret<N> {}

impl<const N: usize> PartialOrd for Secret<N> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<const N: usize> Ord for Secret<N> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<const N: usize> std::fmt::Debug for Secret<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret").field("bytes", &"***").finish()
    }
}

/// Zeroize a `Vec<u8>` in place; used for scratch buffers that can't be
/// fixed-size (e.g. the junk-padding PRG output).
pub fn zeroize_vec(buf: &mut Vec<u8>) {
    buf.zeroize();
}
