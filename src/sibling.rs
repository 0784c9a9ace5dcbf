//! # Sibling-Config Bridge
//!
//! The keyring never owns a reference to the group's Info or Members
//! configs; it only knows the narrow `replace_keys` contract they expose.
//! `ReplaceableKeys` is that seam. The real Info/Members implementations
//! live in sibling crates and are passed into [`crate::ratchet::Ratchet`]
//! per-call, never stored.

/// Something that can be handed the current, newest-first list of group
/// symmetric keys whenever the keyring mutates.
///
/// `dirty` distinguishes a push-worthy change (`rekey`, which produces a
/// key nobody else has seen yet) from a silent acceptance (`load_key_message`,
/// which is just catching this participant up to a key that already
/// exists). The ratchet never inspects the return value.
pub trait ReplaceableKeys {
    fn replace_keys(&mut self, keys: &[[u8; 32]], dirty: bool);
}

/// A recording test double: stores the most recent call's arguments instead
/// of doing anything with them. Used by the scenario suite in place of the
/// real Info/Members configs, which live outside this crate.
#[derive(Default)]
pub struct RecordingKeys {
    pub calls: Vec<(Vec<[u8; 32]>, bool)>,
}

impl RecordingKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&(Vec<[u8; 32]>, bool)> {
        self.calls.last()
    }
}

impl ReplaceableKeys for RecordingKeys {
    fn replace_keys(&mut self, keys: &[[u8; 32]], dirty: bool) {
        self.calls.push((keys.to_vec(), dirty));
    }
}
