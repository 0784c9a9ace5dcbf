//! # Member Iteration
//!
//! The ratchet needs a deterministic view of "the members of this group"
//! without owning their storage. `MemberList` is the seam; the real
//! member-list config lives in a sibling crate and implements it over its
//! own storage. This crate ships only an in-memory `Vec`-backed
//! implementation, used by tests and small deployments.

/// One group member, identified by their Session ID.
///
/// `session_id` is a 66-character lowercase hex string: a literal `"05"`
/// prefix followed by 64 hex characters decoding to a 32-byte X25519
/// public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupMember {
    pub session_id: String,
}

impl GroupMember {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    /// Decode this member's X25519 public key from their Session ID,
    /// stripping the `"05"` prefix.
    pub fn x25519_pubkey(&self) -> crate::error::Result<[u8; 32]> {
        crate::ratchet::session_id_to_xpk(&self.session_id)
    }
}

/// A read-only, ordered view over a group's membership. Implementations
/// define iteration order; honest admins rekeying concurrently must agree
/// on an order for `H1` (see the rekey algorithm) to be collision-free, but
/// the ratchet itself places no further requirement on it.
pub trait MemberList {
    fn iter(&self) -> Box<dyn Iterator<Item = &GroupMember> + '_>;
}

/// A simple `Vec`-backed membership list, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct VecMemberList {
    members: Vec<GroupMember>,
    /// The most recent `replace_keys` call observed, if this list has also
    /// been used as a `ReplaceableKeys` sink.
    last_replace_keys: Option<(Vec<[u8; 32]>, bool)>,
}

impl VecMemberList {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            last_replace_keys: None,
        }
    }

    pub fn push(&mut self, member: GroupMember) {
        self.members.push(member);
    }

    pub fn last_replace_keys(&self) -> Option<&(Vec<[u8; 32]>, bool)> {
        self.last_replace_keys.as_ref()
    }
}

impl FromIterator<GroupMember> for VecMemberList {
    fn from_iter<T: IntoIterator<Item = GroupMember>>(iter: T) -> Self {
        Self {
            members: iter.into_iter().collect(),
            last_replace_keys: None,
        }
    }
}

impl MemberList for VecMemberList {
    fn iter(&self) -> Box<dyn Iterator<Item = &GroupMember> + '_> {
        Box::new(self.members.iter())
    }
}

/// `VecMemberList` doubles as its own sibling-bridge test double: small
/// deployments and tests can use one value both to iterate membership in
/// `rekey` and to observe the `replace_keys` calls that follow.
impl crate::sibling::ReplaceableKeys for VecMemberList {
    fn replace_keys(&mut self, keys: &[[u8; 32]], dirty: bool) {
        self.last_replace_keys = Some((keys.to_vec(), dirty));
    }
}
