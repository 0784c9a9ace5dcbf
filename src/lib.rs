//! # Group Keys Ratchet
//!
//! The component that issues, distributes, decrypts, and retires symmetric
//! encryption keys for a closed, admin-managed messaging group.
//!
//! ## Module layout
//!
//! - [`crypto`] — a thin façade over Ed25519/X25519, keyed BLAKE2b,
//!   XChaCha20-Poly1305, and a deterministic PRG. Nothing above this module
//!   touches a crypto crate directly.
//! - [`bencode`] — a canonical, sorted-key bencoded dict codec: the wire
//!   format for key messages.
//! - [`keyring`] — the ordered, deduplicated history of group keys, with
//!   generation-based expiry.
//! - [`members`] — the `MemberList` seam for iterating group membership.
//! - [`sibling`] — the `ReplaceableKeys` seam by which the ratchet hands
//!   new keys to the group's Info and Members configs.
//! - [`ratchet`] — `Ratchet`, the public entry point: `rekey` and
//!   `load_key_message`.
//! - [`error`] — the crate's error taxonomy.
//!
//! ## Data flow
//!
//! An admin calls [`ratchet::Ratchet::rekey`]; the resulting message is
//! published externally; every participant (including the issuing admin,
//! on echo) calls [`ratchet::Ratchet::load_key_message`], which inserts the
//! key into the keyring and re-keys the sibling configs.
//!
//! Out of scope: network transport, swarm selection, and the Info/Members
//! config objects themselves — this crate depends only on their
//! `replace_keys` contract (see [`sibling::ReplaceableKeys`]).

pub mod bencode;
pub mod crypto;
pub mod error;
pub mod keyring;
pub mod members;
pub mod ratchet;
pub mod sibling;

pub use error::{Error, Result};
pub use keyring::{KeyInfo, Keyring};
pub use members::{GroupMember, MemberList, VecMemberList};
pub use ratchet::{Ratchet, KEY_EXPIRY_MS, MESSAGE_KEY_MULTIPLE};
pub use sibling::{RecordingKeys, ReplaceableKeys};
