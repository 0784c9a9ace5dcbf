//! # Rekey / Load Engine
//!
//! `Ratchet` is the public entry point for this crate: it owns one
//! participant's identity material, the keyring of group symmetric keys,
//! and any in-flight pending rekey. Two operations do all the work:
//! [`Ratchet::rekey`] (admin-only, issues a new generation) and
//! [`Ratchet::load_key_message`] (every participant, ingests one).

use crate::bencode::{DictConsumer, DictProducer};
use crate::crypto::{self, Secret};
use crate::error::{Error, Result};
use crate::keyring::{KeyInfo, Keyring};
use crate::members::MemberList;
use crate::sibling::ReplaceableKeys;

/// Padding block size for the encrypted-member-keys list (§4.4 junk padding).
pub const MESSAGE_KEY_MULTIPLE: usize = 75;

/// Retention window for a retired generation, in milliseconds (60 days).
pub const KEY_EXPIRY_MS: i64 = 60 * 24 * 60 * 60 * 1000;

const SEED_HASH_KEY: &[u8] = b"SessionGroupKeySeed";
const GEN_HASH_KEY: &[u8] = b"SessionGroupKeyGen";
const ADMIN_HASH_KEY: &[u8] = b"SessionGroupKeyAdminKey";
const MEMBER_HASH_KEY: &[u8] = b"SessionGroupKeyMemberKey";
const JUNK_HASH_KEY: &[u8] = b"SessionGroupJunkMembers";

const AEAD_ENVELOPE_LEN: usize = 32 + 16; // key + AEAD tag
const SIG_LEN: usize = 64;
const NONCE_LEN: usize = 24;

/// Decode a Session ID (`"05" ‖ 64 hex chars`) into its 32-byte X25519
/// public key, stripping the version prefix.
pub fn session_id_to_xpk(session_id: &str) -> Result<[u8; 32]> {
    if session_id.len() != 66 || !session_id.starts_with("05") {
        return Err(Error::Malformed(format!(
            "invalid session id {session_id:?}: expected 66 hex chars with a 05 prefix"
        )));
    }
    let raw = hex::decode(&session_id[2..])
        .map_err(|e| Error::Malformed(format!("invalid session id hex: {e}")))?;
    raw.try_into()
        .map_err(|_| Error::Malformed("session id did not decode to 32 bytes".into()))
}

/// A group's symmetric-key ratchet, from one participant's point of view.
///
/// Owns this participant's identity material, the append-only [`Keyring`]
/// of group keys, and any outstanding pending rekey. Not `Clone`: identity
/// material is meant to live in exactly one place.
pub struct Ratchet {
    user_ed25519_sk: Secret<64>,
    group_ed25519_pk: [u8; 32],
    group_ed25519_sk: Option<Secret<64>>,
    keyring: Keyring,
    pending_generation: i64,
    pending_key: Option<Secret<32>>,
    pending_message: Vec<u8>,
}

impl Ratchet {
    /// Construct a ratchet for one participant.
    ///
    /// `dump` is accepted for interface parity with restoring a previously
    /// serialized ratchet state, but is currently unused: this constructor
    /// always starts with an empty keyring and no pending rekey, whatever
    /// `dump` contains.
    pub fn new(
        user_ed25519_sk: &[u8],
        group_ed25519_pk: &[u8],
        group_ed25519_sk: Option<&[u8]>,
        _dump: Option<&[u8]>,
    ) -> Result<Self> {
        let user_ed25519_sk: [u8; 64] = user_ed25519_sk.try_into().map_err(|_| {
            Error::InvalidArgument("user ed25519 secret key must be 64 bytes".into())
        })?;
        let group_ed25519_pk: [u8; 32] = group_ed25519_pk.try_into().map_err(|_| {
            Error::InvalidArgument("group ed25519 public key must be 32 bytes".into())
        })?;
        let group_ed25519_sk = group_ed25519_sk
            .map(|sk| {
                let arr: [u8; 64] = sk.try_into().map_err(|_| {
                    Error::InvalidArgument("group ed25519 secret key must be 64 bytes".into())
                })?;
                Ok::<_, Error>(Secret::new(arr))
            })
            .transpose()?;

        tracing::debug!(
            is_admin = group_ed25519_sk.is_some(),
            "constructed group key ratchet"
        );

        Ok(Self {
            user_ed25519_sk: Secret::new(user_ed25519_sk),
            group_ed25519_pk,
            group_ed25519_sk,
            keyring: Keyring::new(),
            pending_generation: 0,
            pending_key: None,
            pending_message: Vec::new(),
        })
    }

    fn group_xpk(&self) -> Result<[u8; 32]> {
        crypto::ed25519_pk_to_x25519(&self.group_ed25519_pk)
    }

    /// Blake2bKeyed(key, 32) over `data`, returned as a fixed-size array.
    fn hash32(key: &[u8], data: &[u8]) -> Result<[u8; 32]> {
        let out = crypto::blake2b_keyed(key, 32, data)?;
        out.try_into()
            .map_err(|_| Error::CryptoFailure("blake2b did not return 32 bytes".into()))
    }

    /// The admin AEAD key: Blake2bKeyed("SessionGroupKeyAdminKey", 32) over
    /// the seed half (first 32 bytes) of the group's expanded secret key.
    fn admin_key(group_sk: &Secret<64>) -> Result<[u8; 32]> {
        Self::hash32(ADMIN_HASH_KEY, &group_sk.as_bytes()[0..32])
    }

    /// Issue the next generation's group key: derive it, encrypt it for
    /// every admin and member, assemble and sign the bencoded key message,
    /// and dirty-notify `members`/`info`. Admin-only.
    pub fn rekey<M: MemberList + ReplaceableKeys>(
        &mut self,
        info: &mut dyn ReplaceableKeys,
        members: &mut M,
    ) -> Result<&[u8]> {
        let group_sk = self
            .group_ed25519_sk
            .as_ref()
            .ok_or(Error::AdminRequired)?
            .clone();

        let group_xpk = self.group_xpk()?;
        let group_xsk = crypto::ed25519_sk_to_x25519(group_sk.as_bytes());

        let generation = self.keyring.back().map(|k| k.generation + 1).unwrap_or(0);

        let h2 = Self::hash32(SEED_HASH_KEY, &group_sk.as_bytes()[0..32])?;

        let mut h1 = crypto::KeyedHash::new(GEN_HASH_KEY, 56)?;
        for m in members.iter() {
            h1.update(m.session_id.as_bytes());
        }
        h1.update(generation.to_string().as_bytes());
        h1.update(&h2);
        let h1 = h1.finalize();

        let mut new_key = [0u8; 32];
        new_key.copy_from_slice(&h1[0..32]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&h1[32..56]);

        let admin_k = Self::admin_key(&group_sk)?;
        let admin_envelope = crypto::aead_encrypt(&admin_k, &nonce, &new_key)?;
        debug_assert_eq!(admin_envelope.len(), AEAD_ENVELOPE_LEN);

        let mut member_entries: Vec<Vec<u8>> = Vec::new();
        for m in members.iter() {
            let m_xpk = session_id_to_xpk(&m.session_id)?;
            let shared = match crypto::x25519_scalarmult(&group_xsk, &m_xpk) {
                Ok(shared) => shared,
                Err(_) => continue, // low-order point: skip this member
            };
            let mut mh = crypto::KeyedHash::new(MEMBER_HASH_KEY, 32)?;
            mh.update(&shared);
            mh.update(&group_xpk);
            mh.update(&m_xpk);
            let member_k: [u8; 32] = mh
                .finalize()
                .try_into()
                .map_err(|_| Error::CryptoFailure("blake2b did not return 32 bytes".into()))?;
            let envelope = crypto::aead_encrypt(&member_k, &nonce, &new_key)?;
            member_entries.push(envelope);
        }
        let member_count = member_entries.len();

        if member_count % MESSAGE_KEY_MULTIPLE != 0 {
            let n_junk = MESSAGE_KEY_MULTIPLE - (member_count % MESSAGE_KEY_MULTIPLE);
            let mut seed_input = Vec::with_capacity(h1.len() + 64);
            seed_input.extend_from_slice(&h1);
            seed_input.extend_from_slice(group_sk.as_bytes());
            let junk_seed = Self::hash32(JUNK_HASH_KEY, &seed_input)?;
            let junk = crypto::deterministic_random(&junk_seed, AEAD_ENVELOPE_LEN * n_junk);
            for chunk in junk.chunks(AEAD_ENVELOPE_LEN) {
                member_entries.push(chunk.to_vec());
            }
        }

        let mut producer = DictProducer::new();
        producer.append_str(b"#", &nonce)?;
        producer.append_int(b"G", generation)?;
        producer.append_str(b"K", &admin_envelope)?;
        let entry_refs: Vec<&[u8]> = member_entries.iter().map(Vec::as_slice).collect();
        producer.append_list_str(b"k", &entry_refs)?;
        let to_sign = producer.signing_bytes().to_vec();
        let sig = crypto::sign(group_sk.as_bytes(), &to_sign)?;
        producer.append_str(b"~", &sig)?;
        let message = producer.finalize();

        tracing::debug!(
            generation,
            member_count,
            junk_count = member_entries.len() - member_count,
            "issued new group key"
        );

        self.pending_generation = generation;
        self.pending_key = Some(Secret::new(new_key));
        self.pending_message = message;

        let new_keys = self.group_keys();
        members.replace_keys(&new_keys, true);
        info.replace_keys(&new_keys, true);

        Ok(&self.pending_message)
    }

    /// A view of the outgoing key message from the most recent `rekey`
    /// call, if its echo hasn't been observed via `load_key_message` yet.
    pub fn pending_config(&self) -> Option<&[u8]> {
        if self.pending_message.is_empty() {
            None
        } else {
            Some(&self.pending_message)
        }
    }

    /// The symmetric key from the most recent `rekey` call, if its echo
    /// hasn't been observed yet.
    pub fn pending_key(&self) -> Option<[u8; 32]> {
        if self.pending_message.is_empty() {
            None
        } else {
            self.pending_key.as_ref().map(|k| k.to_bytes())
        }
    }

    /// Parse, verify, and decrypt an incoming key message, inserting the
    /// extracted key into the keyring on success.
    ///
    /// Atomic: on any error the keyring and pending state are unchanged,
    /// since every fallible step runs before any mutation.
    pub fn load_key_message(
        &mut self,
        data: &[u8],
        _msgid: &str,
        timestamp_ms: i64,
        members: &mut dyn ReplaceableKeys,
        info: &mut dyn ReplaceableKeys,
    ) -> Result<()> {
        match self.try_load_key_message(data, timestamp_ms) {
            Ok((key_info, found)) => {
                let mut inserted = false;
                if found {
                    inserted = self.keyring.insert(key_info.clone());
                    if inserted {
                        self.keyring.remove_expired(KEY_EXPIRY_MS);
                    }
                }

                if !self.pending_message.is_empty() {
                    let echoes_pending = self
                        .pending_key
                        .as_ref()
                        .is_some_and(|k| k.as_bytes() == key_info.key.as_bytes());
                    if key_info.generation > self.pending_generation || echoes_pending {
                        self.pending_generation = 0;
                        self.pending_key = None;
                        self.pending_message.clear();
                    }
                }

                tracing::debug!(
                    generation = key_info.generation,
                    found,
                    inserted,
                    "loaded group key message"
                );

                let new_keys = self.group_keys();
                members.replace_keys(&new_keys, false);
                info.replace_keys(&new_keys, false);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "rejected group key message");
                Err(err)
            }
        }
    }

    /// All the fallible parsing/crypto/signature work for
    /// `load_key_message`, kept side-effect free so a rejected message
    /// never touches the keyring or pending state. Returns the decoded
    /// `KeyInfo` plus whether a key was actually recovered from it.
    fn try_load_key_message(&self, data: &[u8], timestamp_ms: i64) -> Result<(KeyInfo, bool)> {
        let group_xpk = self.group_xpk()?;
        let mut consumer = DictConsumer::new(data)?;

        let nonce_bytes = consumer.read_str(b"#")?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| Error::Malformed("key message nonce must be 24 bytes".into()))?;

        let supplemental = match consumer.read_opt_int(b"+")? {
            None | Some(0) => false,
            Some(1) => true,
            Some(other) => {
                return Err(Error::Malformed(format!(
                    "unexpected value {other} for '+' key (expected 0/1)"
                )))
            }
        };

        let generation = consumer.read_int(b"G")?;
        if generation < 0 {
            return Err(Error::Malformed("key message has a negative generation".into()));
        }

        let mut key_bytes: Option<[u8; 32]> = None;

        if !supplemental {
            let admin_env = consumer.read_str(b"K")?;
            if admin_env.len() != AEAD_ENVELOPE_LEN {
                return Err(Error::Malformed(format!(
                    "admin key envelope must be {AEAD_ENVELOPE_LEN} bytes, got {}",
                    admin_env.len()
                )));
            }
            if let Some(group_sk) = &self.group_ed25519_sk {
                let admin_k = Self::admin_key(group_sk)?;
                let plaintext = crypto::aead_decrypt(&admin_k, &nonce, &admin_env)
                    .map_err(|_| Error::DecryptFailure)?;
                let arr: [u8; 32] = plaintext.try_into().map_err(|_| Error::DecryptFailure)?;
                key_bytes = Some(arr);
            }
        }

        let dec_k: Option<[u8; 32]> = if key_bytes.is_none() {
            let user_xsk = crypto::ed25519_sk_to_x25519(self.user_ed25519_sk.as_bytes());
            let user_pk_half: [u8; 32] = self.user_ed25519_sk.as_bytes()[32..64]
                .try_into()
                .expect("slice is exactly 32 bytes");
            let user_xpk = crypto::ed25519_pk_to_x25519(&user_pk_half)?;
            let shared = crypto::x25519_scalarmult(&user_xsk, &group_xpk)?;
            let mut mh = crypto::KeyedHash::new(MEMBER_HASH_KEY, 32)?;
            mh.update(&shared);
            mh.update(&group_xpk);
            mh.update(&user_xpk);
            Some(
                mh.finalize()
                    .try_into()
                    .map_err(|_| Error::CryptoFailure("blake2b did not return 32 bytes".into()))?,
            )
        } else {
            None
        };

        // Scan every entry unconditionally, even once a key has already been
        // found, so malformed lists are rejected identically for admins and
        // members (see the open question on iteration cost in DESIGN.md).
        let entries = consumer.read_list_str(b"k")?;
        let n_entries = entries.len();
        for entry in &entries {
            if entry.len() != AEAD_ENVELOPE_LEN {
                return Err(Error::Malformed(format!(
                    "member key envelope must be {AEAD_ENVELOPE_LEN} bytes, got {}",
                    entry.len()
                )));
            }
            if key_bytes.is_none() {
                if let Some(dec_k) = &dec_k {
                    if let Ok(plaintext) = crypto::aead_decrypt(dec_k, &nonce, entry) {
                        if let Ok(arr) = <[u8; 32]>::try_from(plaintext) {
                            key_bytes = Some(arr);
                        }
                    }
                }
            }
        }

        if !supplemental && n_entries % MESSAGE_KEY_MULTIPLE != 0 {
            return Err(Error::Malformed(
                "member key list has the wrong size (missing junk padding?)".into(),
            ));
        }

        let signed_prefix = consumer.signed_prefix(b"~")?.to_vec();
        let sig_bytes = consumer.read_str(b"~")?;
        let sig: [u8; SIG_LEN] = sig_bytes
            .try_into()
            .map_err(|_| Error::Malformed("signature must be 64 bytes".into()))?;
        if !crypto::verify(&self.group_ed25519_pk, &signed_prefix, &sig) {
            return Err(Error::SignatureInvalid);
        }

        let found = key_bytes.is_some();
        let key_info = KeyInfo::new(generation, key_bytes.unwrap_or([0u8; 32]), timestamp_ms);
        Ok((key_info, found))
    }

    /// `true` iff two admins appear to have rekeyed concurrently: this
    /// participant is an admin and the keyring's two newest entries share
    /// a generation.
    pub fn needs_rekey(&self) -> bool {
        self.group_ed25519_sk.is_some() && self.keyring.has_generation_collision()
    }

    /// The current group keys, newest generation first — the order a
    /// caller should try them in when decrypting a sibling config.
    ///
    /// The `pending_message.is_empty()` branch below is vestigial: this
    /// crate always clears `pending_key` and `pending_message` together
    /// (see `load_key_message`), so it can never fire through the public
    /// API. It's kept for interface parity with callers that might inject
    /// a pending key without going through `rekey`.
    pub fn group_keys(&self) -> Vec<[u8; 32]> {
        let mut out = Vec::with_capacity(self.keyring.len() + 1);
        if self.pending_message.is_empty() {
            if let Some(k) = &self.pending_key {
                out.push(k.to_bytes());
            }
        }
        out.extend(self.keyring.iter_newest_first().map(|e| e.key.to_bytes()));
        out
    }
}
