//! End-to-end scenarios exercised purely through the public `Ratchet` API,
//! each corresponding to one of the numbered rekey/load scenarios this crate
//! is expected to handle correctly.

use ed25519_dalek::SigningKey;
use groupkeys::{GroupMember, KEY_EXPIRY_MS, MESSAGE_KEY_MULTIPLE};
use groupkeys::{RecordingKeys, Ratchet, VecMemberList};

mod support {
    use super::*;

    /// A group's Ed25519 identity: secret key (libsodium's 64-byte expanded
    /// form) and public key.
    pub fn group_identity(seed: u8) -> ([u8; 64], [u8; 32]) {
        let signing_key = SigningKey::from_bytes(&[seed; 32]);
        let mut sk = [0u8; 64];
        sk[0..32].copy_from_slice(&signing_key.to_bytes());
        sk[32..64].copy_from_slice(signing_key.verifying_key().as_bytes());
        (sk, signing_key.verifying_key().to_bytes())
    }

    /// A member's Ed25519 identity plus the Session ID an admin would
    /// address them by (the X25519 conversion of their Ed25519 public key,
    /// "05"-prefixed).
    pub fn member_identity(seed: u8) -> ([u8; 64], GroupMember) {
        let signing_key = SigningKey::from_bytes(&[seed; 32]);
        let mut sk = [0u8; 64];
        sk[0..32].copy_from_slice(&signing_key.to_bytes());
        sk[32..64].copy_from_slice(signing_key.verifying_key().as_bytes());
        let xpk =
            groupkeys::crypto::ed25519_pk_to_x25519(&signing_key.verifying_key().to_bytes())
                .unwrap();
        let session_id = format!("05{}", hex::encode(xpk));
        (sk, GroupMember::new(session_id))
    }

    pub const T0: i64 = 1_700_000_000_000;
}

use support::*;

/// 1. First rekey, three members: the resulting message carries exactly
/// `MESSAGE_KEY_MULTIPLE` envelopes, and a non-recipient can't recover the
/// key from any of them.
#[test]
fn first_rekey_round_trips_for_every_member_and_excludes_outsiders() {
    let (group_sk, group_pk) = group_identity(1);
    let mut admin = Ratchet::new(&[7u8; 64], &group_pk, Some(&group_sk), None).unwrap();

    let (m1_sk, m1) = member_identity(1);
    let (m2_sk, m2) = member_identity(2);
    let (m3_sk, m3) = member_identity(3);
    let mut members = VecMemberList::new();
    members.push(m1);
    members.push(m2);
    members.push(m3);
    let mut info = RecordingKeys::new();

    let message = admin.rekey(&mut info, &mut members).unwrap().to_vec();
    let issued_key = admin.pending_key().unwrap();

    for member_sk in [&m1_sk, &m2_sk, &m3_sk] {
        let mut ratchet = Ratchet::new(member_sk, &group_pk, None, None).unwrap();
        let mut sink_m = VecMemberList::new();
        let mut sink_i = RecordingKeys::new();
        ratchet
            .load_key_message(&message, "m1", T0, &mut sink_m, &mut sink_i)
            .unwrap();
        assert_eq!(ratchet.group_keys(), vec![issued_key]);
    }

    // A fourth identity, never added as a member, must not decrypt anything.
    let (outsider_sk, _) = member_identity(4);
    let mut outsider = Ratchet::new(&outsider_sk, &group_pk, None, None).unwrap();
    let mut sink_m = VecMemberList::new();
    let mut sink_i = RecordingKeys::new();
    outsider
        .load_key_message(&message, "m1", T0, &mut sink_m, &mut sink_i)
        .unwrap();
    assert!(outsider.group_keys().is_empty());
}

/// 2. Admin echo clears pending: after the admin observes its own rekey
/// message come back through `load_key_message`, `pending_config`/
/// `pending_key` are both cleared.
#[test]
fn admin_echo_of_its_own_rekey_clears_pending_state() {
    let (group_sk, group_pk) = group_identity(10);
    let mut admin = Ratchet::new(&[8u8; 64], &group_pk, Some(&group_sk), None).unwrap();
    let mut members = VecMemberList::new();
    let mut info = RecordingKeys::new();

    let message = admin.rekey(&mut info, &mut members).unwrap().to_vec();
    assert!(admin.pending_config().is_some());
    assert!(admin.pending_key().is_some());

    let mut sink_m = VecMemberList::new();
    let mut sink_i = RecordingKeys::new();
    admin
        .load_key_message(&message, "m1", T0, &mut sink_m, &mut sink_i)
        .unwrap();

    assert!(admin.pending_config().is_none());
    assert!(admin.pending_key().is_none());
    assert_eq!(admin.group_keys().len(), 1);
}

/// 3. A later generation supersedes a pending one: admin `a` issues a rekey
/// that never gets echoed back to it, but a later generation from admin `a2`
/// (who has seen one more generation than `a` has) still clears `a`'s
/// pending state on load.
#[test]
fn later_generation_supersedes_unresolved_pending() {
    let (group_sk, group_pk) = group_identity(11);

    // A neutral first rekey both admins start from.
    let mut bootstrap = Ratchet::new(&[1u8; 64], &group_pk, Some(&group_sk), None).unwrap();
    let mut m = VecMemberList::new();
    let mut i = RecordingKeys::new();
    let gen0 = bootstrap.rekey(&mut i, &mut m).unwrap().to_vec();

    let mut a = Ratchet::new(&[2u8; 64], &group_pk, Some(&group_sk), None).unwrap();
    let mut a2 = Ratchet::new(&[3u8; 64], &group_pk, Some(&group_sk), None).unwrap();
    for admin in [&mut a, &mut a2] {
        let mut sm = VecMemberList::new();
        let mut si = RecordingKeys::new();
        admin
            .load_key_message(&gen0, "gen0", T0, &mut sm, &mut si)
            .unwrap();
    }

    // a2 advances one generation further than a has seen, and loads its own
    // result so its keyring reflects generation 1.
    let mut m2 = VecMemberList::new();
    let mut i2 = RecordingKeys::new();
    let gen1 = a2.rekey(&mut i2, &mut m2).unwrap().to_vec();
    let mut sm = VecMemberList::new();
    let mut si = RecordingKeys::new();
    a2.load_key_message(&gen1, "gen1", T0 + 1, &mut sm, &mut si)
        .unwrap();

    // a issues its own rekey from its (one generation behind) view: this
    // becomes generation 1 from a's perspective too, and stays pending since
    // nobody has echoed it back yet.
    let mut ma = VecMemberList::new();
    let mut ia = RecordingKeys::new();
    let _a_gen1 = a.rekey(&mut ia, &mut ma).unwrap().to_vec();
    assert!(a.pending_config().is_some());
    let a_pending_gen_key = a.pending_key().unwrap();

    // a2 now issues generation 2, which a never saw the precursor of.
    let mut m3 = VecMemberList::new();
    let mut i3 = RecordingKeys::new();
    let gen2 = a2.rekey(&mut i3, &mut m3).unwrap().to_vec();

    let mut sm = VecMemberList::new();
    let mut si = RecordingKeys::new();
    a.load_key_message(&gen2, "gen2", T0 + 2, &mut sm, &mut si)
        .unwrap();

    // a's pending rekey (from a's own unresolved generation-1 attempt) is
    // cleared even though a never saw its own echo.
    assert!(a.pending_config().is_none());
    assert!(a.pending_key().is_none());
    // The superseded key never makes it into a's keyring.
    assert!(!a.group_keys().contains(&a_pending_gen_key));
}

/// 4. Generation collision: two admins holding the same group identity but
/// disagreeing on member order produce distinct keys for the same
/// generation, which is exactly the signal `needs_rekey` watches for.
#[test]
fn disagreeing_member_order_produces_a_generation_collision() {
    let (group_sk, group_pk) = group_identity(12);

    let (_m1_sk, m1) = member_identity(21);
    let (_m2_sk, m2) = member_identity(22);

    let mut admin1 = Ratchet::new(&[4u8; 64], &group_pk, Some(&group_sk), None).unwrap();
    let mut members1 = VecMemberList::new();
    members1.push(m1.clone());
    members1.push(m2.clone());
    let mut info1 = RecordingKeys::new();
    let message1 = admin1.rekey(&mut info1, &mut members1).unwrap().to_vec();

    let mut admin2 = Ratchet::new(&[5u8; 64], &group_pk, Some(&group_sk), None).unwrap();
    let mut members2 = VecMemberList::new();
    members2.push(m2);
    members2.push(m1);
    let mut info2 = RecordingKeys::new();
    let message2 = admin2.rekey(&mut info2, &mut members2).unwrap().to_vec();

    assert_ne!(message1, message2);

    let mut observer = Ratchet::new(&[6u8; 64], &group_pk, Some(&group_sk), None).unwrap();
    for (msg, ts) in [(&message1, T0), (&message2, T0 + 1)] {
        let mut sm = VecMemberList::new();
        let mut si = RecordingKeys::new();
        observer
            .load_key_message(msg, "m", ts, &mut sm, &mut si)
            .unwrap();
    }

    assert_eq!(observer.group_keys().len(), 2);
    assert!(observer.needs_rekey());
}

/// 5. Expiry retires an old generation while keeping a newer one, per the
/// relationship already validated at the `Keyring` unit level (see
/// DESIGN.md for why the scenario's own day-granularity illustration
/// doesn't itself trigger the rule).
#[test]
fn expiry_retires_stale_generation_but_keeps_the_next_one() {
    let (group_sk, group_pk) = group_identity(13);
    let mut admin = Ratchet::new(&[9u8; 64], &group_pk, Some(&group_sk), None).unwrap();

    let timestamps = [0i64, 10, KEY_EXPIRY_MS + 20];
    for ts in timestamps {
        let mut m = VecMemberList::new();
        let mut i = RecordingKeys::new();
        let message = admin.rekey(&mut i, &mut m).unwrap().to_vec();
        let mut sm = VecMemberList::new();
        let mut si = RecordingKeys::new();
        admin
            .load_key_message(&message, "m", ts, &mut sm, &mut si)
            .unwrap();
    }

    // Three generations were loaded but the oldest is retired on expiry.
    assert_eq!(admin.group_keys().len(), 2);
}

/// 6. A malformed key message — a truncated final member-key entry — is
/// rejected without mutating the keyring or pending state.
#[test]
fn malformed_message_is_rejected_without_side_effects() {
    use groupkeys::bencode::DictProducer;

    let (group_sk, group_pk) = group_identity(14);

    let entries: Vec<[u8; 48]> = (0..MESSAGE_KEY_MULTIPLE as u8).map(|i| [i; 48]).collect();
    let mut entry_refs: Vec<&[u8]> = entries.iter().map(|e| e.as_slice()).collect();
    let short = [0u8; 47];
    *entry_refs.last_mut().unwrap() = &short;

    let mut producer = DictProducer::new();
    producer.append_str(b"#", &[3u8; 24]).unwrap();
    producer.append_int(b"G", 0).unwrap();
    producer.append_str(b"K", &[4u8; 48]).unwrap();
    producer.append_list_str(b"k", &entry_refs).unwrap();
    let to_sign = producer.signing_bytes().to_vec();
    let sig = groupkeys::crypto::sign(&group_sk, &to_sign).unwrap();
    producer.append_str(b"~", &sig).unwrap();
    let message = producer.finalize();

    let mut admin = Ratchet::new(&[1u8; 64], &group_pk, Some(&group_sk), None).unwrap();
    let mut sm = VecMemberList::new();
    let mut si = RecordingKeys::new();
    let err = admin
        .load_key_message(&message, "m", T0, &mut sm, &mut si)
        .unwrap_err();

    assert!(matches!(err, groupkeys::Error::Malformed(_)));
    assert!(admin.group_keys().is_empty());
    assert!(admin.pending_config().is_none());
}
