//! # Bencoded Dict Codec
//!
//! A minimal, canonical bencode implementation: a sorted-key dictionary of
//! byte strings, signed integers, and lists of byte strings. No nested
//! dicts, no floats — the wire format never needs them.
//!
//! Dict keys must be appended in strictly ascending byte order; the
//! producer enforces this so a caller can never accidentally emit a
//! non-canonical message. The consumer mirrors `oxenc`'s `bt_dict_consumer`:
//! a single forward cursor, `skip_until` to jump past absent keys, and a
//! hard error on reading a key that isn't present.

use crate::error::{Error, Result};

mod consumer;
mod producer;

pub use consumer::DictConsumer;
pub use producer::DictProducer;

fn malformed(msg: impl Into<String>) -> Error {
    Error::Malformed(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_full_message_shape() {
        let mut p = DictProducer::new();
        p.append_str(b"#", &[1u8; 24]).unwrap();
        p.append_int(b"G", 0).unwrap();
        p.append_str(b"K", &[2u8; 48]).unwrap();
        p.append_list_str(b"k", &[&[3u8; 48], &[4u8; 48]]).unwrap();
        let signed_prefix = p.signing_bytes().to_vec();
        p.append_str(b"~", &[5u8; 64]).unwrap();
        let bytes = p.finalize();

        let mut c = DictConsumer::new(&bytes).unwrap();
        assert_eq!(c.read_str(b"#").unwrap(), vec![1u8; 24]);
        assert_eq!(c.read_int(b"G").unwrap(), 0);
        assert_eq!(c.read_str(b"K").unwrap(), vec![2u8; 48]);
        let list = c.read_list_str(b"k").unwrap();
        assert_eq!(list, vec![vec![3u8; 48], vec![4u8; 48]]);
        assert_eq!(c.read_str(b"~").unwrap(), vec![5u8; 64]);

        let mut c2 = DictConsumer::new(&bytes).unwrap();
        let prefix = c2.signed_prefix(b"~").unwrap();
        assert_eq!(prefix, signed_prefix.as_slice());
    }

    #[test]
    fn skip_until_absent_key_returns_false() {
        let mut p = DictProducer::new();
        p.append_str(b"#", &[0u8; 24]).unwrap();
        p.append_int(b"G", 5).unwrap();
        let bytes = p.finalize();

        let mut c = DictConsumer::new(&bytes).unwrap();
        assert!(!c.skip_until(b"K").unwrap());
    }

    #[test]
    fn reading_missing_required_key_is_an_error() {
        let mut p = DictProducer::new();
        p.append_int(b"G", 5).unwrap();
        let bytes = p.finalize();

        let mut c = DictConsumer::new(&bytes).unwrap();
        assert!(c.read_str(b"#").is_err());
    }

    #[test]
    fn producer_rejects_out_of_order_keys() {
        let mut p = DictProducer::new();
        p.append_int(b"G", 0).unwrap();
        assert!(p.append_str(b"#", &[0u8; 24]).is_err());
    }

    #[test]
    fn integers_reject_leading_zeros_and_non_canonical_forms() {
        // i03e is not canonical bencode.
        let bad = b"d1:Gi03ee";
        let mut c = DictConsumer::new(bad).unwrap();
        assert!(c.read_int(b"G").is_err());
    }
}
