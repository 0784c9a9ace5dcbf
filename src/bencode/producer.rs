use super::malformed;
use crate::error::Result;

/// Builds a canonical bencoded dict, one key at a time, in ascending key
/// order. Keys and list entries are byte strings; the only other value
/// type is the signed integer used for `G` and `+`.
pub struct DictProducer {
    buf: Vec<u8>,
    last_key: Option<Vec<u8>>,
}

impl DictProducer {
    pub fn new() -> Self {
        Self {
            buf: vec![b'd'],
            last_key: None,
        }
    }

    fn begin_entry(&mut self, key: &[u8]) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return Err(malformed(format!(
                    "bencode keys must be appended in ascending order: {:?} after {:?}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(last)
                )));
            }
        }
        self.last_key = Some(key.to_vec());
        write_bstring(&mut self.buf, key);
        Ok(())
    }

    /// Append a `key: bytestring` entry.
    pub fn append_str(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.begin_entry(key)?;
        write_bstring(&mut self.buf, value);
        Ok(())
    }

    /// Append a `key: integer` entry.
    pub fn append_int(&mut self, key: &[u8], value: i64) -> Result<()> {
        self.begin_entry(key)?;
        write_int(&mut self.buf, value);
        Ok(())
    }

    /// Append a `key: list<bytestring>` entry.
    pub fn append_list_str(&mut self, key: &[u8], items: &[&[u8]]) -> Result<()> {
        self.begin_entry(key)?;
        self.buf.push(b'l');
        for item in items {
            write_bstring(&mut self.buf, item);
        }
        self.buf.push(b'e');
        Ok(())
    }

    /// The bytes written so far, with no closing `e` and not including any
    /// entry not yet appended. Used to compute the slice that gets signed:
    /// call this immediately before appending the `~` entry.
    pub fn signing_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Close the dict and return the finished message bytes.
    pub fn finalize(mut self) -> Vec<u8> {
        self.buf.push(b'e');
        self.buf
    }
}

impl Default for DictProducer {
    fn default() -> Self {
        Self::new()
    }
}

fn write_bstring(buf: &mut Vec<u8>, value: &[u8]) {
    buf.extend_from_slice(value.len().to_string().as_bytes());
    buf.push(b':');
    buf.extend_from_slice(value);
}

fn write_int(buf: &mut Vec<u8>, value: i64) {
    buf.push(b'i');
    buf.extend_from_slice(value.to_string().as_bytes());
    buf.push(b'e');
}
