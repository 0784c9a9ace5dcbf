use super::malformed;
use crate::error::Result;

/// A forward-only cursor over a bencoded dict. Keys are read in ascending
/// order; `skip_until` advances past keys the caller doesn't care about,
/// and returns `false` once it passes (or reaches the end) without finding
/// the requested key — dict keys are sorted, so a key strictly greater
/// than the target proves the target is absent.
pub struct DictConsumer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DictConsumer<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.first() != Some(&b'd') {
            return Err(malformed("not a bencoded dict"));
        }
        Ok(Self { data, pos: 1 })
    }

    fn peek_key(&self) -> Result<Option<(&'a [u8], usize)>> {
        if self.pos >= self.data.len() {
            return Err(malformed("truncated dict"));
        }
        if self.data[self.pos] == b'e' {
            return Ok(None);
        }
        let (key, after) = parse_bstring(self.data, self.pos)?;
        Ok(Some((key, after)))
    }

    /// Advance the cursor to just before `key`'s entry, without consuming
    /// it. Returns `false` (cursor position undefined for further reads of
    /// *this* key, but still valid for any key greater than it) if `key`
    /// is not present.
    pub fn skip_until(&mut self, key: &[u8]) -> Result<bool> {
        loop {
            match self.peek_key()? {
                None => return Ok(false),
                Some((k, after_key)) => {
                    if k == key {
                        return Ok(true);
                    }
                    if k > key {
                        return Ok(false);
                    }
                    let value_end = skip_value(self.data, after_key)?;
                    self.pos = value_end;
                }
            }
        }
    }

    /// Byte offset at which `key`'s entry begins, or `None` if absent.
    /// Does not move the cursor permanently past the key if found.
    fn offset_of(&mut self, key: &[u8]) -> Result<Option<usize>> {
        if self.skip_until(key)? {
            Ok(Some(self.pos))
        } else {
            Ok(None)
        }
    }

    /// The raw bytes of the dict from its start up to (but not including)
    /// `key`'s entry. Used to recover the slice that was signed: the
    /// signature key is always last in this wire format, so this doubles
    /// as "all bytes except the trailing terminator and the `~` entry".
    pub fn signed_prefix(&mut self, key: &[u8]) -> Result<&'a [u8]> {
        match self.offset_of(key)? {
            Some(off) => Ok(&self.data[0..off]),
            None => Err(malformed(format!(
                "missing required key {:?}",
                String::from_utf8_lossy(key)
            ))),
        }
    }

    /// Read a required `key: bytestring` entry, advancing the cursor past it.
    pub fn read_str(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        if !self.skip_until(key)? {
            return Err(malformed(format!(
                "missing required key {:?}",
                String::from_utf8_lossy(key)
            )));
        }
        let (_, after_key) = parse_bstring(self.data, self.pos)?;
        let (val, after_val) = parse_bstring(self.data, after_key)?;
        self.pos = after_val;
        Ok(val.to_vec())
    }

    /// Read a required `key: integer` entry, advancing the cursor past it.
    pub fn read_int(&mut self, key: &[u8]) -> Result<i64> {
        if !self.skip_until(key)? {
            return Err(malformed(format!(
                "missing required key {:?}",
                String::from_utf8_lossy(key)
            )));
        }
        let (_, after_key) = parse_bstring(self.data, self.pos)?;
        let (val, after_val) = parse_int(self.data, after_key)?;
        self.pos = after_val;
        Ok(val)
    }

    /// Read an optional `key: integer` entry if present.
    pub fn read_opt_int(&mut self, key: &[u8]) -> Result<Option<i64>> {
        if !self.skip_until(key)? {
            return Ok(None);
        }
        let (_, after_key) = parse_bstring(self.data, self.pos)?;
        let (val, after_val) = parse_int(self.data, after_key)?;
        self.pos = after_val;
        Ok(Some(val))
    }

    /// Read a required `key: list<bytestring>` entry, advancing the cursor past it.
    pub fn read_list_str(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        if !self.skip_until(key)? {
            return Err(malformed(format!(
                "missing required key {:?}",
                String::from_utf8_lossy(key)
            )));
        }
        let (_, after_key) = parse_bstring(self.data, self.pos)?;
        if self.data.get(after_key) != Some(&b'l') {
            return Err(malformed("expected a list value"));
        }
        let mut pos = after_key + 1;
        let mut items = Vec::new();
        loop {
            match self.data.get(pos) {
                Some(b'e') => {
                    pos += 1;
                    break;
                }
                Some(_) => {
                    let (item, after) = parse_bstring(self.data, pos)?;
                    items.push(item.to_vec());
                    pos = after;
                }
                None => return Err(malformed("truncated list")),
            }
        }
        self.pos = pos;
        Ok(items)
    }
}

/// Parse a bencoded byte string (`N:bytes`) starting at `pos`, returning
/// the string slice and the position immediately after it.
fn parse_bstring(data: &[u8], pos: usize) -> Result<(&[u8], usize)> {
    let colon = data[pos..]
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| malformed("expected bencoded string length"))?;
    let len_bytes = &data[pos..pos + colon];
    if len_bytes.is_empty() || (len_bytes.len() > 1 && len_bytes[0] == b'0') {
        return Err(malformed("non-canonical string length"));
    }
    if !len_bytes.iter().all(u8::is_ascii_digit) {
        return Err(malformed("invalid string length"));
    }
    let len: usize = std::str::from_utf8(len_bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed("string length overflow"))?;
    let start = pos + colon + 1;
    let end = start
        .checked_add(len)
        .ok_or_else(|| malformed("string length overflow"))?;
    if end > data.len() {
        return Err(malformed("truncated string"));
    }
    Ok((&data[start..end], end))
}

/// Parse a bencoded integer (`iNNNe`) starting at `pos`.
fn parse_int(data: &[u8], pos: usize) -> Result<(i64, usize)> {
    if data.get(pos) != Some(&b'i') {
        return Err(malformed("expected bencoded integer"));
    }
    let rest = &data[pos + 1..];
    let e = rest
        .iter()
        .position(|&b| b == b'e')
        .ok_or_else(|| malformed("unterminated integer"))?;
    let digits = &rest[0..e];
    if digits.is_empty() || digits == b"-" {
        return Err(malformed("empty integer"));
    }
    let (sign, mag) = if digits[0] == b'-' {
        (-1i64, &digits[1..])
    } else {
        (1i64, digits)
    };
    if mag.is_empty() || !mag.iter().all(u8::is_ascii_digit) {
        return Err(malformed("invalid integer digits"));
    }
    if mag.len() > 1 && mag[0] == b'0' {
        return Err(malformed("non-canonical integer (leading zero)"));
    }
    if mag == b"0" && sign == -1 {
        return Err(malformed("non-canonical integer (negative zero)"));
    }
    let value: i64 = std::str::from_utf8(mag)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed("integer overflow"))?;
    Ok((sign * value, pos + 1 + e + 1))
}

/// Skip over one arbitrary bencoded value (string, integer, or list of
/// strings) starting at `pos`, returning the position immediately after it.
/// Used by `skip_until` to step past entries the caller doesn't need.
fn skip_value(data: &[u8], pos: usize) -> Result<usize> {
    match data.get(pos) {
        Some(b'i') => parse_int(data, pos).map(|(_, end)| end),
        Some(b'l') => {
            let mut p = pos + 1;
            loop {
                match data.get(p) {
                    Some(b'e') => return Ok(p + 1),
                    Some(_) => {
                        p = skip_value(data, p)?;
                    }
                    None => return Err(malformed("truncated list")),
                }
            }
        }
        Some(b'd') => {
            let mut p = pos + 1;
            loop {
                match data.get(p) {
                    Some(b'e') => return Ok(p + 1),
                    Some(_) => {
                        let (_, after_key) = parse_bstring(data, p)?;
                        p = skip_value(data, after_key)?;
                    }
                    None => return Err(malformed("truncated dict")),
                }
            }
        }
        Some(b'0'..=b'9') => parse_bstring(data, pos).map(|(_, end)| end),
        _ => Err(malformed("unrecognized bencode value")),
    }
}
