//! # Keyring
//!
//! The ordered, deduplicated history of group symmetric keys. A `Keyring`
//! never reorders or mutates an inserted [`KeyInfo`] in place; every
//! mutation is an insert-in-order or a bulk eviction.

use crate::crypto::Secret;

/// One generation's symmetric key, together with the metadata needed to
/// order and expire it.
///
/// Total order and equality are both `(generation, timestamp, key)`.
#[derive(Clone, Debug)]
pub struct KeyInfo {
    pub generation: i64,
    pub key: Secret<32>,
    pub timestamp_ms: i64,
}

impl KeyInfo {
    pub fn new(generation: i64, key: [u8; 32], timestamp_ms: i64) -> Self {
        Self {
            generation,
            key: Secret::new(key),
            timestamp_ms,
        }
    }

    fn order_key(&self) -> (i64, i64, &[u8; 32]) {
        (self.generation, self.timestamp_ms, self.key.as_bytes())
    }
}

impl PartialEq for KeyInfo {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl Eq for KeyInfo {}

impl PartialOrd for KeyInfo {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyInfo {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

/// An ordered, deduplicated sequence of [`KeyInfo`] records.
#[derive(Default)]
pub struct Keyring {
    entries: Vec<KeyInfo>,
}

impl Keyring {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The highest-ordered entry, if any.
    pub fn back(&self) -> Option<&KeyInfo> {
        self.entries.last()
    }

    /// All entries in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyInfo> {
        self.entries.iter()
    }

    /// All entries newest (highest-ordered) first.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &KeyInfo> {
        self.entries.iter().rev()
    }

    /// Insert `info` at its sorted position. Returns `false` (and does
    /// nothing) if an equal entry already exists — this is what makes
    /// repeated `load_key_message` calls on the same message idempotent.
    pub fn insert(&mut self, info: KeyInfo) -> bool {
        match self.entries.binary_search(&info) {
            Ok(_) => false,
            Err(pos) => {
                self.entries.insert(pos, info);
                true
            }
        }
    }

    /// True iff the two highest-ordered entries share a generation — a
    /// sign that two admins rekeyed concurrently.
    pub fn has_generation_collision(&self) -> bool {
        let n = self.entries.len();
        n >= 2 && self.entries[n - 1].generation == self.entries[n - 2].generation
    }

    /// Evict entire expired generations. See the module-level algorithm
    /// note on [`crate::ratchet::KEY_EXPIRY`] for the retirement rule.
    ///
    /// Walks generations oldest-first and stops at the first one that is
    /// not yet expired; a generation is expired when the next generation's
    /// minimum timestamp is more than `expiry_ms` older than the newest
    /// timestamp in the whole keyring. The keyring is never fully emptied.
    pub fn remove_expired(&mut self, expiry_ms: i64) {
        if self.entries.len() < 2 {
            return;
        }
        // The reference point is the newest (highest-ordered) entry's
        // timestamp, not the max over all entries: entries are already
        // sorted so these coincide in practice, but anchoring on the back
        // entry specifically is what keeps this correct if that ever isn't
        // true.
        let t_back = self.entries.last().map(|e| e.timestamp_ms).unwrap_or(0);

        // Group entries by generation, preserving sorted order. Since
        // entries within a generation are sorted ascending by timestamp,
        // the first entry seen for each generation already holds its
        // minimum timestamp.
        let mut generations: Vec<(i64, i64)> = Vec::new(); // (generation, min_timestamp)
        for entry in &self.entries {
            match generations.last() {
                Some((gen, _)) if *gen == entry.generation => {}
                _ => generations.push((entry.generation, entry.timestamp_ms)),
            }
        }

        let mut retire_through = 0usize; // number of generations (from the front) to drop
        for i in 0..generations.len().saturating_sub(1) {
            let next_min_ts = generations[i + 1].1;
            if next_min_ts + expiry_ms < t_back {
                retire_through = i + 1;
            } else {
                break;
            }
        }

        if retire_through == 0 {
            return;
        }
        let cutoff_generation = generations[retire_through - 1].0;
        self.entries.retain(|e| e.generation > cutoff_generation);
    }
}
