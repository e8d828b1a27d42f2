//! The word supply: a length-indexed store of candidate entries with
//! quality-weighted ordering. Entries arrive from bulk base/themed loads or
//! one at a time from the word oracle; they are normalized, validated, and
//! deduplicated across the whole supply. Ids are stable -- entries are only
//! ever appended -- so domains can hold `(length, id)` references while the
//! supply keeps growing underneath them.

use float_ord::FloatOrd;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use unicode_normalization::UnicodeNormalization;

use crate::types::{EntryId, GlobalEntryId};

/// The minimum admissible entry length.
pub const MIN_ENTRY_LENGTH: usize = 3;

lazy_static! {
    /// How comfortably each letter crosses other entries, on a 0-1 scale.
    /// Common crossing letters score high; the letters constructors dread
    /// score low.
    static ref LETTER_FRIENDLINESS: HashMap<char, f32> = {
        let chars_and_weights: Vec<(&str, f32)> = vec![
            ("EASTRLNOI", 1.0),
            ("DUCMG", 0.75),
            ("PHBYK", 0.5),
            ("WFVZ", 0.35),
            ("XQJ", 0.2),
        ];
        chars_and_weights
            .iter()
            .flat_map(|(chars_str, weight)| chars_str.chars().map(|ch| (ch, *weight)))
            .collect()
    };
}

/// Where an entry came from. Origins only matter for reporting and for the
/// frequency tier baked into the quality score at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    Base,
    Themed,
    Oracle,
}

/// A candidate entry: uppercase A-Z text plus a quality score in [0, 1].
#[derive(Debug, Clone)]
pub struct Entry {
    pub text: String,
    pub origin: EntryOrigin,
    pub quality: f32,
}

/// Normalize a raw entry the way dictionary text is normalized on load:
/// NFC-compose, strip whitespace, uppercase. Returns `None` when the result
/// is shorter than three letters or contains anything outside A-Z.
#[must_use]
pub fn normalize_entry(raw: &str) -> Option<String> {
    let normalized: String = raw
        .nfc()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    if normalized.len() < MIN_ENTRY_LENGTH || !normalized.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    Some(normalized)
}

/// The mean friendliness of an entry's letters.
#[must_use]
pub fn friendliness(text: &str) -> f32 {
    let total: f32 = text
        .chars()
        .map(|ch| LETTER_FRIENDLINESS.get(&ch).copied().unwrap_or(0.5))
        .sum();
    total / text.len() as f32
}

fn quality_score(text: &str, tier: f32) -> f32 {
    0.5 * tier + 0.5 * friendliness(text)
}

/// The length-indexed entry container.
pub struct WordSupply {
    /// Entries bucketed by length; an index into `buckets` is the length of
    /// the entries inside, so `buckets[0..3]` stay empty.
    buckets: Vec<Vec<Entry>>,

    /// Map from normalized text to its id within the bucket for its length.
    id_by_text: HashMap<String, EntryId>,

    /// How many submitted entries failed validation and were dropped.
    rejected: usize,
}

impl Default for WordSupply {
    fn default() -> Self {
        WordSupply::new()
    }
}

impl WordSupply {
    #[must_use]
    pub fn new() -> WordSupply {
        WordSupply {
            buckets: vec![vec![]],
            id_by_text: HashMap::new(),
            rejected: 0,
        }
    }

    /// Bulk-load ordinary dictionary entries. Returns the number of entries
    /// newly added; invalid entries are dropped silently and counted.
    pub fn load_base(&mut self, entries: &[&str]) -> usize {
        entries
            .iter()
            .filter(|raw| self.ingest(raw, EntryOrigin::Base, 0.5).is_some())
            .count()
    }

    /// Bulk-load themed entries with a frequency-tier boost, so that theme
    /// material outranks ordinary fill of the same letters.
    pub fn load_themed(&mut self, entries: &[&str], priority_boost: f32) -> usize {
        let tier = (0.5 + priority_boost).min(1.0);
        entries
            .iter()
            .filter(|raw| self.ingest(raw, EntryOrigin::Themed, tier).is_some())
            .count()
    }

    /// Take a single entry from the oracle (or any other late source).
    /// Returns the entry's global id whether it was added now or already
    /// present, and `None` when it fails validation.
    pub fn absorb(&mut self, raw: &str, origin: EntryOrigin) -> Option<GlobalEntryId> {
        match self.ingest(raw, origin, 0.5) {
            Some(id) => Some(id),
            None => self.lookup_raw(raw),
        }
    }

    /// Normalize and insert, returning the new global id, or `None` if the
    /// entry was invalid or already present. A duplicate with a higher
    /// quality upgrades the stored score in place (ids never move).
    fn ingest(&mut self, raw: &str, origin: EntryOrigin, tier: f32) -> Option<GlobalEntryId> {
        let Some(text) = normalize_entry(raw) else {
            self.rejected += 1;
            return None;
        };

        let length = text.len();
        let quality = quality_score(&text, tier);

        if let Some(&existing_id) = self.id_by_text.get(&text) {
            let existing = &mut self.buckets[length][existing_id];
            if quality > existing.quality {
                existing.quality = quality;
                existing.origin = origin;
            }
            return None;
        }

        while self.buckets.len() < length + 1 {
            self.buckets.push(vec![]);
        }

        let id = self.buckets[length].len();
        self.buckets[length].push(Entry {
            text: text.clone(),
            origin,
            quality,
        });
        self.id_by_text.insert(text, id);
        Some((length, id))
    }

    fn lookup_raw(&self, raw: &str) -> Option<GlobalEntryId> {
        normalize_entry(raw).and_then(|text| self.lookup(&text))
    }

    /// Find an entry by normalized text.
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<GlobalEntryId> {
        self.id_by_text.get(text).map(|&id| (text.len(), id))
    }

    /// Borrow an entry by its global id.
    #[must_use]
    pub fn entry(&self, (length, id): GlobalEntryId) -> &Entry {
        &self.buckets[length][id]
    }

    /// How many entries of a given length are loaded.
    #[must_use]
    pub fn bucket_len(&self, length: usize) -> usize {
        self.buckets.get(length).map_or(0, Vec::len)
    }

    /// Entry ids of the given length, ordered quality-descending with ties
    /// broken lexicographically. Domain construction preserves this order so
    /// the search heuristics prefer higher-quality fill.
    #[must_use]
    pub fn candidates(&self, length: usize) -> Vec<EntryId> {
        let Some(bucket) = self.buckets.get(length) else {
            return vec![];
        };
        let mut ids: Vec<EntryId> = (0..bucket.len()).collect();
        ids.sort_by_key(|&id| (FloatOrd(-bucket[id].quality), bucket[id].text.clone()));
        ids
    }

    /// Total entries across all lengths.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// How many submitted entries were dropped by validation.
    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }
}

impl Debug for WordSupply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordSupply")
            .field(
                "buckets",
                &self.buckets.iter().map(Vec::len).collect::<Vec<_>>(),
            )
            .field("rejected", &self.rejected)
            .finish_non_exhaustive()
    }
}
