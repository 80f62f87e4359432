//! Per-record confirmation bitset keyed by owner slot.

use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Set of owner slots that confirmed a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationSet {
    words: Vec<u64>,
}

impl ConfirmationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check slot membership.
    pub fn contains(&self, slot: usize) -> bool {
        self.words
            .get(slot / WORD_BITS)
            .map_or(false, |word| word & (1u64 << (slot % WORD_BITS)) != 0)
    }

    /// Add a slot. Returns `false` if already present.
    pub fn insert(&mut self, slot: usize) -> bool {
        let word = slot / WORD_BITS;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }

        let mask = 1u64 << (slot % WORD_BITS);
        let fresh = self.words[word] & mask == 0;
        self.words[word] |= mask;
        fresh
    }

    /// Remove a slot. Returns `false` if it was absent.
    pub fn remove(&mut self, slot: usize) -> bool {
        let mask = 1u64 << (slot % WORD_BITS);
        match self.words.get_mut(slot / WORD_BITS) {
            Some(word) if *word & mask != 0 => {
                *word &= !mask;
                true
            }
            _ => false,
        }
    }

    /// Number of slots present.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Check if no slot is present.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Present slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| i * WORD_BITS + bit)
        })
    }
}
