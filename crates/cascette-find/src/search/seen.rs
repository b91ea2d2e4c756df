//! Per-cursor set of already yielded encoded-key slots

use crate::{FindError, Result};

const BITS_PER_WORD: usize = u32::BITS as usize;

/// Fixed-size bitset over encoded-key index slots.
///
/// Sized once from the index's slot count; the index behind a shared
/// storage never grows, so every slot it reports has a bit.
#[derive(Debug, Clone)]
pub(crate) struct SeenSlots {
    words: Vec<u32>,
}

impl SeenSlots {
    /// Allocate a cleared set covering `slot_count` slots
    pub(crate) fn with_slots(slot_count: usize) -> Result<Self> {
        let word_count = slot_count.div_ceil(BITS_PER_WORD);
        let mut words = Vec::new();
        words
            .try_reserve_exact(word_count)
            .map_err(|_| FindError::OutOfMemory)?;
        words.resize(word_count, 0);
        Ok(Self { words })
    }

    /// Mark `slot` as seen. Returns `true` if it was not seen before.
    pub(crate) fn insert(&mut self, slot: usize) -> bool {
        let Some(word) = self.words.get_mut(slot / BITS_PER_WORD) else {
            return true;
        };
        let bit = 1u32 << (slot % BITS_PER_WORD);
        let fresh = *word & bit == 0;
        *word |= bit;
        fresh
    }

    /// Whether `slot` was seen
    #[cfg(test)]
    pub(crate) fn contains(&self, slot: usize) -> bool {
        self.words
            .get(slot / BITS_PER_WORD)
            .is_some_and(|word| word & (1 << (slot % BITS_PER_WORD)) != 0)
    }
}
