//! Unigram sampling table for negative sampling

use rand::Rng;

/// Exponent applied to raw counts; flattens the distribution toward rare words.
pub const UNIGRAM_POWER: f64 = 0.75;

pub const MIN_TABLE_SIZE: usize = 1_000_000;
pub const MAX_TABLE_SIZE: usize = 100_000_000;

/// Precomputed table of vocabulary indices. Each index fills a share of the
/// slots proportional to `count^0.75`, so drawing a uniform slot is an O(1)
/// weighted draw.
#[derive(Clone, Debug)]
pub struct UnigramTable {
    slots: Vec<u32>,
}

impl UnigramTable {
    /// Table sized at 1000 slots per word, clamped to `[1e6, 1e8]`.
    pub fn new(counts: &[u64]) -> Self {
        let size = counts
            .len()
            .saturating_mul(1000)
            .clamp(MIN_TABLE_SIZE, MAX_TABLE_SIZE);
        Self::with_size(counts, size)
    }

    /// Table with an explicit number of slots.
    ///
    /// ```
    /// use word2vec::vocab::UnigramTable;
    ///
    /// let table = UnigramTable::with_size(&[16, 1], 1000);
    /// // 16^0.75 = 8, so word 0 owns 8/9 of the slots.
    /// let zeros = (0..table.len()).filter(|&s| table.get(s) == 0).count();
    /// assert!((zeros as i64 - 889).abs() <= 1);
    /// ```
    pub fn with_size(counts: &[u64], size: usize) -> Self {
        if counts.is_empty() || size == 0 {
            return UnigramTable { slots: Vec::new() };
        }

        let mut weights: Vec<f64> = counts
            .iter()
            .map(|&c| (c as f64).powf(UNIGRAM_POWER))
            .collect();
        let mut total: f64 = weights.iter().sum();
        if total <= 0.0 {
            weights.iter_mut().for_each(|w| *w = 1.0);
            total = weights.len() as f64;
        }

        let last = counts.len() - 1;
        let mut slots = Vec::with_capacity(size);
        let mut word = 0usize;
        let mut cumulative = weights[0] / total;
        for slot in 0..size {
            let position = slot as f64 / size as f64;
            while word < last && position >= cumulative {
                word += 1;
                cumulative += weights[word] / total;
            }
            slots.push(word as u32);
        }
        UnigramTable { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Vocabulary index stored in `slot`.
    #[inline]
    pub fn get(&self, slot: usize) -> usize {
        self.slots[slot] as usize
    }

    /// Draw a vocabulary index.
    #[inline]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.slots[rng.gen_range(0..self.slots.len())] as usize
    }
}
