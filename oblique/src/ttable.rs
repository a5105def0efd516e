//! Sparse conditional translation table.

use hashbrown::HashMap;

use crate::common::WordId;
use crate::math::digamma;
use crate::utils::FromU32;

/// Probability returned for a pair that has never been observed.
///
/// The floor keeps per-position sums strictly positive on the first pass,
/// before any counts exist.
pub const UNSEEN_PROB: f64 = 1e-9;

/// Two-level sparse mapping from a source word to a distribution over
/// target words.
///
/// The outer level is a vector directly addressed by source [`WordId`]
/// (including the NULL word); each inner level is a hash map from target
/// [`WordId`] to a double. Between [`normalize`](TTable::normalize) calls
/// the values are expected counts; afterwards they are conditional
/// probabilities.
#[derive(Default, Clone, Debug)]
pub struct TTable {
    rows: Vec<HashMap<WordId, f64>>,
}

impl TTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns T\[e\]\[f\], or [`UNSEEN_PROB`] if the pair has never been
    /// incremented. Never fails.
    #[inline(always)]
    pub fn prob(&self, e: WordId, f: WordId) -> f64 {
        self.rows
            .get(usize::from_u32(e))
            .and_then(|row| row.get(&f).copied())
            .unwrap_or(UNSEEN_PROB)
    }

    /// Adds `delta` to T\[e\]\[f\], creating the entry as needed.
    #[inline]
    pub fn increment(&mut self, e: WordId, f: WordId, delta: f64) {
        debug_assert!(delta >= 0.0);
        let e = usize::from_u32(e);
        if self.rows.len() <= e {
            self.rows.resize_with(e + 1, HashMap::new);
        }
        *self.rows[e].entry(f).or_insert(0.0) += delta;
    }

    /// Rescales every row to sum to one.
    ///
    /// Rows whose counts sum to zero are left untouched; they contribute
    /// nothing to any later lookup beyond the unseen floor.
    pub fn normalize(&mut self) {
        for row in &mut self.rows {
            let sum: f64 = row.values().sum();
            if sum > 0.0 {
                for value in row.values_mut() {
                    *value /= sum;
                }
            }
        }
    }

    /// Applies the variational-Bayes update under a symmetric
    /// Dirichlet(`alpha`) prior: each entry becomes
    /// exp(ψ(c + α) − ψ(Σc + α·n)) where n is the number of observed
    /// target words in the row.
    ///
    /// The caller must guarantee `alpha > 0`.
    pub fn normalize_vb(&mut self, alpha: f64) {
        debug_assert!(alpha > 0.0);
        for row in &mut self.rows {
            let sum: f64 = row.values().sum::<f64>() + alpha * row.len() as f64;
            if sum > 0.0 {
                let denom = digamma(sum);
                for value in row.values_mut() {
                    *value = (digamma(*value + alpha) - denom).exp();
                }
            }
        }
    }

    /// Returns the number of source words with at least one observed
    /// target word.
    pub fn num_observed_sources(&self) -> usize {
        self.rows.iter().filter(|row| !row.is_empty()).count()
    }

    /// Exports the table as `(source, row)` pairs with every row sorted by
    /// target identifier. The export is deterministic for a given set of
    /// increments, regardless of insertion order.
    pub fn sorted_entries(&self) -> Vec<(WordId, Vec<(WordId, f64)>)> {
        let mut entries = Vec::with_capacity(self.num_observed_sources());
        for (e, row) in self.rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let mut pairs: Vec<_> = row.iter().map(|(&f, &v)| (f, v)).collect();
            pairs.sort_unstable_by_key(|&(f, _)| f);
            entries.push((e as WordId, pairs));
        }
        entries
    }

    /// Rebuilds a table from exported entries.
    pub fn from_entries(entries: Vec<(WordId, Vec<(WordId, f64)>)>) -> Self {
        let mut table = Self::new();
        for (e, pairs) in entries {
            let e = usize::from_u32(e);
            if table.rows.len() <= e {
                table.rows.resize_with(e + 1, HashMap::new);
            }
            table.rows[e] = pairs.into_iter().collect();
        }
        table
    }
}
