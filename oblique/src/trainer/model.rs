use std::io::{BufWriter, Read, Write};

use bincode::{Decode, Encode};
use hashbrown::HashSet;

use crate::common::{self, WordId};
use crate::errors::Result;
use crate::ttable::TTable;
use crate::utils::FromU32;
use crate::vocabulary::Vocabulary;

/// Prior parameters fixed at training time and replayed at scoring time.
#[derive(Clone, Copy, Debug, Decode, Encode)]
pub(crate) struct AlignmentParams {
    pub(crate) use_null: bool,
    pub(crate) favor_diagonal: bool,
    pub(crate) prob_align_null: f64,
    pub(crate) diagonal_tension: f64,
}

/// Likelihood statistics of one EM pass.
#[derive(Clone, Copy, Debug)]
pub struct IterationStats {
    /// Natural-log likelihood of the corpus under the pre-pass table.
    pub log_likelihood: f64,

    /// The likelihood in base 2.
    pub base2_likelihood: f64,

    /// Per-target-word cross-entropy in bits.
    pub cross_entropy: f64,

    /// 2 to the power of the cross-entropy.
    pub perplexity: f64,
}

/// Record of the argmax selections of the final pass: for each source
/// word, the target words some position aligned to.
#[derive(Default, Debug)]
pub struct ViterbiSet {
    sets: Vec<HashSet<WordId>>,
}

impl ViterbiSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that some position aligned `f` to `e`.
    pub fn insert(&mut self, e: WordId, f: WordId) {
        let e = usize::from_u32(e);
        if self.sets.len() <= e {
            self.sets.resize_with(e + 1, HashSet::new);
        }
        self.sets[e].insert(f);
    }

    /// Checks if `f` was ever the argmax under `e`.
    #[inline(always)]
    pub fn contains(&self, e: WordId, f: WordId) -> bool {
        self.sets
            .get(usize::from_u32(e))
            .map_or(false, |s| s.contains(&f))
    }
}

/// Serializable form of a trained model.
#[derive(Decode, Encode)]
struct ModelData {
    surfaces: Vec<String>,
    entries: Vec<(WordId, Vec<(WordId, f64)>)>,
    mean_srclen_multiplier: f64,
    params: AlignmentParams,
}

/// A trained alignment model.
#[derive(Debug)]
pub struct Model {
    pub(crate) ttable: TTable,
    pub(crate) viterbi: ViterbiSet,
    pub(crate) mean_srclen_multiplier: f64,
    pub(crate) stats: Vec<IterationStats>,
    pub(crate) params: AlignmentParams,
}

impl Model {
    /// Returns the trained translation table.
    #[inline(always)]
    pub fn ttable(&self) -> &TTable {
        &self.ttable
    }

    /// Returns the expected ratio of target length to source length,
    /// estimated on the first pass.
    #[inline(always)]
    pub fn mean_srclen_multiplier(&self) -> f64 {
        self.mean_srclen_multiplier
    }

    /// Returns per-pass likelihood statistics, in pass order.
    #[inline(always)]
    pub fn stats(&self) -> &[IterationStats] {
        &self.stats
    }

    /// Returns the Viterbi selections of the final pass.
    #[inline(always)]
    pub fn viterbi(&self) -> &ViterbiSet {
        &self.viterbi
    }

    /// Writes the pruned lexical table, one `e f ln(p)` line per
    /// surviving pair.
    ///
    /// A pair survives when its probability exceeds the per-source
    /// maximum times 10^`beam_threshold`, or, with `add_viterbi`, when it
    /// was a Viterbi selection on the final pass. Lines are emitted in
    /// (source surface, target surface) order so repeated runs produce
    /// identical dumps.
    ///
    /// # Errors
    ///
    /// [`ObliqueError`](crate::errors::ObliqueError) is returned when
    /// writing fails.
    pub fn write_parameters<W>(
        &self,
        vocab: &Vocabulary,
        wtr: W,
        beam_threshold: f64,
        add_viterbi: bool,
    ) -> Result<()>
    where
        W: Write,
    {
        let mut wtr = BufWriter::new(wtr);
        let mut entries = self.ttable.sorted_entries();
        entries.sort_by(|a, b| vocab.surface(a.0).cmp(vocab.surface(b.0)));
        for (e, mut row) in entries {
            let max_p = row.iter().fold(f64::MIN, |acc, &(_, p)| acc.max(p));
            let threshold = max_p * 10f64.powf(beam_threshold);
            row.sort_by(|a, b| vocab.surface(a.0).cmp(vocab.surface(b.0)));
            for (f, p) in row {
                if p > threshold || (add_viterbi && self.viterbi.contains(e, f)) {
                    writeln!(
                        &mut wtr,
                        "{} {} {}",
                        vocab.surface(e),
                        vocab.surface(f),
                        p.ln()
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Writes the model in binary form.
    ///
    /// # Errors
    ///
    /// [`ObliqueError`](crate::errors::ObliqueError) is returned when the
    /// encoding fails.
    pub fn write<W>(&self, vocab: &Vocabulary, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        let data = ModelData {
            surfaces: vocab.surfaces().to_vec(),
            entries: self.ttable.sorted_entries(),
            mean_srclen_multiplier: self.mean_srclen_multiplier,
            params: self.params,
        };
        bincode::encode_into_std_write(&data, &mut wtr, common::bincode_config())?;
        Ok(())
    }

    /// Reads a model written by [`write`](Model::write), together with
    /// its vocabulary.
    ///
    /// The Viterbi set and the per-pass statistics are not stored in the
    /// binary form; the returned model has them empty.
    ///
    /// # Errors
    ///
    /// [`ObliqueError`](crate::errors::ObliqueError) is returned when the
    /// decoding fails.
    pub fn read<R>(mut rdr: R) -> Result<(Self, Vocabulary)>
    where
        R: Read,
    {
        let data: ModelData = bincode::decode_from_std_read(&mut rdr, common::bincode_config())?;
        let vocab = Vocabulary::from_surfaces(data.surfaces);
        let model = Self {
            ttable: TTable::from_entries(data.entries),
            viterbi: ViterbiSet::new(),
            mean_srclen_multiplier: data.mean_srclen_multiplier,
            stats: vec![],
            params: data.params,
        };
        Ok((model, vocab))
    }
}
