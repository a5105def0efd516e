//! Batch EM training of lexical translation tables.
//!
//! # Examples
//!
//! ```
//! use oblique::trainer::{Trainer, TrainerConfig};
//! use oblique::Vocabulary;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let corpus: &[u8] = b"the cat ||| le chat\nthe dog ||| le chien\n";
//!
//! let mut vocab = Vocabulary::new();
//! let mut alignments = vec![];
//! let model = Trainer::new(TrainerConfig::default())?
//!     .iterations(3)
//!     .train(&mut vocab, corpus, &mut alignments)?;
//!
//! // One alignment line per training pair, emitted on the final pass.
//! assert_eq!(String::from_utf8(alignments)?.lines().count(), 2);
//! // "chat" is only ever explained by "cat" and "the".
//! assert!(model.ttable().prob(vocab.get("cat").unwrap(), vocab.get("chat").unwrap()) > 0.1);
//! # Ok(())
//! # }
//! ```

mod config;
pub mod corpus;
mod model;

use std::fmt::Write as _;
use std::io::Write;

use crate::common::{WordId, NULL_WORD};
use crate::errors::{ObliqueError, Result};
use crate::prior;
use crate::ttable::TTable;
use crate::vocabulary::Vocabulary;

pub use crate::trainer::config::TrainerConfig;
pub use crate::trainer::corpus::{CorpusSource, FileSource, PairReader, SentencePair};
pub use crate::trainer::model::{IterationStats, Model, ViterbiSet};

pub(crate) use crate::trainer::model::AlignmentParams;

/// Trainer of alignment models.
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// Creates a new [`Trainer`] using the specified configuration.
    ///
    /// # Errors
    ///
    /// [`ObliqueError`] is returned when the configuration is
    /// inconsistent, e.g. variational Bayes with a non-positive alpha.
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Changes the number of EM passes over the corpus.
    ///
    /// Default to 5.
    pub fn iterations(mut self, n: u32) -> Self {
        self.config.iterations = n;
        self
    }

    /// Changes the probability mass reserved for the NULL word under the
    /// diagonal prior.
    ///
    /// Default to 0.08.
    ///
    /// # Panics
    ///
    /// The value must be in [0, 1).
    pub fn prob_align_null(mut self, p: f64) -> Self {
        assert!((0.0..1.0).contains(&p));
        self.config.prob_align_null = p;
        self
    }

    /// Changes the sharpness of the diagonal prior.
    ///
    /// Default to 4.0.
    ///
    /// # Panics
    ///
    /// The value must not be negative.
    pub fn diagonal_tension(mut self, tension: f64) -> Self {
        assert!(tension >= 0.0);
        self.config.diagonal_tension = tension;
        self
    }

    /// Changes the Dirichlet concentration of the variational-Bayes
    /// update.
    ///
    /// Default to 0.01.
    ///
    /// # Panics
    ///
    /// The value must be positive.
    pub fn alpha(mut self, alpha: f64) -> Self {
        assert!(alpha > 0.0);
        self.config.alpha = alpha;
        self
    }

    /// Runs EM over `corpus` and returns the trained model.
    ///
    /// The corpus is re-read from the start on every pass. On the final
    /// pass, per-pair Viterbi alignments are written to `align_wtr` (one
    /// line per pair, flushed per line) unless suppressed by the
    /// configuration. Per-pass likelihood statistics are reported on
    /// stderr and retained on the returned model.
    ///
    /// # Errors
    ///
    /// [`ObliqueError`] is returned when
    ///
    ///  - reading the corpus fails or a line is malformed, or
    ///  - writing an alignment line fails.
    pub fn train<S, W>(self, vocab: &mut Vocabulary, corpus: &S, mut align_wtr: W) -> Result<Model>
    where
        S: CorpusSource + ?Sized,
        W: Write,
    {
        let config = &self.config;
        let params = AlignmentParams {
            use_null: config.use_null(),
            favor_diagonal: config.favor_diagonal,
            prob_align_null: config.prob_align_null,
            diagonal_tension: config.diagonal_tension,
        };
        let write_alignments = config.write_alignments();

        let mut ttable = TTable::new();
        let mut viterbi = ViterbiSet::new();
        let mut stats = Vec::with_capacity(config.iterations as usize);
        let mut tot_len_ratio = 0.0;
        let mut mean_srclen_multiplier = 0.0;
        let mut probs: Vec<f64> = vec![];
        let mut align_line = String::new();

        for iter in 0..config.iterations {
            let final_iteration = iter + 1 == config.iterations;
            eprintln!(
                "ITERATION {}{}",
                iter + 1,
                if final_iteration { " (FINAL)" } else { "" }
            );
            let mut likelihood = 0f64;
            let mut denom = 0f64;
            let mut rdr = corpus.open()?;
            while let Some(pair) = rdr.next_pair(vocab)? {
                let SentencePair {
                    mut source,
                    mut target,
                } = pair;
                if config.reverse {
                    std::mem::swap(&mut source, &mut target);
                }
                if iter == 0 {
                    tot_len_ratio += target.len() as f64 / source.len() as f64;
                }
                denom += target.len() as f64;
                if probs.len() < source.len() + 1 {
                    probs.resize(source.len() + 1, 0.0);
                }
                align_line.clear();
                for (j, &f) in target.iter().enumerate() {
                    let sum =
                        fill_position_probs(&ttable, &params, &source, f, j, target.len(), &mut probs);
                    if sum <= 0.0 {
                        return Err(ObliqueError::invalid_format(
                            rdr.line_no(),
                            rdr.last_line().to_string(),
                            "no alignment has positive probability".to_string(),
                        ));
                    }
                    likelihood += sum.ln();
                    if !final_iteration {
                        if params.use_null {
                            ttable.increment(NULL_WORD, f, probs[0] / sum);
                        }
                        for (i, &e) in source.iter().enumerate() {
                            ttable.increment(e, f, probs[i + 1] / sum);
                        }
                    } else {
                        let mut max_index = 0;
                        let mut max_p = if params.use_null { probs[0] } else { -1.0 };
                        for i in 1..=source.len() {
                            if probs[i] > max_p {
                                max_p = probs[i];
                                max_index = i;
                            }
                        }
                        // NULL selections are recorded nowhere and emit
                        // no token.
                        if max_index > 0 {
                            viterbi.insert(source[max_index - 1], f);
                            if write_alignments {
                                if !align_line.is_empty() {
                                    align_line.push(' ');
                                }
                                if config.reverse {
                                    let _ = write!(align_line, "{}-{}", j, max_index - 1);
                                } else {
                                    let _ = write!(align_line, "{}-{}", max_index - 1, j);
                                }
                            }
                        }
                    }
                }
                if final_iteration && write_alignments {
                    writeln!(align_wtr, "{}", align_line)?;
                    align_wtr.flush()?;
                }
            }
            let line_count = rdr.line_no();

            let base2_likelihood = likelihood / std::f64::consts::LN_2;
            let cross_entropy = -base2_likelihood / denom;
            let perplexity = 2f64.powf(cross_entropy);
            eprintln!("  log_e likelihood: {likelihood}");
            eprintln!("  log_2 likelihood: {base2_likelihood}");
            eprintln!("     cross entropy: {cross_entropy}");
            eprintln!("        perplexity: {perplexity}");
            if iter == 0 {
                mean_srclen_multiplier = tot_len_ratio / line_count as f64;
                eprintln!("expected target length = source length * {mean_srclen_multiplier}");
            }
            stats.push(IterationStats {
                log_likelihood: likelihood,
                base2_likelihood,
                cross_entropy,
                perplexity,
            });

            if !final_iteration {
                if config.variational_bayes {
                    ttable.normalize_vb(config.alpha);
                } else {
                    ttable.normalize();
                }
            }
        }

        Ok(Model {
            ttable,
            viterbi,
            mean_srclen_multiplier,
            stats,
            params,
        })
    }
}

/// Fills `probs[0..=src.len()]` with the unnormalized posterior of every
/// alignment of the target word `f` at position `j`, and returns their
/// sum.
///
/// `probs[0]` is the NULL alignment (zero when NULL is disabled);
/// `probs[i]` for i >= 1 pairs `f` with `src[i - 1]`.
pub(crate) fn fill_position_probs(
    ttable: &TTable,
    params: &AlignmentParams,
    src: &[WordId],
    f: WordId,
    j: usize,
    trg_len: usize,
    probs: &mut [f64],
) -> f64 {
    let src_len = src.len();
    let uniform = 1.0 / (src_len + usize::from(params.use_null)) as f64;
    let mut sum = 0.0;
    probs[0] = 0.0;
    if params.use_null {
        let p_null = if params.favor_diagonal {
            params.prob_align_null
        } else {
            uniform
        };
        probs[0] = ttable.prob(NULL_WORD, f) * p_null;
        sum += probs[0];
    }
    if params.favor_diagonal {
        // The prior mass reserved for NULL exists only when NULL itself
        // does; without it the real positions carry everything.
        let mut az = prior::normalizer(src_len, j, trg_len, params.diagonal_tension);
        if params.use_null {
            az /= 1.0 - params.prob_align_null;
        }
        for (i, &e) in src.iter().enumerate() {
            let w = prior::unnormalized_prob(i + 1, src_len, j, trg_len, params.diagonal_tension);
            probs[i + 1] = ttable.prob(e, f) * w / az;
            sum += probs[i + 1];
        }
    } else {
        for (i, &e) in src.iter().enumerate() {
            probs[i + 1] = ttable.prob(e, f) * uniform;
            sum += probs[i + 1];
        }
    }
    sum
}
