use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use crate::errors::{ObliqueError, Result};

/// Configuration of a [`Trainer`](crate::Trainer) run.
///
/// Every option can also be supplied through a `key=value` configuration
/// file via [`merge_kv_reader`](TrainerConfig::merge_kv_reader).
#[derive(Clone, Debug)]
pub struct TrainerConfig {
    /// Path to the training corpus.
    pub input: Option<PathBuf>,

    /// Swaps the two sides of every pair before training.
    pub reverse: bool,

    /// Number of EM passes over the corpus.
    pub iterations: u32,

    /// Biases the alignment prior toward the sentence diagonal.
    pub favor_diagonal: bool,

    /// Mass reserved for the NULL word when the diagonal prior is active.
    pub prob_align_null: f64,

    /// Sharpness of the diagonal prior.
    pub diagonal_tension: f64,

    /// Re-estimates with a variational-Bayes update instead of maximum
    /// likelihood.
    pub variational_bayes: bool,

    /// Concentration of the symmetric Dirichlet prior used by the
    /// variational-Bayes update. Must be positive when enabled.
    pub alpha: f64,

    /// Disables the synthetic NULL source word.
    pub no_null_word: bool,

    /// Emits the pruned lexical table after training instead of per-pair
    /// alignments.
    pub output_parameters: bool,

    /// Pruning cutoff of the parameter dump, as a log10 ratio to the
    /// per-source maximum probability.
    pub beam_threshold: f64,

    /// Suppresses alignment emission on the final pass.
    pub hide_training_alignments: bool,

    /// Path to a held-out set scored after training.
    pub testset: Option<PathBuf>,

    /// Skips the Viterbi rescue during the parameter dump.
    pub no_add_viterbi: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            input: None,
            reverse: false,
            iterations: 5,
            favor_diagonal: false,
            prob_align_null: 0.08,
            diagonal_tension: 4.0,
            variational_bayes: false,
            alpha: 0.01,
            no_null_word: false,
            output_parameters: false,
            beam_threshold: -4.0,
            hide_training_alignments: false,
            testset: None,
            no_add_viterbi: false,
        }
    }
}

impl TrainerConfig {
    /// Overlays options read from a `key=value` configuration file.
    ///
    /// Empty lines and lines starting with `#` are skipped. Keys use the
    /// same names as the command-line options.
    ///
    /// # Errors
    ///
    /// [`ObliqueError`] is returned on an unknown key, a line without
    /// `=`, or an unparsable value.
    pub fn merge_kv_reader<R>(&mut self, rdr: R) -> Result<()>
    where
        R: Read,
    {
        for (i, line) in BufReader::new(rdr).lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            let body = line.trim();
            if body.is_empty() || body.starts_with('#') {
                continue;
            }
            let (key, value) = body.split_once('=').ok_or_else(|| {
                ObliqueError::invalid_format(line_no, line.clone(), "expected key=value")
            })?;
            self.set(key.trim(), value.trim(), line_no, &line)?;
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str, line_no: usize, line: &str) -> Result<()> {
        match key {
            "input" => self.input = Some(PathBuf::from(value)),
            "reverse" => self.reverse = parse_bool(value, line_no, line)?,
            "iterations" => self.iterations = value.parse()?,
            "favor_diagonal" => self.favor_diagonal = parse_bool(value, line_no, line)?,
            "prob_align_null" => self.prob_align_null = value.parse()?,
            "diagonal_tension" => self.diagonal_tension = value.parse()?,
            "variational_bayes" => self.variational_bayes = parse_bool(value, line_no, line)?,
            "alpha" => self.alpha = value.parse()?,
            "no_null_word" => self.no_null_word = parse_bool(value, line_no, line)?,
            "output_parameters" => self.output_parameters = parse_bool(value, line_no, line)?,
            "beam_threshold" => self.beam_threshold = value.parse()?,
            "hide_training_alignments" => {
                self.hide_training_alignments = parse_bool(value, line_no, line)?;
            }
            "testset" => self.testset = Some(PathBuf::from(value)),
            "no_add_viterbi" => self.no_add_viterbi = parse_bool(value, line_no, line)?,
            _ => {
                return Err(ObliqueError::invalid_format(
                    line_no,
                    line.to_string(),
                    format!("unknown option {:?}", key),
                ));
            }
        }
        Ok(())
    }

    /// Checks the mutual consistency of the options.
    pub fn validate(&self) -> Result<()> {
        if self.variational_bayes && self.alpha <= 0.0 {
            return Err(ObliqueError::invalid_argument(
                "alpha",
                "must be > 0 when variational_bayes is enabled",
            ));
        }
        Ok(())
    }

    /// Checks if the synthetic NULL word participates in alignment.
    #[inline(always)]
    pub fn use_null(&self) -> bool {
        !self.no_null_word
    }

    // Parameter output replaces alignment output.
    #[inline(always)]
    pub(crate) fn write_alignments(&self) -> bool {
        !self.hide_training_alignments && !self.output_parameters
    }
}

fn parse_bool(value: &str, line_no: usize, line: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ObliqueError::invalid_format(
            line_no,
            line.to_string(),
            format!("expected a boolean, got {:?}", value),
        )),
    }
}
