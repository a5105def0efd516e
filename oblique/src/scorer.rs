//! Scoring of held-out sentence pairs under a trained model.

use std::fmt::Write as _;
use std::io::Write;

use crate::common::WordId;
use crate::errors::Result;
use crate::math;
use crate::trainer::corpus::CorpusSource;
use crate::trainer::{fill_position_probs, Model};
use crate::vocabulary::Vocabulary;

/// Scores every pair of `testset` under `model` and writes one line per
/// pair to `wtr`:
///
/// `<src tokens> ||| <trg tokens> ||| <alignment tokens> ||| <log prob>`
///
/// The score combines a Poisson prior on the target length with the
/// per-position alignment sums; the alignment field holds the
/// per-position argmax, where NULL selections emit no token. Pairs are
/// printed in file order even with `reverse` set. The accumulated total
/// is reported on stderr and returned.
///
/// # Errors
///
/// [`ObliqueError`](crate::errors::ObliqueError) is returned when reading
/// the testset or writing a line fails.
pub fn score_testset<S, W>(
    model: &Model,
    vocab: &mut Vocabulary,
    testset: &S,
    mut wtr: W,
    reverse: bool,
) -> Result<f64>
where
    S: CorpusSource + ?Sized,
    W: Write,
{
    let params = &model.params;
    let mut probs: Vec<f64> = vec![];
    let mut tokens = String::new();
    let mut total = 0.0;

    let mut rdr = testset.open()?;
    while let Some(pair) = rdr.next_pair(vocab)? {
        let first_text = surface_text(vocab, &pair.source);
        let second_text = surface_text(vocab, &pair.target);
        let (mut source, mut target) = (pair.source, pair.target);
        if reverse {
            std::mem::swap(&mut source, &mut target);
        }

        let lambda = 0.05 + source.len() as f64 * model.mean_srclen_multiplier();
        let mut log_prob = math::log_poisson(target.len(), lambda);
        if probs.len() < source.len() + 1 {
            probs.resize(source.len() + 1, 0.0);
        }
        tokens.clear();
        for (j, &f) in target.iter().enumerate() {
            let sum = fill_position_probs(model.ttable(), params, &source, f, j, target.len(), &mut probs);
            log_prob += sum.ln();

            // The initial candidate is NULL; the first strict improvement
            // wins.
            let mut a_j = 0;
            let mut max_p = probs[0];
            for i in 1..=source.len() {
                if probs[i] > max_p {
                    max_p = probs[i];
                    a_j = i;
                }
            }
            if a_j > 0 {
                if !tokens.is_empty() {
                    tokens.push(' ');
                }
                if reverse {
                    let _ = write!(tokens, "{}-{}", j, a_j - 1);
                } else {
                    let _ = write!(tokens, "{}-{}", a_j - 1, j);
                }
            }
        }

        writeln!(
            wtr,
            "{} ||| {} ||| {} ||| {}",
            first_text, second_text, tokens, log_prob
        )?;
        total += log_prob;
    }
    eprintln!("TOTAL LOG PROB {total}");
    Ok(total)
}

fn surface_text(vocab: &Vocabulary, words: &[WordId]) -> String {
    let mut text = String::new();
    for (i, &w) in words.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(vocab.surface(w));
    }
    text
}
