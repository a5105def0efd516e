use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use oblique::scorer::score_testset;
use oblique::trainer::{FileSource, Trainer, TrainerConfig};
use oblique::Vocabulary;

#[derive(Parser, Debug)]
#[clap(name = "align", about = "Diagonal-prior word alignment trainer")]
struct Args {
    /// Parallel corpus with one `src ||| trg` pair per line. May be
    /// gzip-compressed.
    #[clap(short = 'i', long)]
    input: Option<PathBuf>,

    /// Configuration file with `key=value` lines; explicit command-line
    /// options take precedence.
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// Swap the two sides of every pair before training.
    #[clap(short = 'r', long)]
    reverse: bool,

    /// Number of EM passes over the corpus.
    #[clap(short = 'I', long)]
    iterations: Option<u32>,

    /// Bias the alignment prior toward the sentence diagonal.
    #[clap(short = 'd', long)]
    favor_diagonal: bool,

    /// Probability mass reserved for the NULL word under the diagonal
    /// prior.
    #[clap(short = 'q', long)]
    prob_align_null: Option<f64>,

    /// Sharpness of the diagonal prior.
    #[clap(short = 'T', long)]
    diagonal_tension: Option<f64>,

    /// Re-estimate with a variational-Bayes update instead of maximum
    /// likelihood.
    #[clap(short = 'v', long)]
    variational_bayes: bool,

    /// Dirichlet concentration of the variational-Bayes update. Must be
    /// positive.
    #[clap(short = 'a', long)]
    alpha: Option<f64>,

    /// Disable the synthetic NULL source word.
    #[clap(short = 'n', long)]
    no_null_word: bool,

    /// Print the pruned lexical table after training instead of
    /// alignments.
    #[clap(short = 'p', long)]
    output_parameters: bool,

    /// Pruning threshold of the parameter dump, as a log10 ratio to the
    /// per-source maximum probability.
    #[clap(short = 'b', long)]
    beam_threshold: Option<f64>,

    /// Do not print alignments on the final pass.
    #[clap(short = 'H', long)]
    hide_training_alignments: bool,

    /// Held-out set to score after training.
    #[clap(short = 't', long)]
    testset: Option<PathBuf>,

    /// Skip the Viterbi rescue during the parameter dump.
    #[clap(long)]
    no_add_viterbi: bool,

    /// File to which the trained model is written in binary form,
    /// compressed by zstd.
    #[clap(short = 'o', long)]
    model_out: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(TrainerConfig, Option<PathBuf>), Box<dyn Error>> {
        let mut config = TrainerConfig::default();
        if let Some(path) = &self.config {
            config.merge_kv_reader(File::open(path)?)?;
        }
        if let Some(input) = self.input {
            config.input = Some(input);
        }
        if self.reverse {
            config.reverse = true;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if self.favor_diagonal {
            config.favor_diagonal = true;
        }
        if let Some(prob_align_null) = self.prob_align_null {
            config.prob_align_null = prob_align_null;
        }
        if let Some(diagonal_tension) = self.diagonal_tension {
            config.diagonal_tension = diagonal_tension;
        }
        if self.variational_bayes {
            config.variational_bayes = true;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if self.no_null_word {
            config.no_null_word = true;
        }
        if self.output_parameters {
            config.output_parameters = true;
        }
        if let Some(beam_threshold) = self.beam_threshold {
            config.beam_threshold = beam_threshold;
        }
        if self.hide_training_alignments {
            config.hide_training_alignments = true;
        }
        if let Some(testset) = self.testset {
            config.testset = Some(testset);
        }
        if self.no_add_viterbi {
            config.no_add_viterbi = true;
        }
        Ok((config, self.model_out))
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::try_parse()?;
    let (config, model_out) = args.into_config()?;
    let input = config
        .input
        .clone()
        .ok_or("missing required option --input")?;

    let trainer = Trainer::new(config.clone())?;
    let corpus = FileSource::new(input);
    let mut vocab = Vocabulary::new();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let model = trainer.train(&mut vocab, &corpus, &mut out)?;

    if config.output_parameters {
        model.write_parameters(&vocab, &mut out, config.beam_threshold, !config.no_add_viterbi)?;
    }
    if let Some(testset) = &config.testset {
        score_testset(
            &model,
            &mut vocab,
            &FileSource::new(testset.clone()),
            &mut out,
            config.reverse,
        )?;
    }
    if let Some(path) = model_out {
        let mut encoder = zstd::stream::Encoder::new(File::create(path)?, 19)?;
        model.write(&vocab, &mut encoder)?;
        encoder.finish()?;
    }
    out.flush()?;

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        process::exit(1);
    }
}
