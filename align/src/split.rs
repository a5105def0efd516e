use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use oblique::trainer::{CorpusSource, FileSource};
use oblique::Vocabulary;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser, Debug)]
#[clap(
    name = "split",
    about = "Partition a parallel corpus into train/valid/test portions"
)]
struct Args {
    /// Corpus to partition. May be gzip-compressed.
    #[clap(short = 'c', long)]
    corpus: PathBuf,

    /// Destination of the training portion.
    #[clap(long)]
    train: PathBuf,

    /// Destination of the validation portion.
    #[clap(long)]
    valid: PathBuf,

    /// Destination of the test portion.
    #[clap(long)]
    test: PathBuf,

    /// Fraction of pairs routed to the validation portion.
    #[clap(long, default_value = "0.1")]
    valid_fraction: f64,

    /// Fraction of pairs routed to the test portion.
    #[clap(long, default_value = "0.1")]
    test_fraction: f64,

    /// Seed of the random routing, for reproducible splits.
    #[clap(short = 's', long)]
    seed: Option<u64>,
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::try_parse()?;
    for fraction in [args.valid_fraction, args.test_fraction] {
        if !(0.0..=1.0).contains(&fraction) {
            return Err("fractions must lie in [0, 1]".into());
        }
    }
    if args.valid_fraction + args.test_fraction > 1.0 {
        return Err("valid and test fractions must not exceed 1 together".into());
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut train_wtr = BufWriter::new(File::create(args.train)?);
    let mut valid_wtr = BufWriter::new(File::create(args.valid)?);
    let mut test_wtr = BufWriter::new(File::create(args.test)?);

    // Each pair is validated, then routed to one of the portions by a
    // single draw, so the corpus is never held in memory.
    let mut vocab = Vocabulary::new();
    let source = FileSource::new(args.corpus);
    let mut rdr = source.open()?;
    let mut counts = [0u64; 3];
    while rdr.next_pair(&mut vocab)?.is_some() {
        let draw: f64 = rng.gen();
        let (wtr, slot) = if draw < args.valid_fraction {
            (&mut valid_wtr, 0)
        } else if draw < args.valid_fraction + args.test_fraction {
            (&mut test_wtr, 1)
        } else {
            (&mut train_wtr, 2)
        };
        writeln!(wtr, "{}", rdr.last_line())?;
        counts[slot] += 1;
    }

    eprintln!(
        "{} valid, {} test, {} train pairs",
        counts[0], counts[1], counts[2]
    );

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        process::exit(1);
    }
}
