use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use oblique::scorer::score_testset;
use oblique::trainer::{FileSource, Model};

#[derive(Parser, Debug)]
#[clap(name = "score", about = "Score a held-out set under a trained model")]
struct Args {
    /// Binary model written by `align --model-out`.
    #[clap(short = 'm', long)]
    model_in: PathBuf,

    /// Held-out parallel corpus. May be gzip-compressed.
    #[clap(short = 't', long)]
    testset: PathBuf,

    /// Swap the two sides of every pair before scoring.
    #[clap(short = 'r', long)]
    reverse: bool,
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::try_parse()?;

    eprintln!("Loading the model...");
    let rdr = BufReader::new(File::open(args.model_in)?);
    let mut decoder = zstd::stream::Decoder::new(rdr)?;
    let (model, mut vocab) = Model::read(&mut decoder)?;

    let stdout = std::io::stdout();
    score_testset(
        &model,
        &mut vocab,
        &FileSource::new(args.testset),
        &mut stdout.lock(),
        args.reverse,
    )?;

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        process::exit(1);
    }
}
