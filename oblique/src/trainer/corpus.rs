//! Streaming reader of parallel corpora.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use flate2::read::MultiGzDecoder;

use crate::common::WordId;
use crate::errors::{ObliqueError, Result};
use crate::vocabulary::Vocabulary;

/// Delimiter between the two sides of a corpus line.
pub const DELIMITER: &str = " ||| ";

/// A pair of interned sentences; both sides are non-empty.
#[derive(Debug)]
pub struct SentencePair {
    /// Source-side word identifiers.
    pub source: Vec<WordId>,

    /// Target-side word identifiers.
    pub target: Vec<WordId>,
}

/// A corpus that can be opened once per training pass.
///
/// Batch EM re-reads its input on every iteration, so the corpus is
/// represented by something that can hand out a fresh [`PairReader`] each
/// time rather than by a single `Read` sink.
pub trait CorpusSource {
    /// Opens the corpus for one sequential pass.
    fn open(&self) -> Result<PairReader<'_>>;
}

/// A corpus stored in the filesystem, possibly gzip-compressed.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Creates a source reading from `path`.
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }
}

impl CorpusSource for FileSource {
    fn open(&self) -> Result<PairReader<'_>> {
        let file = File::open(&self.path).map_err(|e| {
            ObliqueError::invalid_argument(
                "corpus",
                format!("failed to open {}: {}", self.path.display(), e),
            )
        })?;
        PairReader::new(file)
    }
}

impl CorpusSource for [u8] {
    fn open(&self) -> Result<PairReader<'_>> {
        PairReader::new(self)
    }
}

/// Streaming reader of sentence pairs.
///
/// Gzip input is recognized by its magic bytes and decoded transparently.
pub struct PairReader<'a> {
    rdr: Box<dyn BufRead + 'a>,
    line: String,
    line_no: usize,
}

impl<'a> PairReader<'a> {
    /// Wraps a raw byte stream, sniffing for gzip compression.
    pub fn new<R>(rdr: R) -> Result<Self>
    where
        R: Read + 'a,
    {
        let mut rdr = BufReader::new(rdr);
        let gzipped = rdr.fill_buf()?.starts_with(&[0x1f, 0x8b]);
        let rdr: Box<dyn BufRead + 'a> = if gzipped {
            Box::new(BufReader::new(MultiGzDecoder::new(rdr)))
        } else {
            Box::new(rdr)
        };
        Ok(Self {
            rdr,
            line: String::new(),
            line_no: 0,
        })
    }

    /// Reads the next sentence pair, interning its tokens into `vocab`.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// [`ObliqueError`] is returned when a line has no `" ||| "` delimiter
    /// or an empty side; the error carries the 1-based line number and the
    /// offending text.
    pub fn next_pair(&mut self, vocab: &mut Vocabulary) -> Result<Option<SentencePair>> {
        self.line.clear();
        if self.rdr.read_line(&mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while self.line.ends_with('\n') || self.line.ends_with('\r') {
            self.line.pop();
        }

        let (src_str, rest) = self.line.split_once(DELIMITER).ok_or_else(|| {
            ObliqueError::invalid_format(
                self.line_no,
                self.line.clone(),
                format!("expected two fields separated by {:?}", DELIMITER),
            )
        })?;
        // A third field, if any, is ignored.
        let trg_str = rest.split(DELIMITER).next().unwrap();

        let source: Vec<WordId> = src_str.split_whitespace().map(|w| vocab.intern(w)).collect();
        let target: Vec<WordId> = trg_str.split_whitespace().map(|w| vocab.intern(w)).collect();
        if source.is_empty() || target.is_empty() {
            return Err(ObliqueError::invalid_format(
                self.line_no,
                self.line.clone(),
                "both sides of a pair must be non-empty".to_string(),
            ));
        }

        Ok(Some(SentencePair { source, target }))
    }

    /// Returns the number of lines consumed so far.
    #[inline(always)]
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Returns the text of the most recently consumed line.
    #[inline(always)]
    pub fn last_line(&self) -> &str {
        &self.line
    }
}
