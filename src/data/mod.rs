//! Data pipeline: streaming delimited dataset read in shuffled batches.
//! The file is indexed once at open (byte offset of every batch start over
//! non-blank lines); epochs then permute the batch order and seek, so
//! memory stays flat no matter the dataset size.

use crate::tensor::Scalar;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("batch size must be > 0")]
    ZeroBatchSize,
    #[error("dataset is empty: {0}")]
    Empty(String),
    #[error("invalid line (missing delimiter '{delimiter}'): {line}")]
    MissingDelimiter { delimiter: char, line: String },
    #[error("invalid line (empty x or y): {0}")]
    EmptySide(String),
    #[error("invalid float '{token}' in line: {line}")]
    Float { token: String, line: String },
}

pub type DataResult<T> = Result<T, DataError>;

pub const DEFAULT_DELIMITER: char = '|';
pub const DEFAULT_SEED: u64 = 42;

/// Streaming (x, y) sample reader. One sample per line, `X<delim>Y`,
/// whitespace-separated floats on each side; blank lines are skipped.
/// Shuffling permutes whole batches, reproducibly per seed.
pub struct StreamDataset {
    path: String,
    batch_size: usize,
    delimiter: char,
    rng: StdRng,
    reader: BufReader<File>,
    batch_offsets: Vec<u64>,
    batch_order: Vec<usize>,
    cur_batch_pos: usize,
    cur_in_batch: usize,
    num_samples: usize,
}

impl StreamDataset {
    /// Open with the default delimiter `|` and shuffle seed 42.
    pub fn open(path: impl AsRef<Path>, batch_size: usize) -> DataResult<Self> {
        Self::with_options(path, batch_size, DEFAULT_DELIMITER, DEFAULT_SEED)
    }

    pub fn with_options(
        path: impl AsRef<Path>,
        batch_size: usize,
        delimiter: char,
        seed: u64,
    ) -> DataResult<Self> {
        if batch_size == 0 {
            return Err(DataError::ZeroBatchSize);
        }
        let path_str = path.as_ref().display().to_string();
        let file = File::open(path.as_ref())?;
        let mut dataset = StreamDataset {
            path: path_str,
            batch_size,
            delimiter,
            rng: StdRng::seed_from_u64(seed),
            reader: BufReader::new(file),
            batch_offsets: Vec::new(),
            batch_order: Vec::new(),
            cur_batch_pos: 0,
            cur_in_batch: 0,
            num_samples: 0,
        };
        dataset.build_batch_offsets()?;
        dataset.batch_order = (0..dataset.batch_offsets.len()).collect();
        dataset.reset_epoch()?;
        Ok(dataset)
    }

    /// Number of batches per epoch.
    pub fn num_batches(&self) -> usize {
        self.batch_offsets.len()
    }

    /// Number of non-blank sample lines in the file.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Permute the batch order for a new training epoch and rewind.
    pub fn shuffle_epoch(&mut self) -> DataResult<()> {
        self.batch_order.shuffle(&mut self.rng);
        self.reset_epoch()
    }

    /// Rewind without reshuffling (validation passes).
    pub fn reset_epoch(&mut self) -> DataResult<()> {
        self.cur_batch_pos = 0;
        self.cur_in_batch = 0;
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Position the reader at the next batch. Returns false when the epoch
    /// is exhausted.
    pub fn next_batch(&mut self) -> DataResult<bool> {
        if self.cur_batch_pos >= self.batch_order.len() {
            return Ok(false);
        }
        self.cur_in_batch = 0;
        let offset = self.batch_offsets[self.batch_order[self.cur_batch_pos]];
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(true)
    }

    /// Read the next sample of the current batch into `x`/`y`. Returns
    /// false when the batch (or the file) is exhausted.
    pub fn next_sample(&mut self, x: &mut Vec<Scalar>, y: &mut Vec<Scalar>) -> DataResult<bool> {
        let mut line = String::new();
        loop {
            if self.cur_in_batch >= self.batch_size {
                self.cur_batch_pos += 1;
                return Ok(false);
            }

            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                self.cur_batch_pos += 1;
                return Ok(false);
            }

            if line.trim().is_empty() {
                continue;
            }

            self.parse_line(line.trim_end(), x, y)?;
            self.cur_in_batch += 1;
            return Ok(true);
        }
    }

    /// Concatenate the remaining samples of the current batch row-major
    /// into `xs`/`ys` (for callers that want one packed buffer per batch).
    pub fn pack(&mut self, xs: &mut Vec<Scalar>, ys: &mut Vec<Scalar>) -> DataResult<()> {
        xs.clear();
        ys.clear();
        let mut x = Vec::new();
        let mut y = Vec::new();
        while self.next_sample(&mut x, &mut y)? {
            xs.extend_from_slice(&x);
            ys.extend_from_slice(&y);
        }
        Ok(())
    }

    /// One pass over the file: record the byte offset of every batchSize-th
    /// non-blank line. Blank lines cost no batch slot.
    fn build_batch_offsets(&mut self) -> DataResult<()> {
        self.batch_offsets.clear();
        self.num_samples = 0;
        self.reader.seek(SeekFrom::Start(0))?;

        let mut pos: u64 = 0;
        let mut line = String::new();
        loop {
            line.clear();
            let bytes = self.reader.read_line(&mut line)?;
            if bytes == 0 {
                break;
            }
            if !line.trim().is_empty() {
                if self.num_samples % self.batch_size == 0 {
                    self.batch_offsets.push(pos);
                }
                self.num_samples += 1;
            }
            pos += bytes as u64;
        }

        if self.batch_offsets.is_empty() {
            return Err(DataError::Empty(self.path.clone()));
        }
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    fn parse_line(&self, line: &str, x: &mut Vec<Scalar>, y: &mut Vec<Scalar>) -> DataResult<()> {
        let split = line.find(self.delimiter).ok_or_else(|| {
            DataError::MissingDelimiter {
                delimiter: self.delimiter,
                line: line.to_string(),
            }
        })?;
        let (left, right) = line.split_at(split);
        parse_floats(left, line, x)?;
        parse_floats(&right[self.delimiter.len_utf8()..], line, y)?;
        if x.is_empty() || y.is_empty() {
            return Err(DataError::EmptySide(line.to_string()));
        }
        Ok(())
    }
}

fn parse_floats(side: &str, line: &str, out: &mut Vec<Scalar>) -> DataResult<()> {
    out.clear();
    for token in side.split_whitespace() {
        let value = token.parse::<Scalar>().map_err(|_| DataError::Float {
            token: token.to_string(),
            line: line.to_string(),
        })?;
        out.push(value);
    }
    Ok(())
}
