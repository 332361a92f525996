//! Shuffled record reader
//!
//! Approximates a uniformly random read order with a bounded pool of decoded
//! records sitting in front of a [`RecordReader`].
//!
//! ## Fill Policy
//! On every call the pool is topped up until it holds `capacity` records or
//! the stream is exhausted. One pooled record is then picked uniformly at
//! random and removed. With `capacity == 0` reads pass straight through.
//!
//! An upstream error stops all further pulls. Records already pooled are
//! still handed out in random order; the error is returned once the pool is
//! empty, in place of end of stream.
//!
//! The output order depends on the RNG; seed it for reproducible runs.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::error::{Result, TfRecordError};
use crate::payload::PayloadCodec;
use crate::reader::{ReaderState, RecordReader, RecordSource};

/// Reads records in pseudo-random order through a bounded pool
pub struct ShuffleReader<R: Read, G: Rng = StdRng> {
    reader: RecordReader<R>,
    pool: Vec<Bytes>,
    capacity: usize,
    rng: G,
    /// Upstream records pulled into the pool
    consumed: u64,
    /// Upstream failure held back until the pool drains
    pending_error: Option<TfRecordError>,
}

impl ShuffleReader<BufReader<File>, StdRng> {
    /// Open a file with an entropy-seeded shuffle pool
    pub fn open(path: &Path, check_integrity: bool, capacity: usize) -> Result<Self> {
        let reader = RecordReader::open(path, check_integrity)?;
        Ok(Self::new(reader, capacity))
    }

    /// Open a file using the reader and shuffle sections of `config`
    pub fn open_with_config(path: &Path, config: &Config) -> Result<Self> {
        let reader = RecordReader::open_with_config(path, config)?;
        Ok(Self::from_config(reader, config))
    }
}

impl<R: Read> ShuffleReader<R, StdRng> {
    /// Shuffle with an RNG seeded from OS entropy
    pub fn new(reader: RecordReader<R>, capacity: usize) -> Self {
        Self::with_rng(reader, capacity, StdRng::from_entropy())
    }

    /// Shuffle with a deterministic seed
    pub fn with_seed(reader: RecordReader<R>, capacity: usize, seed: u64) -> Self {
        Self::with_rng(reader, capacity, StdRng::seed_from_u64(seed))
    }

    /// Shuffle using `config.shuffle_buffer_size` and `config.shuffle_seed`
    pub fn from_config(reader: RecordReader<R>, config: &Config) -> Self {
        match config.shuffle_seed {
            Some(seed) => Self::with_seed(reader, config.shuffle_buffer_size, seed),
            None => Self::new(reader, config.shuffle_buffer_size),
        }
    }
}

impl<R: Read, G: Rng> ShuffleReader<R, G> {
    /// Shuffle with a caller-supplied RNG
    pub fn with_rng(reader: RecordReader<R>, capacity: usize, rng: G) -> Self {
        Self {
            reader,
            pool: Vec::with_capacity(capacity),
            capacity,
            rng,
            consumed: 0,
            pending_error: None,
        }
    }

    /// Next record decoded through `codec`
    pub fn read_item<C: PayloadCodec>(&mut self, codec: &C) -> Result<Option<C::Item>> {
        match self.read_next()? {
            Some(payload) => Ok(Some(codec.decode(&payload)?)),
            None => Ok(None),
        }
    }

    /// Pull from upstream until the pool is full or the stream ends
    fn fill(&mut self) -> Result<()> {
        while self.pool.len() < self.capacity && self.reader.state() != ReaderState::Exhausted {
            match self.reader.read_next()? {
                Some(record) => {
                    self.pool.push(record);
                    self.consumed += 1;
                }
                None => break,
            }
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Pool capacity in records (0 means passthrough)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records currently held in the pool
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }

    /// Upstream records pulled into the pool so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// The wrapped sequential reader
    pub fn inner(&self) -> &RecordReader<R> {
        &self.reader
    }
}

impl<R: Read, G: Rng> RecordSource for ShuffleReader<R, G> {
    fn read_next(&mut self) -> Result<Option<Bytes>> {
        if self.capacity == 0 {
            return self.reader.read_next();
        }

        if self.pending_error.is_none() {
            if let Err(e) = self.fill() {
                self.pending_error = Some(e);
            }
        }

        if !self.pool.is_empty() {
            let index = self.rng.gen_range(0..self.pool.len());
            return Ok(Some(self.pool.swap_remove(index)));
        }

        match self.pending_error.take() {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}
