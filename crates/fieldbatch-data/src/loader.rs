// BatchAssembler — batching, shuffling, iteration

use std::iter::FusedIterator;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng, SeedableRng};
use tracing::{debug, trace};

use fieldbatch_core::{DType, Error, Result};

use crate::batch::Batch;
use crate::collate::collate;
use crate::dataset::Dataset;
use crate::record::Record;
use crate::transform::Transform;

/// Default name of the identifier field.
pub const DEFAULT_ID_FIELD: &str = "run_id";

/// Configuration for the BatchAssembler.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Number of records per batch. Must be at least 1.
    pub batch_size: usize,
    /// Whether to draw a fresh random permutation of the records per pass.
    pub shuffle: bool,
    /// Whether to drop the last incomplete batch.
    pub drop_last: bool,
    /// Optional random seed for reproducible shuffling.
    pub seed: Option<u64>,
    /// DType for the stacked numeric fields. Identifiers are always F64.
    pub dtype: DType,
    /// Field whose `<prefix>_<integer>` strings are encoded as floats.
    pub id_field: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            shuffle: false,
            drop_last: false,
            seed: None,
            dtype: DType::F32,
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }
}

impl AssemblerConfig {
    pub fn batch_size(mut self, bs: usize) -> Self {
        self.batch_size = bs;
        self
    }

    pub fn shuffle(mut self, s: bool) -> Self {
        self.shuffle = s;
        self
    }

    pub fn drop_last(mut self, d: bool) -> Self {
        self.drop_last = d;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = Some(s);
        self
    }

    pub fn dtype(mut self, d: DType) -> Self {
        self.dtype = d;
        self
    }

    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = name.into();
        self
    }

    /// Number of batches a full pass over `n` records yields.
    ///
    /// Callers must ensure `batch_size >= 1`; `BatchAssembler::new` checks it.
    pub fn num_batches(&self, n: usize) -> usize {
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }
}

/// A BatchAssembler wraps a Dataset and produces batches of stacked arrays.
///
/// Each pass is independent: it picks its own traversal order (identity, or
/// a fresh permutation when shuffling), groups records `batch_size` at a
/// time, and collates each group into a [`Batch`]. Nothing carries over
/// between passes.
///
/// ```ignore
/// let assembler = BatchAssembler::new(
///     &dataset,
///     AssemblerConfig::default().batch_size(16).shuffle(true).seed(7),
/// )?;
/// for epoch in 0..10 {
///     for batch in assembler.iter_epoch(epoch) {
///         let batch = batch?;
///         let x = batch.get("x").unwrap(); // [16, C, H, W]
///     }
/// }
/// ```
pub struct BatchAssembler<'a> {
    dataset: &'a dyn Dataset,
    config: AssemblerConfig,
    transforms: Vec<Box<dyn Transform>>,
}

impl<'a> BatchAssembler<'a> {
    /// Create a new BatchAssembler over a dataset.
    ///
    /// Fails with `InvalidBatchSize` if `config.batch_size` is 0. The dataset
    /// contents are not inspected until iteration.
    pub fn new(dataset: &'a dyn Dataset, config: AssemblerConfig) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(Error::InvalidBatchSize {
                batch_size: config.batch_size,
            });
        }
        Ok(Self {
            dataset,
            config,
            transforms: Vec::new(),
        })
    }

    /// Add a transform to apply to each record as it is fetched.
    pub fn with_transform(mut self, t: Box<dyn Transform>) -> Self {
        self.transforms.push(t);
        self
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// The number of batches per pass.
    pub fn num_batches(&self) -> usize {
        self.config.num_batches(self.dataset.len())
    }

    /// Total number of records.
    pub fn num_records(&self) -> usize {
        self.dataset.len()
    }

    /// Whether a pass yields no batches at all.
    pub fn is_empty(&self) -> bool {
        self.num_batches() == 0
    }

    /// Start a pass.
    ///
    /// With a configured seed the shuffle order is the same on every call;
    /// use [`iter_epoch`](Self::iter_epoch) to get a different but still
    /// reproducible order per epoch. Without a seed each call draws from the
    /// thread-local generator.
    pub fn iter(&self) -> Batches<'_, 'a> {
        match self.config.seed {
            Some(seed) => self.iter_with_rng(&mut StdRng::seed_from_u64(seed)),
            None => self.iter_with_rng(&mut thread_rng()),
        }
    }

    /// Start the pass for a numbered epoch, seeding the shuffle from
    /// `seed + epoch` when a seed is configured.
    pub fn iter_epoch(&self, epoch: u64) -> Batches<'_, 'a> {
        match self.config.seed {
            Some(seed) => self.iter_with_rng(&mut StdRng::seed_from_u64(seed.wrapping_add(epoch))),
            None => self.iter_with_rng(&mut thread_rng()),
        }
    }

    /// Start a pass that shuffles with the given random source.
    ///
    /// The generator is only consulted when `shuffle` is on.
    pub fn iter_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Batches<'_, 'a> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.config.shuffle {
            order.shuffle(rng);
        }

        debug!(
            dataset = self.dataset.name(),
            records = order.len(),
            batches = self.num_batches(),
            batch_size = self.config.batch_size,
            shuffle = self.config.shuffle,
            drop_last = self.config.drop_last,
            "starting pass"
        );

        Batches {
            assembler: self,
            order,
            cursor: 0,
            batch_idx: 0,
        }
    }

    /// Produce all batches for one pass, stopping at the first error.
    pub fn epoch_batches(&self) -> Result<Vec<Batch>> {
        self.iter().collect()
    }

    /// Fetch one record and run it through the registered transforms.
    fn fetch(&self, index: usize) -> Record {
        let mut record = self.dataset.get(index);
        for t in &self.transforms {
            record = t.apply(record);
        }
        record
    }
}

impl<'l, 'a> IntoIterator for &'l BatchAssembler<'a> {
    type Item = Result<Batch>;
    type IntoIter = Batches<'l, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator that yields one batch at a time for a single pass.
///
/// Batches are built lazily on `next`. After an error the pass ends and
/// the iterator returns `None`.
pub struct Batches<'l, 'a> {
    assembler: &'l BatchAssembler<'a>,
    order: Vec<usize>,
    cursor: usize,
    batch_idx: usize,
}

impl<'l, 'a> Batches<'l, 'a> {
    /// The traversal order of this pass.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    fn remaining(&self) -> usize {
        let rest = self.order.len() - self.cursor;
        let config = &self.assembler.config;
        if config.drop_last {
            rest / config.batch_size
        } else {
            rest.div_ceil(config.batch_size)
        }
    }
}

impl<'l, 'a> Iterator for Batches<'l, 'a> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let config = &self.assembler.config;
        let n = self.order.len();
        let start = self.cursor;

        if start >= n {
            return None;
        }

        let end = (start + config.batch_size).min(n);
        if config.drop_last && end - start < config.batch_size {
            self.cursor = n;
            return None;
        }
        self.cursor = end;

        let records: Vec<Record> = self.order[start..end]
            .iter()
            .map(|&i| self.assembler.fetch(i))
            .collect();

        match collate(records, &config.id_field, config.dtype) {
            Ok(batch) => {
                trace!(batch = self.batch_idx, size = batch.size(), "assembled batch");
                self.batch_idx += 1;
                Some(Ok(batch))
            }
            Err(e) => {
                debug!(batch = self.batch_idx, error = %e, "aborting pass");
                self.cursor = n;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // An error ends the pass early, so only one more item is guaranteed.
        let remaining = self.remaining();
        (remaining.min(1), Some(remaining))
    }
}

impl<'l, 'a> FusedIterator for Batches<'l, 'a> {}
