// Dataset trait — unified interface for any record source

use std::sync::Arc;

use crate::record::Record;

/// A dataset is an indexed collection of records.
///
/// Only two capabilities are required: a record count and random access by
/// index. In-memory vectors, memory-mapped stores, or lazy loaders all fit.
///
/// Implementations must be `Send + Sync` so independent assemblers can read
/// the same dataset from several threads.
pub trait Dataset: Send + Sync {
    /// Total number of records in the dataset.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve the record at position `index`.
    ///
    /// Repeated calls with the same index must return equivalent records.
    ///
    /// # Panics
    /// May panic if `index >= self.len()`.
    fn get(&self, index: usize) -> Record;

    /// Optional human-readable name.
    fn name(&self) -> &str {
        "dataset"
    }
}

impl<D: Dataset + ?Sized> Dataset for Box<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Record {
        (**self).get(index)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<D: Dataset + ?Sized> Dataset for Arc<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Record {
        (**self).get(index)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
