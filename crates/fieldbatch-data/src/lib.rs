//! # fieldbatch-data
//!
//! Datasets of keyed records and batch assembly for fieldbatch.
//!
//! This crate provides:
//! - [`Record`] / [`Value`] — one dataset entry, field name → array or identifier
//! - [`Dataset`] trait — count + random access, the only thing batching needs
//! - [`BatchAssembler`] — sequential or shuffled passes producing [`Batch`]es
//!   whose arrays carry a leading batch dimension
//! - [`collate`] — the per-group combination step (stacking, identifier encoding)
//   - Dataset combinators — SubsetDataset, ConcatDataset, MapDataset, VecDataset
//   - Record transforms — Scale, Standardize, Compose
//   - Train/test splitting with reproducible seeding

pub mod batch;
pub mod collate;
pub mod combinators;
pub mod dataset;
pub mod loader;
pub mod record;
pub mod transform;

pub use batch::Batch;
pub use collate::{collate, group_by_field, parse_identifier, MAX_EXACT_IDENTIFIER};
pub use combinators::{train_test_split, ConcatDataset, MapDataset, SubsetDataset, VecDataset};
pub use dataset::Dataset;
pub use loader::{AssemblerConfig, BatchAssembler, Batches, DEFAULT_ID_FIELD};
pub use record::{Record, Value};
pub use transform::{Compose, Scale, Standardize, Transform};

pub use fieldbatch_core::{Array, DType, Error, Result, Shape};

/// Everything needed to build a dataset and iterate batches.
pub mod prelude {
    pub use crate::batch::Batch;
    pub use crate::combinators::{
        train_test_split, ConcatDataset, MapDataset, SubsetDataset, VecDataset,
    };
    pub use crate::dataset::Dataset;
    pub use crate::loader::{AssemblerConfig, BatchAssembler};
    pub use crate::record::{Record, Value};
    pub use crate::transform::{Compose, Scale, Standardize, Transform};
    pub use fieldbatch_core::{Array, DType, Error, Result, Shape};
}
