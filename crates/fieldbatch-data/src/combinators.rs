// Dataset Combinators — compose, subset, concatenate datasets

use fieldbatch_core::{bail, Result};

use crate::dataset::Dataset;
use crate::record::Record;
use crate::transform::Transform;

// SubsetDataset — view of selected indices

/// A dataset that exposes only the records at the given indices.
///
/// This is useful for train/val/test splitting.
pub struct SubsetDataset<D: Dataset> {
    inner: D,
    indices: Vec<usize>,
}

impl<D: Dataset> SubsetDataset<D> {
    /// Create a subset of `inner` containing only the records at `indices`.
    ///
    /// # Panics
    /// Panics (lazily, at `get` time) if any index is out of range.
    pub fn new(inner: D, indices: Vec<usize>) -> Self {
        Self { inner, indices }
    }

    /// Indices into the inner dataset, in subset order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl<D: Dataset> Dataset for SubsetDataset<D> {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn get(&self, index: usize) -> Record {
        self.inner.get(self.indices[index])
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// ConcatDataset — concatenate multiple datasets

/// Concatenate datasets end-to-end.
///
/// All datasets are expected to share the same field set; this is not
/// checked here and surfaces at batch assembly if violated.
pub struct ConcatDataset {
    datasets: Vec<Box<dyn Dataset>>,
    cumulative_sizes: Vec<usize>,
}

impl ConcatDataset {
    pub fn new(datasets: Vec<Box<dyn Dataset>>) -> Self {
        let mut cumulative_sizes = Vec::with_capacity(datasets.len());
        let mut total = 0;
        for ds in &datasets {
            total += ds.len();
            cumulative_sizes.push(total);
        }

        Self {
            datasets,
            cumulative_sizes,
        }
    }

    /// Locate which dataset and local index a global index maps to.
    fn locate(&self, index: usize) -> (usize, usize) {
        // First dataset whose cumulative size exceeds `index`
        let ds_idx = self.cumulative_sizes.partition_point(|&cum| cum <= index);
        if ds_idx == self.cumulative_sizes.len() {
            panic!(
                "ConcatDataset: index {} out of range (total {})",
                index,
                self.len()
            );
        }
        let offset = if ds_idx == 0 {
            0
        } else {
            self.cumulative_sizes[ds_idx - 1]
        };
        (ds_idx, index - offset)
    }
}

impl Dataset for ConcatDataset {
    fn len(&self) -> usize {
        *self.cumulative_sizes.last().unwrap_or(&0)
    }

    fn get(&self, index: usize) -> Record {
        let (ds_idx, local_idx) = self.locate(index);
        self.datasets[ds_idx].get(local_idx)
    }

    fn name(&self) -> &str {
        "concat"
    }
}

// MapDataset — apply a transform lazily

/// Wraps a dataset and applies a `Transform` lazily on each `get()`.
pub struct MapDataset<D: Dataset> {
    inner: D,
    transform: Box<dyn Transform>,
}

impl<D: Dataset> MapDataset<D> {
    pub fn new(inner: D, transform: Box<dyn Transform>) -> Self {
        Self { inner, transform }
    }
}

impl<D: Dataset> Dataset for MapDataset<D> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get(&self, index: usize) -> Record {
        self.transform.apply(self.inner.get(index))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// VecDataset — in-memory dataset

/// A simple in-memory dataset backed by a `Vec<Record>`.
#[derive(Debug, Clone)]
pub struct VecDataset {
    records: Vec<Record>,
    dataset_name: String,
}

impl VecDataset {
    /// Create a VecDataset from a vector of records. An empty vector is a
    /// valid, empty dataset.
    pub fn new(records: Vec<Record>, name: &str) -> Self {
        Self {
            records,
            dataset_name: name.to_string(),
        }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl Dataset for VecDataset {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&self, index: usize) -> Record {
        self.records[index].clone()
    }

    fn name(&self) -> &str {
        &self.dataset_name
    }
}

// Train / Validation / Test Split

/// Split a dataset into (train, val) or (train, val, test) subsets.
///
/// Returns `SubsetDataset` views over the original dataset.
///
/// # Arguments
/// * `dataset` — the source dataset
/// * `ratios` — slice of 2 or 3 floats that sum to 1.0, e.g. `[0.8, 0.2]`
///   or `[0.7, 0.15, 0.15]`
/// * `seed` — random seed for reproducible shuffling of indices
pub fn train_test_split<D>(dataset: D, ratios: &[f64], seed: u64) -> Result<Vec<SubsetDataset<D>>>
where
    D: Dataset + Clone,
{
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    if !(2..=3).contains(&ratios.len()) {
        bail!(
            "train_test_split: ratios must have 2 or 3 elements, got {}",
            ratios.len()
        );
    }
    let sum: f64 = ratios.iter().sum();
    if (sum - 1.0).abs() >= 1e-6 || ratios.iter().any(|&r| r < 0.0) {
        bail!(
            "train_test_split: ratios must be non-negative and sum to 1.0, got {:?}",
            ratios
        );
    }

    let n = dataset.len();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut splits = Vec::with_capacity(ratios.len());
    let mut offset = 0;
    for (i, &ratio) in ratios.iter().enumerate() {
        let count = if i == ratios.len() - 1 {
            n - offset // remainder goes to the last split
        } else {
            (n as f64 * ratio).round() as usize
        };
        let end = (offset + count).min(n);
        splits.push(SubsetDataset::new(
            dataset.clone(),
            indices[offset..end].to_vec(),
        ));
        offset = end;
    }

    Ok(splits)
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    /// Tiny helper dataset for testing.
    #[derive(Clone)]
    struct TinyDataset {
        n: usize,
    }

    impl Dataset for TinyDataset {
        fn len(&self) -> usize {
            self.n
        }
        fn get(&self, idx: usize) -> Record {
            Record::new()
                .with("run_id", format!("run_{idx}"))
                .with("x", idx as f64)
        }
    }

    fn x_of(r: &Record) -> f64 {
        match r.get("x") {
            Some(Value::Scalar(v)) => *v,
            other => panic!("unexpected x: {other:?}"),
        }
    }

    #[test]
    fn subset_dataset() {
        let ds = TinyDataset { n: 10 };
        let sub = SubsetDataset::new(ds, vec![2, 5, 7]);
        assert_eq!(sub.len(), 3);
        assert_eq!(x_of(&sub.get(0)), 2.0);
        assert_eq!(x_of(&sub.get(1)), 5.0);
        assert_eq!(x_of(&sub.get(2)), 7.0);
    }

    #[test]
    fn concat_dataset() {
        let ds1 = TinyDataset { n: 5 };
        let ds2 = TinyDataset { n: 3 };
        let concat = ConcatDataset::new(vec![Box::new(ds1), Box::new(ds2)]);
        assert_eq!(concat.len(), 8);
        assert_eq!(x_of(&concat.get(0)), 0.0);
        assert_eq!(x_of(&concat.get(4)), 4.0);
        assert_eq!(x_of(&concat.get(5)), 0.0); // ds2 index 0
        assert_eq!(x_of(&concat.get(7)), 2.0); // ds2 index 2
    }

    #[test]
    fn concat_skips_empty_members() {
        let concat = ConcatDataset::new(vec![
            Box::new(TinyDataset { n: 0 }),
            Box::new(TinyDataset { n: 2 }),
        ]);
        assert_eq!(concat.len(), 2);
        assert_eq!(x_of(&concat.get(1)), 1.0);
        assert!(ConcatDataset::new(Vec::new()).is_empty());
    }

    #[test]
    fn map_dataset() {
        use crate::transform::Scale;
        let mapped = MapDataset::new(TinyDataset { n: 4 }, Box::new(Scale::new("x", 0.1)));
        assert_eq!(mapped.len(), 4);
        assert!((x_of(&mapped.get(2)) - 0.2).abs() < 1e-10);
    }

    #[test]
    fn vec_dataset() {
        let mut ds = VecDataset::new(Vec::new(), "test");
        assert!(ds.is_empty());
        ds.push(Record::new().with("x", 1.0));
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.name(), "test");
        assert_eq!(x_of(&ds.get(0)), 1.0);
    }

    #[test]
    fn train_test_split_two_way() {
        let splits = train_test_split(TinyDataset { n: 100 }, &[0.8, 0.2], 42).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].len(), 80);
        assert_eq!(splits[1].len(), 20);
    }

    #[test]
    fn train_test_split_three_way_is_disjoint() {
        let splits = train_test_split(TinyDataset { n: 100 }, &[0.7, 0.15, 0.15], 42).unwrap();
        let mut all: Vec<usize> = splits.iter().flat_map(|s| s.indices().to_vec()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn train_test_split_reproducible() {
        let s1 = train_test_split(TinyDataset { n: 50 }, &[0.8, 0.2], 123).unwrap();
        let s2 = train_test_split(TinyDataset { n: 50 }, &[0.8, 0.2], 123).unwrap();
        assert_eq!(s1[0].indices(), s2[0].indices());
    }

    #[test]
    fn train_test_split_rejects_bad_ratios() {
        assert!(train_test_split(TinyDataset { n: 10 }, &[1.0], 0).is_err());
        assert!(train_test_split(TinyDataset { n: 10 }, &[0.5, 0.4], 0).is_err());
    }
}
