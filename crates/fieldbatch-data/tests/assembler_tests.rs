// Tests for fieldbatch-data: Dataset, BatchAssembler, collation, errors

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use fieldbatch_core::{Array, DType, Error};
use fieldbatch_data::combinators::VecDataset;
use fieldbatch_data::dataset::Dataset;
use fieldbatch_data::loader::{AssemblerConfig, BatchAssembler};
use fieldbatch_data::record::Record;
use fieldbatch_data::Batch;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

// Simple field dataset for testing: record i has run_id "run_i",
// x of shape [3, 4] filled with i, and y of shape [2] = [i, -i].

struct FieldDataset {
    n: usize,
}

impl Dataset for FieldDataset {
    fn len(&self) -> usize {
        self.n
    }

    fn get(&self, index: usize) -> Record {
        let v = index as f64;
        Record::new()
            .with("run_id", format!("run_{index}"))
            .with("x", Array::new(vec![v; 12], (3, 4), DType::F64).unwrap())
            .with("y", Array::from_vec(vec![v, -v], DType::F64))
    }

    fn name(&self) -> &str {
        "fields"
    }
}

fn assembler(ds: &dyn Dataset, bs: usize, shuffle: bool, drop_last: bool) -> BatchAssembler<'_> {
    let config = AssemblerConfig::default()
        .batch_size(bs)
        .shuffle(shuffle)
        .drop_last(drop_last)
        .dtype(DType::F64);
    BatchAssembler::new(ds, config).unwrap()
}

fn run_ids(batch: &Batch) -> Vec<i64> {
    batch.identifiers("run_id").expect("missing run_id")
}

// Length and sizing

#[test]
fn test_length_matches_full_pass() {
    for n in [0usize, 1, 4, 5, 10] {
        for bs in 1..=4 {
            for drop_last in [false, true] {
                let ds = FieldDataset { n };
                let a = assembler(&ds, bs, false, drop_last);
                let produced = a.iter().count();
                assert_eq!(
                    a.num_batches(),
                    produced,
                    "n={n} bs={bs} drop_last={drop_last}"
                );
                let expected = if drop_last { n / bs } else { n.div_ceil(bs) };
                assert_eq!(produced, expected);
            }
        }
    }
}

#[test]
fn test_batch_sizes_with_short_tail() {
    let ds = FieldDataset { n: 7 };
    let a = assembler(&ds, 3, false, false);
    let sizes: Vec<usize> = a.iter().map(|b| b.unwrap().size()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[test]
fn test_batch_sizes_exact_multiple() {
    let ds = FieldDataset { n: 8 };
    let a = assembler(&ds, 4, false, false);
    let sizes: Vec<usize> = a.iter().map(|b| b.unwrap().size()).collect();
    assert_eq!(sizes, vec![4, 4]);
}

#[test]
fn test_empty_dataset_yields_nothing() {
    let ds = VecDataset::new(Vec::new(), "empty");
    let a = assembler(&ds, 4, true, false);
    assert_eq!(a.num_batches(), 0);
    assert!(a.is_empty());
    assert!(a.epoch_batches().unwrap().is_empty());
}

// Coverage and ordering

#[test]
fn test_sequential_order_is_identity() {
    let ds = FieldDataset { n: 5 };
    let a = assembler(&ds, 2, false, false);
    let ids: Vec<i64> = a.iter().flat_map(|b| run_ids(&b.unwrap())).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_drop_last_covers_floor_multiple() {
    let ds = FieldDataset { n: 10 };
    let a = assembler(&ds, 3, true, true);
    let ids: HashSet<i64> = a.iter().flat_map(|b| run_ids(&b.unwrap())).collect();
    assert_eq!(ids.len(), 9);
}

#[test]
fn test_shuffle_changes_order_but_covers_all() {
    let ds = FieldDataset { n: 100 };
    let a = assembler(&ds, 100, true, false);

    let pass1: Vec<i64> = a.iter().flat_map(|b| run_ids(&b.unwrap())).collect();
    let pass2: Vec<i64> = a.iter().flat_map(|b| run_ids(&b.unwrap())).collect();

    // With 100 records, the probability of two shuffles being identical is negligible
    assert_ne!(pass1, pass2, "shuffle should produce different orderings");

    for pass in [pass1, pass2] {
        let mut sorted = pass.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<i64>>());
    }
}

#[test]
fn test_seeded_shuffle_is_reproducible() {
    let ds = FieldDataset { n: 20 };
    let config = AssemblerConfig::default()
        .batch_size(6)
        .shuffle(true)
        .seed(1234);
    let a = BatchAssembler::new(&ds, config.clone()).unwrap();
    let b = BatchAssembler::new(&ds, config).unwrap();

    let ids_a: Vec<i64> = a.iter_epoch(3).flat_map(|b| run_ids(&b.unwrap())).collect();
    let ids_b: Vec<i64> = b.iter_epoch(3).flat_map(|b| run_ids(&b.unwrap())).collect();
    assert_eq!(ids_a, ids_b);
}

#[test]
fn test_injected_rng() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let ds = FieldDataset { n: 30 };
    let a = assembler(&ds, 30, true, false);
    let o1 = a.iter_with_rng(&mut StdRng::seed_from_u64(5)).order().to_vec();
    let o2 = a.iter_with_rng(&mut StdRng::seed_from_u64(5)).order().to_vec();
    assert_eq!(o1, o2);
    assert_ne!(o1, (0..30).collect::<Vec<usize>>());
}

// Shapes and encoding

#[test]
fn test_shapes_have_leading_batch_dim() {
    let ds = FieldDataset { n: 5 };
    let a = assembler(&ds, 2, false, false);
    let batches = a.epoch_batches().unwrap();
    assert_eq!(batches.len(), 3);

    for b in &batches {
        let bs = b.size();
        assert_eq!(b.get("x").unwrap().dims(), &[bs, 3, 4]);
        assert_eq!(b.get("y").unwrap().dims(), &[bs, 2]);
        assert_eq!(b.get("run_id").unwrap().dims(), &[bs]);
    }

    // Second batch: records 2 and 3
    let y = batches[1].get("y").unwrap();
    assert_eq!(y.to_f64_vec(), vec![2.0, -2.0, 3.0, -3.0]);
    assert_eq!(y.row(1).unwrap().to_f64_vec(), vec![3.0, -3.0]);
}

#[test]
fn test_single_record_batch_is_not_squeezed() {
    let ds = FieldDataset { n: 3 };
    let a = assembler(&ds, 1, false, false);
    for b in a.iter() {
        let b = b.unwrap();
        assert_eq!(b.get("x").unwrap().dims(), &[1, 3, 4]);
        assert_eq!(b.get("y").unwrap().dims(), &[1, 2]);
    }
}

#[test]
fn test_identifier_encoding() {
    let ds = VecDataset::new(
        vec![
            Record::new().with("run_id", "run_17").with("x", 0.0),
            Record::new().with("run_id", "sample_042").with("x", 1.0),
        ],
        "ids",
    );
    let a = BatchAssembler::new(&ds, AssemblerConfig::default().batch_size(2)).unwrap();
    let batch = a.epoch_batches().unwrap().remove(0);
    let ids = batch.get("run_id").unwrap();
    assert_eq!(ids.dtype(), DType::F64);
    assert_eq!(ids.to_f64_vec(), vec![17.0, 42.0]);
}

#[test]
fn test_large_identifiers_are_not_merged() {
    let ds = VecDataset::new(
        vec![
            Record::new()
                .with("run_id", "run_16777217")
                .with("x", Array::zeros(2, DType::F32)),
            Record::new()
                .with("run_id", "run_16777216")
                .with("x", Array::zeros(2, DType::F32)),
        ],
        "large-ids",
    );
    // Default dtype is F32, which cannot hold 16777217 exactly
    let a = BatchAssembler::new(&ds, AssemblerConfig::default().batch_size(2)).unwrap();
    let batch = a.epoch_batches().unwrap().remove(0);
    assert_eq!(batch.identifiers("run_id"), Some(vec![16777217, 16777216]));
    assert_eq!(batch.get("x").unwrap().dtype(), DType::F32);
}

#[test]
fn test_custom_identifier_field() {
    let ds = VecDataset::new(
        vec![Record::new().with("case", "case_8").with("run_id", 1.0)],
        "ids",
    );
    let config = AssemblerConfig::default().id_field("case");
    let a = BatchAssembler::new(&ds, config).unwrap();
    let batch = a.epoch_batches().unwrap().remove(0);
    assert_eq!(batch.identifiers("case"), Some(vec![8]));
    // "run_id" is an ordinary numeric field here
    assert_eq!(batch.get("run_id").unwrap().dims(), &[1]);
}

#[test]
fn test_field_sets_match_across_batches() {
    let ds = FieldDataset { n: 6 };
    let a = assembler(&ds, 4, false, false);
    for b in a.iter() {
        let names: Vec<String> = b.unwrap().field_names().map(String::from).collect();
        assert_eq!(names, vec!["run_id", "x", "y"]);
    }
}

// Errors

fn mismatched_dataset() -> VecDataset {
    VecDataset::new(
        vec![
            Record::new()
                .with("run_id", "run_0")
                .with("x", Array::zeros((3, 4), DType::F32)),
            Record::new()
                .with("run_id", "run_1")
                .with("x", Array::zeros((3, 5), DType::F32)),
        ],
        "bad",
    )
}

#[test]
fn test_shape_mismatch_in_same_batch_fails() {
    let ds = mismatched_dataset();
    let a = BatchAssembler::new(&ds, AssemblerConfig::default().batch_size(2)).unwrap();
    let mut it = a.iter();
    match it.next() {
        Some(Err(Error::ShapeMismatch {
            field, position, ..
        })) => {
            assert_eq!(field, "x");
            assert_eq!(position, 1);
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }
    // The pass ends after the error
    assert!(it.next().is_none());

    // The assembler itself stays usable
    assert!(a.epoch_batches().is_err());
}

#[test]
fn test_shape_mismatch_across_batches_is_fine() {
    let ds = mismatched_dataset();
    let a = BatchAssembler::new(&ds, AssemblerConfig::default().batch_size(1)).unwrap();
    let batches = a.epoch_batches().unwrap();
    assert_eq!(batches[0].get("x").unwrap().dims(), &[1, 3, 4]);
    assert_eq!(batches[1].get("x").unwrap().dims(), &[1, 3, 5]);
}

#[test]
fn test_bad_identifier_fails() {
    let ds = VecDataset::new(
        vec![
            Record::new().with("run_id", "run_1").with("x", 0.0),
            Record::new().with("run_id", "baseline").with("x", 0.0),
        ],
        "bad-ids",
    );
    let a = BatchAssembler::new(&ds, AssemblerConfig::default().batch_size(2)).unwrap();
    let err = a.epoch_batches().unwrap_err();
    assert!(matches!(err, Error::IdentifierFormat { .. }));
    assert_eq!(err.field(), Some("run_id"));
    assert_eq!(err.position(), Some(1));
    assert!(err.to_string().contains("baseline"));
}

#[test]
fn test_missing_field_fails() {
    let ds = VecDataset::new(
        vec![
            Record::new().with("x", 0.0).with("y", 0.0),
            Record::new().with("x", 1.0),
        ],
        "ragged",
    );
    let a = BatchAssembler::new(&ds, AssemblerConfig::default().batch_size(2)).unwrap();
    assert!(matches!(
        a.epoch_batches(),
        Err(Error::MissingField { position: 1, .. })
    ));
}

// Captures events emitted during a closure so tests can assert on them.

#[derive(Debug)]
struct CapturedEvent {
    level: Level,
    fields: BTreeMap<String, String>,
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}

fn warnings_while<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let layer = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    tracing::subscriber::with_default(subscriber, f);
    let events = std::mem::take(&mut *layer.events.lock().unwrap());
    events.into_iter().filter(|e| e.level == Level::WARN).collect()
}

#[test]
fn test_coercion_path_warns_once_per_field() {
    let ds = VecDataset::new(
        vec![
            Record::new()
                .with("run_id", "run_1")
                .with("x", 1.0)
                .with("y", Array::from_vec(vec![1.0, 2.0], DType::F64)),
            Record::new()
                .with("run_id", "run_2")
                .with("x", 2.0)
                .with("y", Array::from_vec(vec![3.0, 4.0], DType::F64)),
        ],
        "plain",
    );
    let a = BatchAssembler::new(&ds, AssemblerConfig::default().batch_size(2)).unwrap();

    let mut batches = Vec::new();
    let warnings = warnings_while(|| batches = a.epoch_batches().unwrap());

    assert_eq!(batches[0].get("x").unwrap().to_f64_vec(), vec![1.0, 2.0]);
    assert_eq!(batches[0].get("y").unwrap().dims(), &[2, 2]);

    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert_eq!(warnings[0].fields.get("field").map(String::as_str), Some("x"));
    assert_eq!(warnings[0].fields.get("coerced").map(String::as_str), Some("2"));
}

#[test]
fn test_array_fields_do_not_warn() {
    let ds = FieldDataset { n: 4 };
    let a = assembler(&ds, 2, false, false);

    let mut batches = Vec::new();
    let warnings = warnings_while(|| batches = a.epoch_batches().unwrap());

    assert_eq!(batches.len(), 2);
    assert!(warnings.is_empty(), "{warnings:?}");
}

// Sharing

#[test]
fn test_shared_dataset_across_threads() {
    let ds: Arc<dyn Dataset> = Arc::new(FieldDataset { n: 12 });

    let handles: Vec<_> = (0..3)
        .map(|t| {
            let ds = Arc::clone(&ds);
            std::thread::spawn(move || {
                let config = AssemblerConfig::default()
                    .batch_size(5)
                    .shuffle(true)
                    .seed(t);
                let a = BatchAssembler::new(&ds, config).unwrap();
                a.iter()
                    .map(|b| b.unwrap().size())
                    .sum::<usize>()
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap(), 12);
    }
}
