// Field Batches Demo — assembling simulation fields into model batches
//
// Builds a small in-memory dataset of simulation runs. Each record holds a
// run identifier ("run_<n>"), a 2-channel 8×8 input field, and a 1-channel
// 8×8 target field. The demo then:
//   1. Normalizes the input field with a record transform
//   2. Splits the runs into train / validation subsets
//   3. Iterates shuffled training batches for a few epochs
//   4. Shows what a malformed record does to a pass
//
// Run with RUST_LOG=debug to see the per-pass log lines.

use fieldbatch_data::prelude::*;
use tracing_subscriber::EnvFilter;

const H: usize = 8;
const W: usize = 8;

fn simulation_run(i: usize) -> Result<Record> {
    let base = i as f64;
    let input: Vec<f64> = (0..2 * H * W).map(|k| base + (k % W) as f64).collect();
    let target: Vec<f64> = (0..H * W).map(|k| base * 0.5 + (k / W) as f64).collect();
    Ok(Record::new()
        .with("run_id", format!("run_{i}"))
        .with("x", Array::new(input, (2, H, W), DType::F32)?)
        .with("y", Array::new(target, (1, H, W), DType::F32)?))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== fieldbatch — Field Batches Demo ===");
    println!();

    // 1. Build and normalize the dataset
    let records = (0..23).map(simulation_run).collect::<Result<Vec<_>>>()?;
    let runs = MapDataset::new(
        VecDataset::new(records, "simulation-runs"),
        Box::new(Standardize::new("x", 15.0, 7.5)),
    );
    println!("Dataset: {} runs", runs.len());

    // 2. Split
    let splits = train_test_split(std::sync::Arc::new(runs), &[0.8, 0.2], 42)?;
    let (train, val) = (&splits[0], &splits[1]);
    println!("Split:   {} train / {} validation", train.len(), val.len());
    println!();

    // 3. Shuffled training passes
    let config = AssemblerConfig::default()
        .batch_size(4)
        .shuffle(true)
        .drop_last(true)
        .seed(7);
    let assembler = BatchAssembler::new(train, config)?;
    println!(
        "Training: batch_size=4, drop_last=true → {} batches per epoch",
        assembler.num_batches()
    );

    for epoch in 0..3 {
        let mut ids = Vec::new();
        for batch in assembler.iter_epoch(epoch) {
            let batch = batch?;
            ids.extend(batch.identifiers("run_id").unwrap_or_default());
            if ids.len() == batch.size() {
                let x = batch.get("x").map(|a| a.shape().to_string());
                let y = batch.get("y").map(|a| a.shape().to_string());
                println!(
                    "  epoch {epoch}: first batch x={} y={}",
                    x.unwrap_or_default(),
                    y.unwrap_or_default()
                );
            }
        }
        println!("  epoch {epoch}: run order {ids:?}");
    }
    println!();

    // Validation keeps every run, including the short final batch
    let val_assembler = BatchAssembler::new(val, AssemblerConfig::default().batch_size(4))?;
    for (i, batch) in val_assembler.iter().enumerate() {
        println!("Validation batch {i}: {} runs", batch?.size());
    }
    println!();

    // 4. A record whose identifier has no numeric suffix
    let broken = VecDataset::new(
        vec![simulation_run(0)?, simulation_run(1)?.with("run_id", "baseline")],
        "broken",
    );
    let broken_assembler = BatchAssembler::new(&broken, AssemblerConfig::default().batch_size(2))?;
    match broken_assembler.epoch_batches() {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Malformed record rejected: {e}"),
    }

    Ok(())
}
