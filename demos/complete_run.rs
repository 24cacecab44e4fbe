//! Complete Reparto Pipeline: Datasets → Trials → Batch Result
//!
//! This example demonstrates the complete workflow:
//! 1. Register synthetic microarray-shaped datasets
//! 2. Configure a repeated-holdout run
//! 3. Fan trials out over the worker pool
//! 4. Aggregate and persist the batch result
//!
//! Run with: cargo run --example complete_run --release

use std::sync::Arc;
use std::time::Instant;

use reparto::config::RunConfig;
use reparto::dataset::{CachedSource, Dataset, InMemorySource};
use reparto::matrix::Matrix;
use reparto::report::BatchResult;
use reparto::telemetry::TracingSink;
use reparto::Harness;

/// Synthetic two-class dataset with a handful of informative variables.
#[allow(clippy::cast_precision_loss)]
fn synthetic_dataset(id: &str, rows: usize, cols: usize, shift: f64) -> Dataset {
    let mut data = Vec::with_capacity(rows * cols);
    let mut labels = Vec::with_capacity(rows);
    for i in 0..rows {
        let class = i % 2;
        labels.push(class);
        for j in 0..cols {
            let noise = ((i * 31 + j * 17) % 101) as f64 * 0.02;
            data.push(if j < 10 && class == 1 { shift + noise } else { noise });
        }
    }
    Dataset::new(
        id,
        Matrix::from_vec(data, rows, cols).expect("demo matrix shape"),
        labels,
        vec!["healthy".to_string(), "tumor".to_string()],
    )
    .expect("demo dataset")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== STEP 1: DATASETS =======================================");
    let mut inner = InMemorySource::new();
    for (i, shift) in [1.5, 2.0, 3.0].iter().enumerate() {
        let id = format!("microarray-{i}");
        let dataset = synthetic_dataset(&id, 80, 2_000, *shift);
        println!(
            "  {id}: {} rows x {} variables, {} classes",
            dataset.features().rows(),
            dataset.features().cols(),
            dataset.n_classes()
        );
        inner.insert(dataset);
    }
    let source = Arc::new(CachedSource::new(inner));

    println!("=== STEP 2: CONFIGURATION ==================================");
    let config = RunConfig::builder()
        .datasets(["microarray-0", "microarray-1", "microarray-2"])
        .repetitions(20)
        .train_fraction(0.67)
        .top_k_variables(200)
        .num_gamma_grid_points(4)
        .build()?;
    println!(
        "  {} datasets x {} repetitions, train fraction {:.2}, {} workers",
        config.dataset_ids().len(),
        config.repetitions(),
        config.train_fraction(),
        config.worker_count()
    );

    println!("=== STEP 3: TRIAL FAN-OUT ==================================");
    let harness = Harness::new(config, source, Arc::new(TracingSink))?;
    let start = Instant::now();
    let destination = std::env::temp_dir().join("reparto-demo-batch.json");
    let batch = harness.execute_and_persist(&destination)?;
    let elapsed = start.elapsed();

    println!("=== STEP 4: BATCH RESULT ===================================");
    let failed = batch.records().iter().filter(|r| r.is_failed()).count();
    println!(
        "  {} trial records ({failed} failed) in {elapsed:?}",
        batch.records().len()
    );
    for name in ["forest", "dlda", "dqda", "lda", "centroid", "rda", "scrda"] {
        let rates: Vec<f64> = batch
            .records()
            .iter()
            .filter_map(|r| r.outcomes().get(name).and_then(|o| o.error_rate()))
            .collect();
        if rates.is_empty() {
            println!("  {name:>8}: no successful trials");
        } else {
            #[allow(clippy::cast_precision_loss)]
            let mean = rates.iter().sum::<f64>() / rates.len() as f64;
            println!("  {name:>8}: mean error {mean:.3} over {} trials", rates.len());
        }
    }
    println!("  persisted to {}", destination.display());

    // Verify the persisted batch reads back identically.
    let reloaded = BatchResult::load(&destination)?;
    assert_eq!(reloaded.records().len(), batch.records().len());

    Ok(())
}
