//! Trial execution
//!
//! One trial is the linear pipeline load → partition → select → fit/score
//! for every registered classifier. Failure handling is layered: a
//! classifier's fit or predict error becomes a failure marker for that
//! classifier only, while a failure in the shared prefix (load, partition,
//! selection) fails the whole trial — in both cases the runner returns a
//! record, never an error, so one trial can never take the batch down.
//!
//! Per-trial allocations (reduced matrices, fitted models) live on the
//! trial's own stack and drop on scope exit; the only state shared across
//! trials is the read-only dataset cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::classifier::{
    error_rate, registry, uniform_priors, Classifier, ClassifierOutcome,
};
use crate::config::RunConfig;
use crate::dataset::DatasetSource;
use crate::matrix::Matrix;
use crate::partition::stratified_partitions;
use crate::select::select_top_k;
use crate::telemetry::{EventSink, Level};
use crate::{Error, Result};

/// Identity of one trial: a dataset and a repetition index.
///
/// The trial seed is the repetition index, so randomness is a pure function
/// of the configuration and results do not depend on scheduling order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialConfig {
    dataset_id: String,
    repetition: u64,
}

impl TrialConfig {
    /// Create a trial configuration.
    #[must_use]
    pub fn new(dataset_id: impl Into<String>, repetition: u64) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            repetition,
        }
    }

    /// Dataset identifier.
    #[must_use]
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Repetition index within the dataset.
    #[must_use]
    pub const fn repetition(&self) -> u64 {
        self.repetition
    }

    /// Deterministic per-trial random seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.repetition
    }
}

/// Immutable outcome of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    dataset_id: String,
    repetition: u64,
    seed: u64,
    outcomes: BTreeMap<String, ClassifierOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

impl TrialRecord {
    fn completed(config: &TrialConfig, outcomes: BTreeMap<String, ClassifierOutcome>) -> Self {
        Self {
            dataset_id: config.dataset_id.clone(),
            repetition: config.repetition,
            seed: config.seed(),
            outcomes,
            failure: None,
        }
    }

    /// Record for a trial that failed before any classifier could score.
    #[must_use]
    pub fn failed(config: &TrialConfig, reason: impl Into<String>) -> Self {
        Self {
            dataset_id: config.dataset_id.clone(),
            repetition: config.repetition,
            seed: config.seed(),
            outcomes: BTreeMap::new(),
            failure: Some(reason.into()),
        }
    }

    /// Dataset identifier.
    #[must_use]
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Repetition index.
    #[must_use]
    pub const fn repetition(&self) -> u64 {
        self.repetition
    }

    /// Seed the trial ran with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Per-classifier outcomes, keyed by classifier name.
    #[must_use]
    pub const fn outcomes(&self) -> &BTreeMap<String, ClassifierOutcome> {
        &self.outcomes
    }

    /// Whole-trial failure reason, when the shared pipeline prefix failed.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Whether the trial produced any per-classifier outcomes.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Executes trials end-to-end against an injected dataset source and sink.
pub struct TrialRunner {
    source: Arc<dyn DatasetSource>,
    sink: Arc<dyn EventSink>,
    classifiers: Vec<Box<dyn Classifier>>,
    train_fraction: f64,
    top_k: usize,
}

impl TrialRunner {
    /// Build a runner with the standard seven-adapter registry.
    #[must_use]
    pub fn new(source: Arc<dyn DatasetSource>, sink: Arc<dyn EventSink>, config: &RunConfig) -> Self {
        Self {
            source,
            sink,
            classifiers: registry(config.num_gamma_grid_points()),
            train_fraction: config.train_fraction(),
            top_k: config.top_k_variables(),
        }
    }

    /// Execute one trial.
    ///
    /// Infallible by construction: every failure path is materialized in
    /// the returned record.
    #[must_use]
    pub fn run(&self, trial: &TrialConfig) -> TrialRecord {
        self.sink.log(
            Level::Info,
            "trial.start",
            &[
                ("dataset", trial.dataset_id.clone()),
                ("repetition", trial.repetition.to_string()),
            ],
        );
        match self.run_inner(trial) {
            Ok(outcomes) => {
                self.sink.log(
                    Level::Info,
                    "trial.complete",
                    &[
                        ("dataset", trial.dataset_id.clone()),
                        ("repetition", trial.repetition.to_string()),
                    ],
                );
                TrialRecord::completed(trial, outcomes)
            }
            Err(err) => {
                self.sink.log(
                    Level::Warn,
                    "trial.failed",
                    &[
                        ("dataset", trial.dataset_id.clone()),
                        ("repetition", trial.repetition.to_string()),
                        ("reason", err.to_string()),
                    ],
                );
                TrialRecord::failed(trial, err.to_string())
            }
        }
    }

    fn run_inner(&self, trial: &TrialConfig) -> Result<BTreeMap<String, ClassifierOutcome>> {
        let dataset = self.source.load(&trial.dataset_id)?;
        self.sink.log(
            Level::Info,
            "trial.dataset_loaded",
            &[
                ("dataset", trial.dataset_id.clone()),
                ("rows", dataset.features().rows().to_string()),
                ("variables", dataset.features().cols().to_string()),
                ("classes", dataset.n_classes().to_string()),
            ],
        );

        let partition = stratified_partitions(
            dataset.labels(),
            self.train_fraction,
            1,
            trial.seed(),
            self.sink.as_ref(),
        )?
        .pop()
        .ok_or_else(|| Error::Trial("partitioner returned no partitions".to_string()))?;

        let train_y: Vec<usize> = partition.train().iter().map(|&r| dataset.labels()[r]).collect();
        let test_y: Vec<usize> = partition.test().iter().map(|&r| dataset.labels()[r]).collect();

        // Selection sees training rows only; the same column subset is then
        // applied to both sides so test data never influences the choice.
        let train_full = dataset.features().select_rows(partition.train())?;
        let selected = select_top_k(&train_full, &train_y, self.top_k)?;
        let train_x = train_full.select_columns(&selected)?;
        let test_x = dataset
            .features()
            .select_rows(partition.test())?
            .select_columns(&selected)?;
        drop(train_full);
        self.sink.log(
            Level::Info,
            "trial.variables_selected",
            &[
                ("dataset", trial.dataset_id.clone()),
                ("k", selected.len().to_string()),
            ],
        );

        let n_classes = train_y.iter().max().map_or(0, |&m| m + 1);
        let priors = uniform_priors(n_classes);

        let mut outcomes = BTreeMap::new();
        for classifier in &self.classifiers {
            let outcome =
                score_classifier(classifier.as_ref(), &train_x, &train_y, &test_x, &test_y, &priors, trial.seed());
            match &outcome {
                ClassifierOutcome::Scored { error_rate, tuned } => {
                    let mut fields = vec![
                        ("dataset", trial.dataset_id.clone()),
                        ("classifier", classifier.name().to_string()),
                        ("error_rate", format!("{error_rate:.4}")),
                    ];
                    if let Some(pair) = tuned {
                        fields.push(("lambda", pair.lambda.to_string()));
                        fields.push(("gamma", pair.gamma.to_string()));
                    }
                    self.sink.log(Level::Info, "trial.classifier_scored", &fields);
                }
                ClassifierOutcome::Failed { kind, message } => {
                    self.sink.log(
                        Level::Warn,
                        "trial.classifier_failed",
                        &[
                            ("dataset", trial.dataset_id.clone()),
                            ("classifier", classifier.name().to_string()),
                            ("kind", kind.clone()),
                            ("message", message.clone()),
                        ],
                    );
                }
            }
            outcomes.insert(classifier.name().to_string(), outcome);
        }
        Ok(outcomes)
    }
}

/// Fit, predict, and score one classifier with failure isolation.
fn score_classifier(
    classifier: &dyn Classifier,
    train_x: &Matrix,
    train_y: &[usize],
    test_x: &Matrix,
    test_y: &[usize],
    priors: &[f64],
    seed: u64,
) -> ClassifierOutcome {
    let model = match classifier.fit(train_x, train_y, priors, seed) {
        Ok(model) => model,
        Err(err) => return ClassifierOutcome::from_error(&err),
    };
    let predicted = match model.predict(test_x) {
        Ok(predicted) => predicted,
        Err(err) => return ClassifierOutcome::from_error(&err),
    };
    match error_rate(&predicted, test_y) {
        Ok(rate) => ClassifierOutcome::Scored {
            error_rate: rate,
            tuned: model.tuned(),
        },
        Err(err) => ClassifierOutcome::from_error(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, InMemorySource};
    use crate::telemetry::CapturingSink;

    /// 40 rows, 2 balanced classes, 6 variables of which 2 discriminate.
    fn source_with(id: &str, n_vars: usize) -> InMemorySource {
        let rows = 40;
        let mut data = Vec::with_capacity(rows * n_vars);
        let mut labels = Vec::with_capacity(rows);
        for i in 0..rows {
            let class = i % 2;
            labels.push(class);
            for j in 0..n_vars {
                #[allow(clippy::cast_precision_loss)]
                let noise = ((i * 7 + j * 13) % 11) as f64 * 0.05;
                let value = if j < 2 && class == 1 { 4.0 + noise } else { noise };
                data.push(value);
            }
        }
        let features = Matrix::from_vec(data, rows, n_vars).unwrap();
        let dataset = Dataset::new(
            id,
            features,
            labels,
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();
        let mut source = InMemorySource::new();
        source.insert(dataset);
        source
    }

    fn runner(source: InMemorySource, sink: Arc<CapturingSink>, top_k: usize) -> TrialRunner {
        let config = RunConfig::builder()
            .dataset("synthetic")
            .repetitions(1)
            .train_fraction(0.67)
            .top_k_variables(top_k)
            .num_gamma_grid_points(3)
            .build()
            .unwrap();
        TrialRunner::new(Arc::new(source), sink, &config)
    }

    #[test]
    fn test_trial_produces_outcome_per_classifier() {
        let sink = Arc::new(CapturingSink::new());
        let runner = runner(source_with("synthetic", 6), Arc::clone(&sink), 4);
        let record = runner.run(&TrialConfig::new("synthetic", 0));

        assert!(!record.is_failed());
        assert_eq!(record.outcomes().len(), 7);
        for outcome in record.outcomes().values() {
            if let Some(rate) = outcome.error_rate() {
                assert!((0.0..=1.0).contains(&rate));
            }
        }
        assert_eq!(sink.count("trial.complete"), 1);
        assert_eq!(sink.count("trial.classifier_scored") + sink.count("trial.classifier_failed"), 7);
    }

    #[test]
    fn test_tuning_variants_record_their_pair() {
        let sink = Arc::new(CapturingSink::new());
        let runner = runner(source_with("synthetic", 6), sink, 4);
        let record = runner.run(&TrialConfig::new("synthetic", 1));

        for name in ["rda", "scrda"] {
            let outcome = &record.outcomes()[name];
            if outcome.error_rate().is_some() {
                assert!(outcome.tuned().is_some(), "{name} must expose its pair");
            }
        }
        // Untuned variants never report a pair.
        assert!(record.outcomes()["dlda"].tuned().is_none());
    }

    #[test]
    fn test_k_exceeding_variable_count_fails_trial_not_batch() {
        let sink = Arc::new(CapturingSink::new());
        let runner = runner(source_with("synthetic", 6), Arc::clone(&sink), 500);
        let record = runner.run(&TrialConfig::new("synthetic", 0));

        assert!(record.is_failed());
        assert!(record.failure().unwrap().contains("k exceeds variable count"));
        assert!(record.outcomes().is_empty());
        assert_eq!(sink.count("trial.failed"), 1);
    }

    #[test]
    fn test_unknown_dataset_fails_trial() {
        let sink = Arc::new(CapturingSink::new());
        let runner = runner(source_with("synthetic", 6), sink, 4);
        let record = runner.run(&TrialConfig::new("missing", 0));

        assert!(record.is_failed());
        assert!(record.failure().unwrap().contains("unknown dataset"));
    }

    #[test]
    fn test_same_seed_reproduces_record() {
        let sink = Arc::new(CapturingSink::new());
        let runner_a = runner(source_with("synthetic", 6), Arc::clone(&sink), 4);
        let a = runner_a.run(&TrialConfig::new("synthetic", 3));
        let b = runner_a.run(&TrialConfig::new("synthetic", 3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_record_serialization_round_trip() {
        let sink = Arc::new(CapturingSink::new());
        let runner = runner(source_with("synthetic", 6), sink, 4);
        let record = runner.run(&TrialConfig::new("synthetic", 0));

        let json = serde_json::to_string(&record).unwrap();
        let back: TrialRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
