//! Set-based precision, recall and F1
//!
//! Counts are micro-averaged: true positives, false positives and false
//! negatives are pooled across the whole batch before any ratio is taken, so
//! examples without findings never contribute a 0/0 term. Any ratio whose
//! denominator is zero is defined as 0.

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Pooled confusion counts for one evaluation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one example's predicted and expected sets to the running counts
    pub fn observe<T: Eq + Hash>(&mut self, predicted: &HashSet<T>, expected: &HashSet<T>) {
        let hits = predicted.intersection(expected).count();
        self.true_positives += hits;
        self.false_positives += predicted.len() - hits;
        self.false_negatives += expected.len() - hits;
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        }
    }

    /// Render the counts as precision, recall and f1 results, in that order
    pub fn to_results(&self) -> [MetricResult; 3] {
        let precision = self.precision();
        let recall = self.recall();

        [
            MetricResult::new(
                MetricResult::PRECISION,
                precision,
                format!("TP:{} FP:{}", self.true_positives, self.false_positives),
            ),
            MetricResult::new(
                MetricResult::RECALL,
                recall,
                format!("TP:{} FN:{}", self.true_positives, self.false_negatives),
            ),
            MetricResult::new(
                MetricResult::F1,
                self.f1(),
                format!("P:{:.2} R:{:.2}", precision, recall),
            ),
        ]
    }
}

/// A named score with a comment summarizing how it was reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub key: String,
    pub score: f64,
    pub comment: String,
}

impl MetricResult {
    pub const PRECISION: &'static str = "precision";
    pub const RECALL: &'static str = "recall";
    pub const F1: &'static str = "f1";

    pub fn new(key: impl Into<String>, score: f64, comment: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            score,
            comment: comment.into(),
        }
    }
}

/// Accumulate confusion counts over position-aligned outputs and examples.
///
/// Pairs are formed with zip semantics; surplus items on either side are
/// ignored.
pub fn confusion_counts<O, E, T, P, X>(
    outputs: &[O],
    examples: &[E],
    extract_predicted: P,
    extract_expected: X,
) -> ConfusionCounts
where
    T: Eq + Hash,
    P: Fn(&O) -> HashSet<T>,
    X: Fn(&E) -> HashSet<T>,
{
    if outputs.len() != examples.len() {
        tracing::warn!(
            "Output/example count mismatch ({} vs {}); scoring the first {} pairs",
            outputs.len(),
            examples.len(),
            outputs.len().min(examples.len())
        );
    }

    let mut counts = ConfusionCounts::new();
    for (output, example) in outputs.iter().zip(examples) {
        counts.observe(&extract_predicted(output), &extract_expected(example));
    }
    counts
}

/// Micro-averaged precision, recall and F1 over a batch.
///
/// Always returns exactly three results keyed `precision`, `recall` and `f1`.
pub fn precision_recall_f1<O, E, T, P, X>(
    outputs: &[O],
    examples: &[E],
    extract_predicted: P,
    extract_expected: X,
) -> [MetricResult; 3]
where
    T: Eq + Hash,
    P: Fn(&O) -> HashSet<T>,
    X: Fn(&E) -> HashSet<T>,
{
    confusion_counts(outputs, examples, extract_predicted, extract_expected).to_results()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
