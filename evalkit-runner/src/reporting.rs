//! Results reporting: console tables and a JSON summary for stdout

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::evaluation::{CriteriaReport, PairwiseReport, PrecisionReport, ScoreRecord};

/// Identifier and start time of one CLI invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
}

impl RunInfo {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: started_at.format("%Y%m%d-%H%M%S").to_string(),
            started_at,
        }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Short stamp used in experiment labels
    pub fn stamp(&self) -> String {
        self.started_at.format("%H%M").to_string()
    }
}

/// Scores of one dataset example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub scores: Vec<ScoreRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Machine-readable run summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSummary {
    pub run_id: String,
    pub evaluation: String,
    pub timestamp: String,
    pub finished_at: String,
    pub total_items: usize,
    pub failed_items: usize,
    /// Run-level numbers (metrics, win counts, criterion averages)
    pub metrics: IndexMap<String, f64>,
    /// Run-level score records
    pub scores: Vec<ScoreRecord>,
    pub items: Vec<ItemSummary>,
}

impl JsonSummary {
    fn new(run: &RunInfo, evaluation: &str, total_items: usize, failed_items: usize) -> Self {
        Self {
            run_id: run.run_id.clone(),
            evaluation: evaluation.to_string(),
            timestamp: run.started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
            total_items,
            failed_items,
            metrics: IndexMap::new(),
            scores: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn from_precision(run: &RunInfo, report: &PrecisionReport) -> Self {
        let mut summary = Self::new(run, "precision", report.items.len(), report.failed());
        for metric in &report.metrics {
            summary.metrics.insert(metric.key.clone(), metric.score);
        }
        summary.metrics.insert("true_positives".to_string(), report.counts.true_positives as f64);
        summary.metrics.insert("false_positives".to_string(), report.counts.false_positives as f64);
        summary.metrics.insert("false_negatives".to_string(), report.counts.false_negatives as f64);
        summary.scores = report.scores();
        summary.items = report
            .items
            .iter()
            .map(|item| ItemSummary {
                index: item.index,
                id: item.id.clone(),
                scores: Vec::new(),
                error: item.error.clone(),
            })
            .collect();
        summary
    }

    pub fn from_pairwise(run: &RunInfo, report: &PairwiseReport) -> Self {
        let mut summary = Self::new(run, "pairwise", report.items.len(), report.failed());
        let tally = &report.tally;
        let [mean_a, mean_b] = tally.mean_weights();
        summary.metrics.insert("wins_a".to_string(), tally.wins_a as f64);
        summary.metrics.insert("wins_b".to_string(), tally.wins_b as f64);
        summary.metrics.insert("ties".to_string(), tally.ties as f64);
        summary.metrics.insert("mean_weight_a".to_string(), mean_a);
        summary.metrics.insert("mean_weight_b".to_string(), mean_b);
        summary.items = report
            .items
            .iter()
            .map(|item| ItemSummary {
                index: item.index,
                id: item.id.clone(),
                scores: item
                    .judge_scores
                    .iter()
                    .chain(&item.scores_a)
                    .chain(&item.scores_b)
                    .cloned()
                    .collect(),
                error: item.error.clone(),
            })
            .collect();
        summary
    }

    pub fn from_criteria(run: &RunInfo, report: &CriteriaReport) -> Self {
        let mut summary = Self::new(run, "criteria", report.items.len(), report.failed());
        summary.metrics = report.averages.clone();
        summary.items = report
            .items
            .iter()
            .map(|item| ItemSummary {
                index: item.index,
                id: item.id.clone(),
                scores: item.scores.clone(),
                error: item.error.clone(),
            })
            .collect();
        summary
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn print_header(title: &str, run: &RunInfo, total: usize, failed: usize) {
    println!("\n=== {} ===\n", title);
    println!("Run ID: {}", run.run_id);
    println!("Items:  {} ({} failed)\n", total, failed);
}

fn print_failures<'a>(failures: impl Iterator<Item = (usize, &'a Option<String>, &'a Option<String>)>) {
    let mut printed = false;
    for (index, id, error) in failures {
        if let Some(error) = error {
            if !printed {
                println!("\nFailures:");
                println!("{:-<60}", "");
                printed = true;
            }
            let label = id.clone().unwrap_or_else(|| format!("#{}", index + 1));
            println!("  {}: {}", label, error);
        }
    }
}

pub fn print_precision_report(run: &RunInfo, report: &PrecisionReport) {
    print_header("Precision / Recall / F1", run, report.items.len(), report.failed());

    println!("{:<12} {:>8}  {}", "Metric", "Score", "Detail");
    println!("{:-<60}", "");
    for metric in &report.metrics {
        println!("{:<12} {:>8.3}  {}", metric.key, metric.score, metric.comment);
    }

    print_failures(report.items.iter().map(|i| (i.index, &i.id, &i.error)));
    println!("\n{:=<60}", "");
}

pub fn print_pairwise_report(run: &RunInfo, report: &PairwiseReport) {
    print_header("Pairwise Comparison", run, report.items.len(), report.failed());

    println!("A: {}", report.label_a);
    println!("B: {}\n", report.label_b);
    println!("{:<8} {:<10} {:>7}", "Item", "Winner", "Totals");
    println!("{:-<60}", "");
    for item in &report.items {
        let label = item.id.clone().unwrap_or_else(|| format!("#{}", item.index + 1));
        let Some(decision) = item.decision else { continue };
        let totals = match (item.reasoning.total_a(), item.reasoning.total_b()) {
            (Some(a), Some(b)) => format!("{}-{}", evalkit::display_value(a), evalkit::display_value(b)),
            _ => "-".to_string(),
        };
        println!("{:<8} {:<10} {:>7}", label, decision, totals);
    }

    let tally = &report.tally;
    let [mean_a, mean_b] = tally.mean_weights();
    println!("{:-<60}", "");
    println!(
        "A wins: {}, B wins: {}, ties: {}  (mean weights A={:.3}, B={:.3})",
        tally.wins_a, tally.wins_b, tally.ties, mean_a, mean_b
    );
    println!("Overall: {}", tally.leader());

    print_failures(report.items.iter().map(|i| (i.index, &i.id, &i.error)));
    println!("\n{:=<60}", "");
}

pub fn print_criteria_report(run: &RunInfo, report: &CriteriaReport) {
    print_header("Criteria Grades", run, report.items.len(), report.failed());

    println!("{:<16} {:>8}", "Criterion", "Average");
    println!("{:-<60}", "");
    for (criterion, average) in &report.averages {
        println!("{:<16} {:>8.3}", criterion, average);
    }

    print_failures(report.items.iter().map(|i| (i.index, &i.id, &i.error)));
    println!("\n{:=<60}", "");
}
