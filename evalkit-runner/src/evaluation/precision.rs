//! Precision / recall / F1 over structured findings

use serde::{Deserialize, Serialize};

use evalkit::{
    confusion_counts, expected_findings, expected_issue_types, extract_findings,
    predicted_issue_types, ConfusionCounts, ExampleRecord, MetricResult, OutputRecord,
};

use super::{render_requests, EvalError, LlmSettings, ScoreRecord};
use crate::prompts::PromptTemplate;
use crate::runner::Executor;

/// Which ground truth the predictions are compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpectedSource {
    /// `(type, severity)` identities from `expected_findings`
    #[default]
    Findings,
    /// Bare type labels from `expected_issue_types`
    IssueTypes,
}

/// Per-example outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionItem {
    pub index: usize,
    pub id: Option<String>,
    pub output: OutputRecord,
    pub error: Option<String>,
}

/// Result of a precision run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionReport {
    pub items: Vec<PrecisionItem>,
    pub counts: ConfusionCounts,
    pub metrics: [MetricResult; 3],
}

impl PrecisionReport {
    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| i.error.is_some()).count()
    }

    /// Run-level score records: precision, recall, f1
    pub fn scores(&self) -> Vec<ScoreRecord> {
        self.metrics.iter().map(ScoreRecord::from).collect()
    }
}

/// Run the analysis prompt over every example and score the findings.
///
/// A failed request contributes an empty predicted set, so its expected
/// findings count as false negatives.
pub async fn run_precision(
    executor: &Executor,
    settings: &LlmSettings,
    template: &PromptTemplate,
    examples: &[ExampleRecord],
    source: ExpectedSource,
) -> Result<PrecisionReport, EvalError> {
    let requests = render_requests(template, examples, settings)?;
    tracing::info!(
        "Running {} on {} examples via {}",
        template.name(),
        examples.len(),
        executor.provider_name()
    );

    let results = executor.execute_all(requests).await;

    let items: Vec<PrecisionItem> = results
        .into_iter()
        .zip(examples)
        .map(|(result, example)| PrecisionItem {
            index: result.index,
            id: example.id.clone(),
            output: OutputRecord::new(result.output().unwrap_or_default()),
            error: result.error,
        })
        .collect();

    let outputs: Vec<&OutputRecord> = items.iter().map(|i| &i.output).collect();
    let counts = score_outputs(&outputs, examples, source);

    Ok(PrecisionReport {
        items,
        counts,
        metrics: counts.to_results(),
    })
}

fn score_outputs(
    outputs: &[&OutputRecord],
    examples: &[ExampleRecord],
    source: ExpectedSource,
) -> ConfusionCounts {
    match source {
        ExpectedSource::Findings => confusion_counts(
            outputs,
            examples,
            |o| extract_findings(o),
            expected_findings,
        ),
        ExpectedSource::IssueTypes => confusion_counts(
            outputs,
            examples,
            |o| predicted_issue_types(o),
            expected_issue_types,
        ),
    }
}
