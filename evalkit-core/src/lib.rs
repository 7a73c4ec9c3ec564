//! EvalKit - scoring primitives for LLM output evaluation
//!
//! Pure functions over already-fetched model outputs and dataset examples:
//!
//! - micro-averaged precision, recall and F1 over structured findings
//! - pairwise judge verdict parsing, weighting and tallying
//! - binary and labeled-score criteria verdicts
//! - tolerant extraction of (possibly markdown-fenced) JSON
//!
//! Model output is unreliable text, so parsing never fails: malformed input
//! degrades to an empty set, an empty object, or a tie.
//!
//! # Example
//!
//! ```rust
//! use evalkit::{
//!     expected_findings, extract_findings, parse_judge_response, precision_recall_f1,
//!     Decision, ExampleRecord, Finding, OutputRecord,
//! };
//!
//! let outputs = vec![OutputRecord::new(
//!     r#"{"findings": [{"type": "sql_injection", "severity": "Critical"}]}"#,
//! )];
//! let examples = vec![
//!     ExampleRecord::default().with_findings(vec![Finding::new("sql_injection", "critical")]),
//! ];
//!
//! let [precision, recall, f1] =
//!     precision_recall_f1(&outputs, &examples, extract_findings, expected_findings);
//! assert_eq!(precision.score, 1.0);
//! assert_eq!(recall.score, 1.0);
//! assert_eq!(f1.score, 1.0);
//!
//! let verdict = parse_judge_response("```json\n{\"decision\": \"B\"}\n```");
//! assert_eq!(verdict.decision, Decision::B);
//! ```

pub mod criteria;
pub mod findings;
pub mod judge;
pub mod json;
pub mod metrics;
pub mod records;

pub use criteria::{
    parse_binary_verdict, parse_rating, score_binary, score_rating, BinaryVerdict, Criterion,
    CriterionScore, DEFAULT_NORMALIZE_BY,
};
pub use findings::{
    expected_findings, expected_issue_types, extract_findings, findings_from_text,
    predicted_issue_types, Finding, FindingId,
};
pub use judge::{
    format_reasoning_summary, keyword_decision, keyword_weights, parse_judge_response, Decision,
    Dimension, DimensionScore, JudgeVerdict, Outcome, PairwiseTally, Reasoning, Side,
};
pub use json::{
    display_value, extract_json_block, parse_json_object, parse_json_response, JsonExtractError,
    JsonObject,
};
pub use metrics::{confusion_counts, precision_recall_f1, ConfusionCounts, MetricResult};
pub use records::{ExampleRecord, ExpectedOutputs, OutputRecord};
