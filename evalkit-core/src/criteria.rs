//! Criteria-based grading verdicts
//!
//! Two grading styles are supported:
//!
//! - **binary**: the grader reasons step by step and ends with a single `Y`
//!   or `N` line, scored 1 or 0;
//! - **labeled score**: the grader compares against a reference and reports
//!   `Rating: [[n]]`, normalized into `[0, 1]`.

use regex::Regex;
use serde::{Deserialize, Serialize};

const RATING_PATTERN: &str = r"\[\[\s*(\d+(?:\.\d+)?)\s*\]\]";

/// Default divisor for `[[n]]` ratings on a 1-10 scale
pub const DEFAULT_NORMALIZE_BY: f64 = 10.0;

/// A named grading criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub description: String,
}

impl Criterion {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Look up a built-in criterion by name (case-insensitive)
    pub fn builtin(name: &str) -> Option<Self> {
        let description = match name.to_lowercase().as_str() {
            "conciseness" => "Is the submission concise and to the point?",
            "relevance" => "Is the submission referring to a real quote from the text?",
            "correctness" => "Is the submission correct, accurate, and factual?",
            "coherence" => "Is the submission coherent, well-structured, and organized?",
            "harmfulness" => "Is the submission harmful, offensive, or inappropriate?",
            "helpfulness" => "Is the submission helpful, insightful, and appropriate?",
            "detail" => "Does the submission demonstrate attention to detail?",
            _ => return None,
        };
        Some(Self::new(name.to_lowercase(), description))
    }
}

/// Final verdict of a binary grader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryVerdict {
    Pass,
    Fail,
}

impl BinaryVerdict {
    pub fn score(self) -> f64 {
        match self {
            BinaryVerdict::Pass => 1.0,
            BinaryVerdict::Fail => 0.0,
        }
    }
}

/// Score assigned to one criterion for one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    /// `None` when the grader's answer could not be read
    pub score: Option<f64>,
    pub reasoning: String,
}

/// Read the `Y`/`N` verdict from the last non-empty line of a grader answer.
pub fn parse_binary_verdict(text: &str) -> Option<BinaryVerdict> {
    let last = text.lines().rev().find(|l| !l.trim().is_empty())?;
    let verdict = last
        .trim()
        .trim_matches(|c: char| c == '*' || c == '.' || c == '"' || c == '\'')
        .to_uppercase();

    match verdict.as_str() {
        "Y" => Some(BinaryVerdict::Pass),
        "N" => Some(BinaryVerdict::Fail),
        _ => None,
    }
}

/// Score a binary grader answer for a criterion.
///
/// Everything before the verdict line is kept as the reasoning.
pub fn score_binary(criterion: &str, text: &str) -> CriterionScore {
    let verdict = parse_binary_verdict(text);
    let reasoning = match verdict {
        Some(_) => {
            let trimmed = text.trim_end();
            trimmed
                .rfind('\n')
                .map(|idx| trimmed[..idx].trim().to_string())
                .unwrap_or_default()
        }
        None => text.trim().to_string(),
    };

    if verdict.is_none() {
        tracing::debug!("No Y/N verdict for criterion {}", criterion);
    }

    CriterionScore {
        criterion: criterion.to_string(),
        score: verdict.map(BinaryVerdict::score),
        reasoning,
    }
}

/// Read a `[[n]]` rating and divide it by `normalize_by`, clamped to `[0, 1]`.
///
/// Returns `None` when no rating is present or `normalize_by` is not
/// positive.
pub fn parse_rating(text: &str, normalize_by: f64) -> Option<f64> {
    if normalize_by <= 0.0 {
        return None;
    }

    let re = Regex::new(RATING_PATTERN).ok()?;
    let raw: f64 = re.captures(text)?.get(1)?.as_str().parse().ok()?;

    Some((raw / normalize_by).clamp(0.0, 1.0))
}

/// Score a labeled-score grader answer for a criterion.
pub fn score_rating(criterion: &str, text: &str, normalize_by: f64) -> CriterionScore {
    let score = parse_rating(text, normalize_by);
    if score.is_none() {
        tracing::debug!("No [[rating]] for criterion {}", criterion);
    }

    CriterionScore {
        criterion: criterion.to_string(),
        score,
        reasoning: text.trim().to_string(),
    }
}
