//! Pairwise judge verdicts
//!
//! A judge model compares two candidate outputs, "A" and "B", and either
//! answers in free text or returns a JSON document:
//!
//! ```json
//! {
//!   "decision": "A",
//!   "reasoning": {
//!     "score_total_a": 45,
//!     "score_total_b": 30,
//!     "technical_precision": {"score_a": 9, "score_b": 6, "justification": "..."}
//!   }
//! }
//! ```
//!
//! Both shapes are normalized into a [`Decision`]. Judge output is unreliable
//! text, so nothing here fails: anything that cannot be read as a clear
//! preference becomes [`Decision::Tie`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::json::{display_value, parse_json_response};

/// Which candidate the judge preferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    A,
    B,
    #[serde(rename = "TIE")]
    Tie,
}

impl Decision {
    /// Keyword heuristic over a free-text verdict.
    ///
    /// The uppercased text is split on non-alphanumeric characters and
    /// checked for the standalone tokens `A` and `B`. Only a verdict naming
    /// exactly one of them is a preference; naming both or neither is a tie.
    /// No attempt is made to understand negation ("not A, B") or hedging.
    pub fn from_keywords(text: &str) -> Self {
        let upper = text.to_uppercase();
        let mut has_a = false;
        let mut has_b = false;
        for token in upper.split(|c: char| !c.is_alphanumeric()) {
            match token {
                "A" => has_a = true,
                "B" => has_b = true,
                _ => {}
            }
        }

        match (has_a, has_b) {
            (true, false) => Decision::A,
            (false, true) => Decision::B,
            _ => Decision::Tie,
        }
    }

    /// Preference weights for `[A, B]`
    pub fn weights(self) -> [f64; 2] {
        match self {
            Decision::A => [1.0, 0.0],
            Decision::B => [0.0, 1.0],
            Decision::Tie => [0.5, 0.5],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::A => "A",
            Decision::B => "B",
            Decision::Tie => "TIE",
        }
    }

    /// Result of this decision from one candidate's point of view
    pub fn outcome_for(self, side: Side) -> Outcome {
        match (self, side) {
            (Decision::Tie, _) => Outcome::Tie,
            (Decision::A, Side::A) | (Decision::B, Side::B) => Outcome::Won,
            _ => Outcome::Lost,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Decision::A),
            "B" => Ok(Decision::B),
            "TIE" => Ok(Decision::Tie),
            _ => Err(format!("Unknown decision: {}", s)),
        }
    }
}

/// One of the two compared candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Per-candidate result of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost,
    Tie,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Won => "Won",
            Outcome::Lost => "Lost",
            Outcome::Tie => "Tie",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword decision of a free-text verdict.
pub fn keyword_decision(text: &str) -> Decision {
    Decision::from_keywords(text)
}

/// Keyword decision of a free-text verdict as `[A, B]` weights.
pub fn keyword_weights(text: &str) -> [f64; 2] {
    Decision::from_keywords(text).weights()
}

/// Rubric dimensions a structured judge may score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    StructuralCompleteness,
    TechnicalPrecision,
    ClarityAndUtility,
    ReferenceAlignment,
    ConcisenessVsDetail,
}

impl Dimension {
    /// All dimensions in summary order
    pub const ALL: [Dimension; 5] = [
        Dimension::StructuralCompleteness,
        Dimension::TechnicalPrecision,
        Dimension::ClarityAndUtility,
        Dimension::ReferenceAlignment,
        Dimension::ConcisenessVsDetail,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Dimension::StructuralCompleteness => "structural_completeness",
            Dimension::TechnicalPrecision => "technical_precision",
            Dimension::ClarityAndUtility => "clarity_and_utility",
            Dimension::ReferenceAlignment => "reference_alignment",
            Dimension::ConcisenessVsDetail => "conciseness_vs_detail",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::StructuralCompleteness => "Structural Completeness",
            Dimension::TechnicalPrecision => "Technical Precision",
            Dimension::ClarityAndUtility => "Clarity and Utility",
            Dimension::ReferenceAlignment => "Reference Alignment",
            Dimension::ConcisenessVsDetail => "Conciseness vs Detail",
        }
    }
}

/// Scores for one rubric dimension
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionScore {
    pub score_a: Option<Value>,
    pub score_b: Option<Value>,
    pub justification: String,
}

/// Reasoning payload returned by a structured judge
///
/// Kept as the raw JSON mapping so it can be forwarded untouched; typed
/// accessors read the recognized fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reasoning(Map<String, Value>);

impl Reasoning {
    pub const PARSE_FAILURE: &'static str = "Failed to parse JSON";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Reasoning recorded when the judge response was unreadable
    pub fn parse_failure() -> Self {
        let mut map = Map::new();
        map.insert("error".to_string(), Value::from(Self::PARSE_FAILURE));
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn error(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    pub fn total_a(&self) -> Option<&Value> {
        self.0.get("score_total_a")
    }

    pub fn total_b(&self) -> Option<&Value> {
        self.0.get("score_total_b")
    }

    pub fn final_decision(&self) -> Option<&Value> {
        self.0.get("final_decision")
    }

    /// Scores for a dimension, if the judge reported it
    pub fn dimension(&self, dimension: Dimension) -> Option<DimensionScore> {
        let value = self.0.get(dimension.key())?;
        let fields = value.as_object();
        let field = |name: &str| fields.and_then(|f| f.get(name)).cloned();

        Some(DimensionScore {
            score_a: field("score_a"),
            score_b: field("score_b"),
            justification: field("justification")
                .map(|v| display_value(&v))
                .unwrap_or_default(),
        })
    }

    /// Human-readable summary, see [`format_reasoning_summary`]
    pub fn summary(&self) -> String {
        format_reasoning_summary(self)
    }
}

impl From<Map<String, Value>> for Reasoning {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A parsed structured verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub decision: Decision,
    pub reasoning: Reasoning,
}

impl JudgeVerdict {
    fn unreadable() -> Self {
        Self {
            decision: Decision::Tie,
            reasoning: Reasoning::parse_failure(),
        }
    }
}

/// Parse a structured (JSON) judge response.
///
/// An unreadable or empty document yields `TIE` with an error reasoning.
/// A readable document with a missing or unrecognized `decision` yields
/// `TIE`; a missing `reasoning` yields an empty one.
pub fn parse_judge_response(text: &str) -> JudgeVerdict {
    let mut doc = parse_json_response(text);
    if doc.is_empty() {
        return JudgeVerdict::unreadable();
    }

    let decision = match doc.get("decision") {
        Some(Value::String(s)) => s.parse().unwrap_or_else(|e| {
            tracing::debug!("{}; treating as TIE", e);
            Decision::Tie
        }),
        Some(other) => {
            tracing::debug!("Non-string decision {}; treating as TIE", other);
            Decision::Tie
        }
        None => Decision::Tie,
    };

    let reasoning = match doc.remove("reasoning") {
        Some(Value::Object(map)) => Reasoning::from_map(map),
        Some(other) => {
            tracing::debug!("Ignoring non-object reasoning: {}", other);
            Reasoning::new()
        }
        None => Reasoning::new(),
    };

    JudgeVerdict { decision, reasoning }
}

/// Render judge reasoning as a multi-line summary.
///
/// Produces, in order: the total scores (when both are present), the final
/// decision, then each recognized dimension with its justification.
/// Unrecognized keys are not rendered. Returns `"No reasoning provided"`
/// when nothing was rendered.
pub fn format_reasoning_summary(reasoning: &Reasoning) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let (Some(a), Some(b)) = (reasoning.total_a(), reasoning.total_b()) {
        lines.push(format!(
            "Total Scores - A: {}/50, B: {}/50",
            display_value(a),
            display_value(b)
        ));
    }

    if let Some(decision) = reasoning.final_decision() {
        lines.push(format!("\nDecision: {}", display_value(decision)));
    }

    for dimension in Dimension::ALL {
        if let Some(score) = reasoning.dimension(dimension) {
            lines.push(format!(
                "\n{}: A={}/10, B={}/10",
                dimension.label(),
                score_text(score.score_a.as_ref()),
                score_text(score.score_b.as_ref())
            ));
            if !score.justification.is_empty() {
                lines.push(format!("  -> {}", score.justification));
            }
        }
    }

    if lines.is_empty() {
        "No reasoning provided".to_string()
    } else {
        lines.join("\n")
    }
}

fn score_text(score: Option<&Value>) -> String {
    score.map(display_value).unwrap_or_else(|| "?".to_string())
}

/// Running tally of pairwise decisions across a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairwiseTally {
    pub wins_a: usize,
    pub wins_b: usize,
    pub ties: usize,
    /// Summed `[A, B]` preference weights
    pub weight_totals: [f64; 2],
}

impl PairwiseTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::A => self.wins_a += 1,
            Decision::B => self.wins_b += 1,
            Decision::Tie => self.ties += 1,
        }
        let [a, b] = decision.weights();
        self.weight_totals[0] += a;
        self.weight_totals[1] += b;
    }

    pub fn total(&self) -> usize {
        self.wins_a + self.wins_b + self.ties
    }

    /// Mean `[A, B]` weights, `[0.0, 0.0]` for an empty tally
    pub fn mean_weights(&self) -> [f64; 2] {
        let n = self.total();
        if n == 0 {
            return [0.0, 0.0];
        }
        [
            self.weight_totals[0] / n as f64,
            self.weight_totals[1] / n as f64,
        ]
    }

    /// Overall preference by win count
    pub fn leader(&self) -> Decision {
        match self.wins_a.cmp(&self.wins_b) {
            std::cmp::Ordering::Greater => Decision::A,
            std::cmp::Ordering::Less => Decision::B,
            std::cmp::Ordering::Equal => Decision::Tie,
        }
    }
}

impl Extend<Decision> for PairwiseTally {
    fn extend<I: IntoIterator<Item = Decision>>(&mut self, iter: I) {
        for decision in iter {
            self.record(decision);
        }
    }
}

impl FromIterator<Decision> for PairwiseTally {
    fn from_iter<I: IntoIterator<Item = Decision>>(iter: I) -> Self {
        let mut tally = Self::new();
        tally.extend(iter);
        tally
    }
}
