//! Structured findings and their comparable identities

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::json::{display_value, parse_json_response, JsonObject};
use crate::records::{ExampleRecord, OutputRecord};

/// A finding reported by a code-analysis model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type", default, deserialize_with = "lenient_label")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_label")]
    pub severity: String,
    /// Free text; never compared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<Value>,
    /// Free text; never compared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
}

impl Finding {
    pub fn new(kind: impl Into<String>, severity: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            severity: severity.into(),
            line: None,
            description: None,
        }
    }

    pub fn identity(&self) -> FindingId {
        FindingId::new(self.kind.as_str(), self.severity.as_str())
    }
}

/// Comparable identity of a finding: its type and lowercased severity
///
/// Line numbers and descriptions are natural language and cannot be
/// exact-matched, so they are not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FindingId {
    pub kind: String,
    pub severity: String,
}

impl FindingId {
    pub fn new(kind: impl Into<String>, severity: impl AsRef<str>) -> Self {
        Self {
            kind: kind.into(),
            severity: severity.as_ref().to_lowercase(),
        }
    }
}

impl std::fmt::Display for FindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.kind, self.severity)
    }
}

/// Predicted finding identities from a model output.
///
/// Reads the `findings` array of the JSON document in `output.output`.
/// Malformed or missing JSON yields an empty set.
pub fn extract_findings(output: &OutputRecord) -> HashSet<FindingId> {
    findings_from_text(&output.output)
}

/// Predicted finding identities from raw response text.
pub fn findings_from_text(text: &str) -> HashSet<FindingId> {
    let doc = parse_json_response(text);
    finding_objects(&doc)
        .map(|f| FindingId::new(label(f.get("type")), label(f.get("severity"))))
        .collect()
}

/// Predicted issue types only, ignoring severity.
pub fn predicted_issue_types(output: &OutputRecord) -> HashSet<String> {
    let doc = parse_json_response(&output.output);
    finding_objects(&doc)
        .map(|f| label(f.get("type")))
        .collect()
}

/// Ground-truth finding identities from an example's `expected_findings`.
pub fn expected_findings(example: &ExampleRecord) -> HashSet<FindingId> {
    example
        .outputs
        .expected_findings
        .iter()
        .flatten()
        .map(Finding::identity)
        .collect()
}

/// Ground-truth issue types from an example's `expected_issue_types`.
pub fn expected_issue_types(example: &ExampleRecord) -> HashSet<String> {
    example
        .outputs
        .expected_issue_types
        .iter()
        .flatten()
        .cloned()
        .collect()
}

fn finding_objects(doc: &JsonObject) -> impl Iterator<Item = &JsonObject> {
    doc.get("findings")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

// Missing or null fields become "", other scalars use their JSON text
fn label(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => display_value(v),
    }
}

// Ground truth reads labels the same way predicted findings do
fn lenient_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(label(value.as_ref()))
}
