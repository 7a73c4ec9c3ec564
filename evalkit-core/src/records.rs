//! Output and dataset example records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::findings::Finding;
use crate::json::display_value;

/// A model output produced for one dataset example
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Raw response text, possibly holding a fenced JSON document
    #[serde(default)]
    pub output: String,
}

impl OutputRecord {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl From<String> for OutputRecord {
    fn from(output: String) -> Self {
        Self { output }
    }
}

/// One dataset example: free-form inputs plus ground truth
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExampleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "input")]
    pub inputs: Map<String, Value>,
    #[serde(default, alias = "expected_output")]
    pub outputs: ExpectedOutputs,
}

/// Ground-truth fields of an example
///
/// Known fields are typed; anything else the dataset carries is kept in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_issue_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_findings: Option<Vec<Finding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExampleRecord {
    pub fn new(inputs: Map<String, Value>) -> Self {
        Self {
            id: None,
            inputs,
            outputs: ExpectedOutputs::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_issue_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.expected_issue_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.outputs.expected_findings = Some(findings);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<Value>) -> Self {
        self.outputs.reference = Some(reference.into());
        self
    }

    /// Input field rendered as text, empty when absent
    pub fn input_text(&self, key: &str) -> String {
        self.inputs.get(key).map(display_value).unwrap_or_default()
    }

    /// Reference answer rendered as text, empty when absent
    pub fn reference_text(&self) -> String {
        self.outputs
            .reference
            .as_ref()
            .map(display_value)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_langsmith_shape() {
        let line = r#"{"inputs": {"code": "x = 1"}, "outputs": {"expected_issue_types": ["bug"], "notes": "n"}}"#;
        let example: ExampleRecord = serde_json::from_str(line).unwrap();
        assert_eq!(example.input_text("code"), "x = 1");
        assert_eq!(example.outputs.expected_issue_types, Some(vec!["bug".to_string()]));
        assert_eq!(example.outputs.extra.get("notes"), Some(&json!("n")));
    }

    #[test]
    fn test_deserialize_langfuse_shape() {
        let line = r#"{"input": {"files": ["a.py"]}, "expected_output": {"reference": "docs"}}"#;
        let example: ExampleRecord = serde_json::from_str(line).unwrap();
        assert_eq!(example.input_text("files"), r#"["a.py"]"#);
        assert_eq!(example.reference_text(), "docs");
    }

    #[test]
    fn test_missing_fields_default() {
        let example: ExampleRecord = serde_json::from_str("{}").unwrap();
        assert!(example.inputs.is_empty());
        assert_eq!(example.outputs, ExpectedOutputs::default());
        assert_eq!(example.input_text("code"), "");
        assert_eq!(example.reference_text(), "");
    }

    #[test]
    fn test_loose_expected_findings_deserialize() {
        let line = r#"{"inputs": {}, "outputs": {"expected_findings": [
            {"type": "bug", "severity": null},
            {"type": "leak", "severity": "HIGH", "description": 5},
            {"severity": "low"}
        ]}}"#;
        let example: ExampleRecord = serde_json::from_str(line).unwrap();
        let findings = example.outputs.expected_findings.unwrap();

        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].kind, "bug");
        assert_eq!(findings[0].severity, "");
        assert_eq!(findings[1].description, Some(json!(5)));
        assert_eq!(findings[1].identity().severity, "high");
        assert_eq!(findings[2].kind, "");
    }

    #[test]
    fn test_output_record_missing_output() {
        let record: OutputRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.output, "");
    }
}
