//! JSONL dataset loading
//!
//! One example per line:
//!
//! ```text
//! {"inputs": {"code": "..."}, "outputs": {"expected_findings": [...]}}
//! ```
//!
//! Blank lines are skipped. `input` and `expected_output` are accepted as
//! aliases for `inputs` and `outputs`.

use std::path::Path;

use evalkit::ExampleRecord;

/// Error type for dataset loading
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Load examples from a JSONL file
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<ExampleRecord>, DatasetError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let examples = load_dataset_from_str(&content)?;
    tracing::info!("Loaded {} examples from {}", examples.len(), path.display());
    Ok(examples)
}

/// Parse examples from JSONL text
pub fn load_dataset_from_str(content: &str) -> Result<Vec<ExampleRecord>, DatasetError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| DatasetError::Parse {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_lines() {
        let jsonl = r#"
{"id": "ex-1", "inputs": {"code": "eval(x)"}, "outputs": {"expected_findings": [{"type": "code_injection", "severity": "Critical"}]}}

{"input": {"files": "main.py"}, "expected_output": {"reference": "Docs here"}}
"#;
        let examples = load_dataset_from_str(jsonl).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].id.as_deref(), Some("ex-1"));
        assert_eq!(examples[0].input_text("code"), "eval(x)");
        assert_eq!(examples[1].input_text("files"), "main.py");
        assert_eq!(examples[1].reference_text(), "Docs here");
    }

    #[test]
    fn test_reports_line_number() {
        let jsonl = "{\"inputs\": {}}\n\n{not json}\n";
        match load_dataset_from_str(jsonl) {
            Err(DatasetError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_dataset() {
        assert!(load_dataset_from_str("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"inputs": {{"code": "a = 1"}}, "outputs": {{"expected_issue_types": ["style"]}}}}"#).unwrap();

        let examples = load_dataset(file.path()).unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(
            examples[0].outputs.expected_issue_types.as_deref(),
            Some(&["style".to_string()][..])
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_dataset("/nonexistent/data.jsonl"),
            Err(DatasetError::Io(_))
        ));
    }
}
