//! Plain-text prompt templates with `{name}` placeholders
//!
//! A placeholder is an identifier in single braces. Any other brace text,
//! such as a JSON example embedded in a judge prompt, is left untouched.

use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;

use evalkit::{display_value, ExampleRecord};

const PLACEHOLDER_PATTERN: &str = r"\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Errors raised while loading or rendering templates
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No value for placeholder {{{0}}}")]
    MissingVariable(String),

    #[error("Invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A prompt with named placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    source: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Load a template from a text file; the file stem becomes its name
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prompt".to_string());
        Ok(Self::new(name, source))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names in order of first appearance
    pub fn placeholders(&self) -> Result<Vec<String>, TemplateError> {
        let re = Regex::new(PLACEHOLDER_PATTERN)?;
        let mut names: Vec<String> = Vec::new();
        for caps in re.captures_iter(&self.source) {
            let name = &caps[1];
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Substitute every placeholder from `vars`.
    ///
    /// Strings are inserted verbatim, other values as JSON text. A
    /// placeholder without a value is an error.
    pub fn render(&self, vars: &Map<String, Value>) -> Result<String, TemplateError> {
        let re = Regex::new(PLACEHOLDER_PATTERN)?;
        let mut rendered = String::with_capacity(self.source.len());
        let mut last = 0;

        for caps in re.captures_iter(&self.source) {
            let (whole, name) = match (caps.get(0), caps.get(1)) {
                (Some(whole), Some(name)) => (whole, name.as_str()),
                _ => continue,
            };
            let value = vars
                .get(name)
                .ok_or_else(|| TemplateError::MissingVariable(name.to_string()))?;

            rendered.push_str(&self.source[last..whole.start()]);
            rendered.push_str(&display_value(value));
            last = whole.end();
        }

        rendered.push_str(&self.source[last..]);
        Ok(rendered)
    }

    /// Render from an example's inputs, its `reference` and extra variables.
    ///
    /// Extras take precedence over inputs of the same name.
    pub fn render_example(
        &self,
        example: &ExampleRecord,
        extra: &[(&str, &str)],
    ) -> Result<String, TemplateError> {
        let mut vars = example.inputs.clone();
        if let Some(reference) = &example.outputs.reference {
            vars.entry("reference").or_insert_with(|| reference.clone());
        }
        for (key, value) in extra {
            vars.insert(key.to_string(), Value::String(value.to_string()));
        }
        self.render(&vars)
    }
}
