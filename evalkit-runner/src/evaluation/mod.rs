//! Evaluation flows over a dataset
//!
//! Each flow renders prompts for every example, runs them through the
//! [`Executor`](crate::runner::Executor), scores the responses with the
//! `evalkit` core and emits [`ScoreRecord`]s shaped for an observability
//! backend.

pub mod criteria;
pub mod pairwise;
pub mod precision;

pub use criteria::{run_criteria, CriteriaItem, CriteriaMode, CriteriaOptions, CriteriaReport};
pub use pairwise::{run_pairwise, JudgeMode, PairwiseItem, PairwiseOptions, PairwiseReport, PairwisePrompts};
pub use precision::{run_precision, ExpectedSource, PrecisionItem, PrecisionReport};

use serde::{Deserialize, Serialize};
use std::fmt;

use evalkit::{ExampleRecord, MetricResult};

use crate::config::Config;
use crate::prompts::{PromptTemplate, TemplateError};
use crate::providers::CompletionRequest;

/// Errors that stop a flow before any request is sent
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Template {template}, example {index}: {source}")]
    Template {
        template: String,
        index: usize,
        #[source]
        source: TemplateError,
    },

    #[error("No criteria given")]
    NoCriteria,
}

/// Kind of value a score carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Numeric,
    Categorical,
}

/// Value of a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Numeric(f64),
    Categorical(String),
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreValue::Numeric(v) => write!(f, "{:.3}", v),
            ScoreValue::Categorical(s) => f.write_str(s),
        }
    }
}

/// A named score attached to one run, as ingested by the scoring backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub value: ScoreValue,
    pub data_type: DataType,
    pub comment: String,
}

impl ScoreRecord {
    pub fn numeric(name: impl Into<String>, value: f64, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ScoreValue::Numeric(value),
            data_type: DataType::Numeric,
            comment: comment.into(),
        }
    }

    pub fn categorical(
        name: impl Into<String>,
        value: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: ScoreValue::Categorical(value.into()),
            data_type: DataType::Categorical,
            comment: comment.into(),
        }
    }
}

impl From<&MetricResult> for ScoreRecord {
    fn from(metric: &MetricResult) -> Self {
        Self::numeric(metric.key.clone(), metric.score, metric.comment.clone())
    }
}

/// Model and sampling parameters applied to every request of a run
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmSettings {
    /// Single user-turn request carrying these settings
    pub fn request(&self, prompt: impl Into<String>) -> CompletionRequest {
        CompletionRequest::prompt(prompt, self.max_tokens)
            .with_model(&self.model)
            .with_temperature(self.temperature)
    }
}

impl From<&Config> for LlmSettings {
    fn from(config: &Config) -> Self {
        Self {
            model: config.model().to_string(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }
}

/// Render `template` for every example, failing on the first bad example
pub(crate) fn render_requests(
    template: &PromptTemplate,
    examples: &[ExampleRecord],
    settings: &LlmSettings,
) -> Result<Vec<CompletionRequest>, EvalError> {
    examples
        .iter()
        .enumerate()
        .map(|(index, example)| {
            template
                .render_example(example, &[])
                .map(|prompt| settings.request(prompt))
                .map_err(|source| EvalError::Template {
                    template: template.name().to_string(),
                    index,
                    source,
                })
        })
        .collect()
}
