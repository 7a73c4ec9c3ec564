//! EvalKit runner: dataset-driven evaluation of LLM prompts
//!
//! Drives an OpenAI-compatible chat endpoint over a JSONL dataset and scores
//! the responses with the `evalkit` core.
//!
//! # Features
//!
//! - precision / recall / F1 of structured findings against ground truth
//! - pairwise "A vs B" prompt comparison with a judge model
//! - binary and labeled-score criteria grading
//! - bounded parallelism, sliding-window rate limits, retries and timeouts
//!
//! # Example
//!
//! ```no_run
//! use evalkit_runner::{
//!     config::Config,
//!     datasets::load_dataset,
//!     evaluation::{run_precision, ExpectedSource, LlmSettings},
//!     prompts::PromptTemplate,
//!     providers::create_provider,
//!     runner::Executor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default();
//!     let executor = Executor::new(create_provider(&config)?, config.executor_config());
//!
//!     let examples = load_dataset("data/security.jsonl")?;
//!     let template = PromptTemplate::from_file("prompts/security_expert.txt")?;
//!
//!     let report = run_precision(
//!         &executor,
//!         &LlmSettings::from(&config),
//!         &template,
//!         &examples,
//!         ExpectedSource::Findings,
//!     )
//!     .await?;
//!     println!("f1 = {:.3}", report.metrics[2].score);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod datasets;
pub mod evaluation;
pub mod prompts;
pub mod providers;
pub mod reporting;
pub mod runner;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{Config, ConfigError};
    pub use crate::datasets::{load_dataset, load_dataset_from_str, DatasetError};
    pub use crate::evaluation::{
        run_criteria, run_pairwise, run_precision, CriteriaMode, CriteriaOptions, EvalError,
        ExpectedSource, JudgeMode, LlmSettings, PairwiseOptions, PairwisePrompts, ScoreRecord,
    };
    pub use crate::prompts::{PromptTemplate, TemplateError};
    pub use crate::providers::{
        create_provider, CompletionRequest, CompletionResponse, LLMProvider, Message,
        ProviderError, ProviderResult,
    };
    pub use crate::reporting::{JsonSummary, RunInfo};
    pub use crate::runner::{Executor, ExecutorConfig, ItemResult};
}
