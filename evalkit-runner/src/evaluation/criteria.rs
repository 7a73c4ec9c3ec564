//! Criteria grading: one judge call per (example, criterion)

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use evalkit::{score_binary, score_rating, Criterion, CriterionScore, ExampleRecord};

use super::{render_requests, EvalError, LlmSettings, ScoreRecord};
use crate::prompts::PromptTemplate;
use crate::runner::{Executor, ItemResult};

const UNPARSED_COMMENT: &str = "could not parse verdict";

const BINARY_PROMPT: &str = "You are assessing a submitted answer on a given task or input based on a set of criteria. Here is the data:
[BEGIN DATA]
***
[Input]: {input}
***
[Submission]: {output}
***
[Criteria]: {criteria}
***
[END DATA]
Does the submission meet the Criteria? First, write out in a step by step manner your reasoning about the criterion to be sure that your conclusion is correct. Avoid simply stating the correct answers at the outset. Then print only the single character \"Y\" or \"N\" (without quotes or punctuation) on its own line corresponding to the correct answer of whether the submission meets the criterion.";

const BINARY_REFERENCE_PROMPT: &str = "You are assessing a submitted answer on a given task or input based on a set of criteria. Here is the data:
[BEGIN DATA]
***
[Input]: {input}
***
[Submission]: {output}
***
[Criteria]: {criteria}
***
[Reference]: {reference}
***
[END DATA]
Does the submission meet the Criteria, using the Reference as the correct answer? First, write out in a step by step manner your reasoning about the criterion to be sure that your conclusion is correct. Avoid simply stating the correct answers at the outset. Then print only the single character \"Y\" or \"N\" (without quotes or punctuation) on its own line corresponding to the correct answer of whether the submission meets the criterion.";

const RATING_PROMPT: &str = "Please act as an impartial judge and evaluate the quality of the response provided by an AI assistant to the user question displayed below. For this evaluation, you should primarily consider the following criteria:
{criteria}

[Ground truth]
{reference}

Begin your evaluation by providing a short explanation. Be as objective as possible. After providing your explanation, you must rate the response on a scale of 1 to 10 by strictly following this format: \"[[rating]]\", for example: \"Rating: [[5]]\".

[Question]
{input}

[The Start of Assistant's Answer]
{output}
[The End of Assistant's Answer]";

/// How the judge grades each criterion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CriteriaMode {
    /// Pass/fail verdict, optionally against the example's reference
    Binary { with_reference: bool },
    /// `[[n]]` rating against the reference, divided by `normalize_by`
    Labeled { normalize_by: f64 },
}

impl CriteriaMode {
    fn judge_template(self) -> PromptTemplate {
        match self {
            CriteriaMode::Binary { with_reference: false } => PromptTemplate::new("criteria", BINARY_PROMPT),
            CriteriaMode::Binary { with_reference: true } => {
                PromptTemplate::new("labeled_criteria", BINARY_REFERENCE_PROMPT)
            }
            CriteriaMode::Labeled { .. } => PromptTemplate::new("labeled_score_string", RATING_PROMPT),
        }
    }

    fn score(self, criterion: &str, text: &str) -> CriterionScore {
        match self {
            CriteriaMode::Binary { .. } => score_binary(criterion, text),
            CriteriaMode::Labeled { normalize_by } => score_rating(criterion, text, normalize_by),
        }
    }
}

/// What to grade and how
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaOptions {
    pub criteria: Vec<Criterion>,
    pub mode: CriteriaMode,
    /// Example input shown to the judge as `{input}`
    pub input_key: String,
}

/// Per-example grades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaItem {
    pub index: usize,
    pub id: Option<String>,
    pub output: Option<String>,
    pub grades: Vec<CriterionScore>,
    pub scores: Vec<ScoreRecord>,
    pub error: Option<String>,
}

/// Result of a criteria run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaReport {
    pub items: Vec<CriteriaItem>,
    /// Mean score per criterion over graded examples, in criteria order
    pub averages: IndexMap<String, f64>,
}

impl CriteriaReport {
    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| i.error.is_some()).count()
    }
}

/// Run the candidate prompt, then grade every answer on every criterion.
///
/// An unreadable verdict scores 0. Examples whose candidate call failed are
/// not graded and do not count toward the averages.
pub async fn run_criteria(
    executor: &Executor,
    settings: &LlmSettings,
    template: &PromptTemplate,
    examples: &[ExampleRecord],
    options: &CriteriaOptions,
) -> Result<CriteriaReport, EvalError> {
    if options.criteria.is_empty() {
        return Err(EvalError::NoCriteria);
    }

    let candidates = executor
        .execute_all(render_requests(template, examples, settings)?)
        .await;

    let judge = options.mode.judge_template();
    let mut slots = Vec::new();
    let mut judge_requests = Vec::new();
    for (index, (example, candidate)) in examples.iter().zip(&candidates).enumerate() {
        let Some(output) = candidate.output() else { continue };
        for (c, criterion) in options.criteria.iter().enumerate() {
            let vars = judge_vars(example, output, criterion, &options.input_key);
            let prompt = judge.render(&vars).map_err(|source| EvalError::Template {
                template: judge.name().to_string(),
                index,
                source,
            })?;
            slots.push((index, c));
            judge_requests.push(settings.request(prompt));
        }
    }

    tracing::info!(
        "Grading {} answers on {} criteria ({} judge calls)",
        candidates.iter().filter(|c| c.is_success()).count(),
        options.criteria.len(),
        judge_requests.len()
    );
    let verdicts = executor.execute_all(judge_requests).await;

    let mut grades: Vec<Vec<Option<ItemResult>>> = examples
        .iter()
        .map(|_| vec![None; options.criteria.len()])
        .collect();
    for ((index, c), verdict) in slots.into_iter().zip(verdicts) {
        grades[index][c] = Some(verdict);
    }

    let items: Vec<CriteriaItem> = examples
        .iter()
        .zip(&candidates)
        .zip(grades)
        .enumerate()
        .map(|(index, ((example, candidate), verdicts))| {
            grade_item(index, example, candidate, verdicts, options)
        })
        .collect();

    let averages = average_scores(&items, &options.criteria);
    Ok(CriteriaReport { items, averages })
}

fn judge_vars(
    example: &ExampleRecord,
    output: &str,
    criterion: &Criterion,
    input_key: &str,
) -> Map<String, Value> {
    let mut vars = Map::new();
    vars.insert("input".to_string(), Value::String(example.input_text(input_key)));
    vars.insert("output".to_string(), Value::String(output.to_string()));
    vars.insert(
        "criteria".to_string(),
        Value::String(format!("{}: {}", criterion.name, criterion.description)),
    );
    vars.insert("reference".to_string(), Value::String(example.reference_text()));
    vars
}

fn grade_item(
    index: usize,
    example: &ExampleRecord,
    candidate: &ItemResult,
    verdicts: Vec<Option<ItemResult>>,
    options: &CriteriaOptions,
) -> CriteriaItem {
    let mut item = CriteriaItem {
        index,
        id: example.id.clone(),
        output: candidate.output().map(str::to_string),
        grades: Vec::new(),
        scores: Vec::new(),
        error: candidate.error.clone(),
    };
    if item.output.is_none() {
        return item;
    }

    let mut judge_errors = Vec::new();
    for (criterion, verdict) in options.criteria.iter().zip(verdicts) {
        let verdict = match verdict {
            Some(v) if v.is_success() => v,
            other => {
                let reason = other
                    .and_then(|v| v.error)
                    .unwrap_or_else(|| "no response".to_string());
                judge_errors.push(format!("{}: {}", criterion.name, reason));
                continue;
            }
        };

        let grade = options
            .mode
            .score(&criterion.name, verdict.output().unwrap_or_default());
        let comment = if grade.score.is_some() {
            grade.reasoning.clone()
        } else {
            UNPARSED_COMMENT.to_string()
        };
        item.scores
            .push(ScoreRecord::numeric(&criterion.name, grade.score.unwrap_or(0.0), comment));
        item.grades.push(grade);
    }

    if !judge_errors.is_empty() {
        item.error = Some(format!("judge: {}", judge_errors.join("; ")));
    }
    item
}

fn average_scores(items: &[CriteriaItem], criteria: &[Criterion]) -> IndexMap<String, f64> {
    criteria
        .iter()
        .map(|criterion| {
            let scores: Vec<f64> = items
                .iter()
                .flat_map(|item| &item.grades)
                .filter(|g| g.criterion == criterion.name)
                .map(|g| g.score.unwrap_or(0.0))
                .collect();
            let mean = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };
            (criterion.name.clone(), mean)
        })
        .collect()
}
