//! Pairwise "A vs B" comparison judged by a model
//!
//! Per example: prompt A and prompt B each produce an answer, then the judge
//! prompt sees both (as `{answer_a}` / `{answer_b}`, plus the example inputs
//! and `{reference}`) and names a winner.

use serde::{Deserialize, Serialize};

use evalkit::{
    display_value, keyword_decision, parse_judge_response, Decision, ExampleRecord,
    PairwiseTally, Reasoning, Side,
};

use super::{render_requests, EvalError, LlmSettings, ScoreRecord};
use crate::prompts::PromptTemplate;
use crate::runner::{Executor, ItemResult};

pub const WINNER_SCORE: &str = "Winner";
pub const RESULT_SCORE: &str = "Pairwise Result";

/// How the judge's answer is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeMode {
    /// JSON verdict with `decision` and rubric `reasoning`
    #[default]
    Structured,
    /// Free-text verdict naming `A` or `B`
    Keyword,
}

/// The three prompts of a comparison
#[derive(Debug, Clone)]
pub struct PairwisePrompts {
    pub prompt_a: PromptTemplate,
    pub prompt_b: PromptTemplate,
    pub judge: PromptTemplate,
}

/// Labels identifying the two experiments in score records
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseOptions {
    pub mode: JudgeMode,
    pub label_a: String,
    pub label_b: String,
}

impl PairwiseOptions {
    /// Labels `ExperimentA_{stamp}` / `ExperimentB_{stamp}`
    pub fn new(mode: JudgeMode, stamp: &str) -> Self {
        Self {
            mode,
            label_a: format!("ExperimentA_{}", stamp),
            label_b: format!("ExperimentB_{}", stamp),
        }
    }

    fn label(&self, side: Side) -> &str {
        match side {
            Side::A => &self.label_a,
            Side::B => &self.label_b,
        }
    }
}

/// Per-example comparison outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseItem {
    pub index: usize,
    pub id: Option<String>,
    pub answer_a: Option<String>,
    pub answer_b: Option<String>,
    /// `None` when a candidate or the judge call failed
    pub decision: Option<Decision>,
    pub reasoning: Reasoning,
    /// Scores for the judge run, candidate A and candidate B
    pub judge_scores: Vec<ScoreRecord>,
    pub scores_a: Vec<ScoreRecord>,
    pub scores_b: Vec<ScoreRecord>,
    pub error: Option<String>,
}

impl PairwiseItem {
    pub fn weights(&self) -> Option<[f64; 2]> {
        self.decision.map(Decision::weights)
    }
}

/// Result of a pairwise run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseReport {
    pub label_a: String,
    pub label_b: String,
    pub items: Vec<PairwiseItem>,
    pub tally: PairwiseTally,
}

impl PairwiseReport {
    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| i.decision.is_none()).count()
    }
}

/// Run both candidates and the judge over every example.
///
/// Items where a candidate or the judge fails are reported with an error
/// and left out of the tally.
pub async fn run_pairwise(
    executor: &Executor,
    settings: &LlmSettings,
    prompts: &PairwisePrompts,
    examples: &[ExampleRecord],
    options: &PairwiseOptions,
) -> Result<PairwiseReport, EvalError> {
    let n = examples.len();
    let mut requests = render_requests(&prompts.prompt_a, examples, settings)?;
    requests.extend(render_requests(&prompts.prompt_b, examples, settings)?);

    tracing::info!(
        "Running {} vs {} on {} examples",
        prompts.prompt_a.name(),
        prompts.prompt_b.name(),
        n
    );
    let mut candidates = executor.execute_all(requests).await;
    let results_b = candidates.split_off(n);
    let results_a = candidates;

    // Judge only the examples where both candidates answered
    let mut judged = Vec::new();
    let mut judge_requests = Vec::new();
    for (index, example) in examples.iter().enumerate() {
        if let (Some(a), Some(b)) = (results_a[index].output(), results_b[index].output()) {
            let reference = example.reference_text();
            let prompt = prompts
                .judge
                .render_example(
                    example,
                    &[("answer_a", a), ("answer_b", b), ("reference", reference.as_str())],
                )
                .map_err(|source| EvalError::Template {
                    template: prompts.judge.name().to_string(),
                    index,
                    source,
                })?;
            judged.push(index);
            judge_requests.push(settings.request(prompt));
        }
    }

    tracing::info!("Judging {} of {} examples with {}", judged.len(), n, prompts.judge.name());
    let mut verdicts: Vec<Option<ItemResult>> = (0..n).map(|_| None).collect();
    for (result, index) in executor.execute_all(judge_requests).await.into_iter().zip(judged) {
        verdicts[index] = Some(result);
    }

    let mut tally = PairwiseTally::new();
    let items: Vec<PairwiseItem> = examples
        .iter()
        .enumerate()
        .map(|(index, example)| {
            let item = build_item(
                index,
                example,
                &results_a[index],
                &results_b[index],
                verdicts[index].as_ref(),
                options,
            );
            if let Some(decision) = item.decision {
                tally.record(decision);
            }
            item
        })
        .collect();

    Ok(PairwiseReport {
        label_a: options.label_a.clone(),
        label_b: options.label_b.clone(),
        items,
        tally,
    })
}

fn build_item(
    index: usize,
    example: &ExampleRecord,
    result_a: &ItemResult,
    result_b: &ItemResult,
    verdict: Option<&ItemResult>,
    options: &PairwiseOptions,
) -> PairwiseItem {
    let mut item = PairwiseItem {
        index,
        id: example.id.clone(),
        answer_a: result_a.output().map(str::to_string),
        answer_b: result_b.output().map(str::to_string),
        decision: None,
        reasoning: Reasoning::new(),
        judge_scores: Vec::new(),
        scores_a: Vec::new(),
        scores_b: Vec::new(),
        error: None,
    };

    let judge_text = match verdict {
        Some(result) => match result.output() {
            Some(text) => text,
            None => {
                item.error = Some(format!("judge: {}", result.error.as_deref().unwrap_or("no response")));
                return item;
            }
        },
        None => {
            let failed = [("A", result_a), ("B", result_b)]
                .iter()
                .filter_map(|(side, r)| r.error.as_ref().map(|e| format!("candidate {}: {}", side, e)))
                .collect::<Vec<_>>();
            item.error = Some(failed.join("; "));
            return item;
        }
    };

    let (decision, reasoning) = read_verdict(judge_text, options.mode);
    let (judge_scores, scores_a, scores_b) = score_records(decision, &reasoning, options);

    item.decision = Some(decision);
    item.reasoning = reasoning;
    item.judge_scores = judge_scores;
    item.scores_a = scores_a;
    item.scores_b = scores_b;
    item
}

fn read_verdict(text: &str, mode: JudgeMode) -> (Decision, Reasoning) {
    match mode {
        JudgeMode::Structured => {
            let verdict = parse_judge_response(text);
            (verdict.decision, verdict.reasoning)
        }
        JudgeMode::Keyword => (keyword_decision(text), Reasoning::new()),
    }
}

/// Winner record for the judge run plus one result record per candidate
fn score_records(
    decision: Decision,
    reasoning: &Reasoning,
    options: &PairwiseOptions,
) -> (Vec<ScoreRecord>, Vec<ScoreRecord>, Vec<ScoreRecord>) {
    let summary = reasoning.summary();
    let total = |v: Option<&serde_json::Value>| v.map(display_value).unwrap_or_else(|| "?".to_string());

    let winner = match decision {
        Decision::A => options.label_a.as_str(),
        Decision::B => options.label_b.as_str(),
        Decision::Tie => "TIE",
    };
    let judge = ScoreRecord::categorical(
        WINNER_SCORE,
        winner,
        format!(
            "Scores: A={}/50, B={}/50\n\n{}",
            total(reasoning.total_a()),
            total(reasoning.total_b()),
            summary
        ),
    );

    let side_record = |side: Side| {
        let outcome = decision.outcome_for(side);
        ScoreRecord::categorical(
            RESULT_SCORE,
            outcome.as_str(),
            format!("{} against {}\n\n{}", outcome, options.label(side.other()), summary),
        )
    };

    (vec![judge], vec![side_record(Side::A)], vec![side_record(Side::B)])
}
