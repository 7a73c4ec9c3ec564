//! End-to-end evaluation flows against an in-memory provider

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use evalkit::{Criterion, Decision};
use evalkit_runner::prelude::*;
use evalkit_runner::evaluation::ScoreValue;

type Script = dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync;

/// Answers each prompt with a scripted reply
struct ScriptedProvider {
    script: Box<Script>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(script: impl Fn(&str) -> Result<String, ProviderError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = (self.script)(request.last_user_content())?;
        Ok(CompletionResponse {
            content,
            model: request.model.clone().unwrap_or_default(),
            input_tokens: 10,
            output_tokens: 5,
        })
    }
}

fn executor(provider: Arc<ScriptedProvider>) -> Executor {
    Executor::new(
        provider,
        ExecutorConfig {
            parallel_requests: 3,
            retry_count: 1,
            retry_delay_ms: 1,
            max_retry_delay_ms: 2,
            timeout_ms: 2_000,
        },
    )
}

fn settings() -> LlmSettings {
    LlmSettings {
        model: "scripted-1".to_string(),
        temperature: 0.0,
        max_tokens: 256,
    }
}

fn api_error() -> ProviderError {
    ProviderError::Api {
        status: 500,
        message: "upstream down".to_string(),
    }
}

// =========================================================================
// Precision
// =========================================================================

const SECURITY_DATASET: &str = r#"
{"id": "sql", "inputs": {"code": "cursor.execute('SELECT * FROM t WHERE id=' + uid)"}, "outputs": {"expected_findings": [{"type": "sql_injection", "severity": "critical"}], "expected_issue_types": ["sql_injection"]}}
{"id": "http", "inputs": {"code": "requests.get(url)"}, "outputs": {"expected_findings": [{"type": "missing_timeout", "severity": "medium"}], "expected_issue_types": ["missing_timeout"]}}
{"id": "clean", "inputs": {"code": "print('hi')"}, "outputs": {"expected_findings": [], "expected_issue_types": []}}
"#;

fn security_reviewer(prompt: &str) -> Result<String, ProviderError> {
    if prompt.contains("cursor.execute") {
        Ok("```json\n{\"findings\": [{\"type\": \"sql_injection\", \"severity\": \"Critical\", \"line\": 1}]}\n```".to_string())
    } else if prompt.contains("requests.get") {
        Err(api_error())
    } else {
        Ok(r#"{"findings": [{"type": "style", "severity": "low"}]}"#.to_string())
    }
}

#[tokio::test]
async fn precision_flow_counts_failed_items_as_misses() {
    let examples = load_dataset_from_str(SECURITY_DATASET).unwrap();
    let template = PromptTemplate::new("security", "Review this code:\n{code}");
    let provider = ScriptedProvider::new(security_reviewer);

    let report = run_precision(
        &executor(provider.clone()),
        &settings(),
        &template,
        &examples,
        ExpectedSource::Findings,
    )
    .await
    .unwrap();

    assert_eq!(report.items.len(), 3);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.items[1].id.as_deref(), Some("http"));
    assert!(report.items[1].error.as_deref().unwrap().contains("upstream down"));

    let [precision, recall, f1] = &report.metrics;
    assert_eq!(precision.comment, "TP:1 FP:1");
    assert_eq!(precision.score, 0.5);
    assert_eq!(recall.comment, "TP:1 FN:1");
    assert_eq!(recall.score, 0.5);
    assert_eq!(f1.comment, "P:0.50 R:0.50");

    // one retry for the failing item
    assert_eq!(provider.calls.load(Ordering::SeqCst), 4);

    let scores = report.scores();
    assert_eq!(scores.len(), 3);
    assert_eq!(scores[2].name, "f1");
}

#[tokio::test]
async fn precision_flow_by_issue_type() {
    let examples = load_dataset_from_str(SECURITY_DATASET).unwrap();
    let template = PromptTemplate::new("security", "{code}");
    let provider = ScriptedProvider::new(|_| {
        Ok(r#"{"findings": [{"type": "sql_injection", "severity": "low"}]}"#.to_string())
    });

    let report = run_precision(
        &executor(provider),
        &settings(),
        &template,
        &examples,
        ExpectedSource::IssueTypes,
    )
    .await
    .unwrap();

    assert_eq!(report.counts.true_positives, 1);
    assert_eq!(report.counts.false_positives, 2);
    assert_eq!(report.counts.false_negatives, 1);
}

#[tokio::test]
async fn template_errors_abort_before_any_call() {
    let examples = load_dataset_from_str(SECURITY_DATASET).unwrap();
    let template = PromptTemplate::new("broken", "Review {source_code}");
    let provider = ScriptedProvider::new(security_reviewer);

    let err = run_precision(
        &executor(provider.clone()),
        &settings(),
        &template,
        &examples,
        ExpectedSource::Findings,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EvalError::Template { index: 0, .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

// =========================================================================
// Pairwise
// =========================================================================

const DOCS_DATASET: &str = r#"
{"id": "d1", "inputs": {"files": "auth.py"}, "outputs": {"reference": "Documents login()"}}
{"id": "d2", "inputs": {"files": "cache.py"}, "outputs": {"reference": "Documents get()"}}
{"id": "d3", "inputs": {"files": "broken.py"}}
"#;

fn doc_prompts() -> PairwisePrompts {
    PairwisePrompts {
        prompt_a: PromptTemplate::new("prompt_doc_a", "DOC-A {files}"),
        prompt_b: PromptTemplate::new("prompt_doc_b", "DOC-B {files}"),
        judge: PromptTemplate::new(
            "llm_judge_pairwise",
            "JUDGE\nA: {answer_a}\nB: {answer_b}\nREF: {reference}\nReply as {\"decision\": ...}",
        ),
    }
}

fn doc_writer(prompt: &str) -> Result<String, ProviderError> {
    if let Some(file) = prompt.strip_prefix("DOC-A ") {
        Ok(format!("short docs for {}", file))
    } else if let Some(file) = prompt.strip_prefix("DOC-B ") {
        if file == "broken.py" {
            return Err(api_error());
        }
        Ok(format!("thorough docs for {}", file))
    } else if prompt.contains("auth.py") {
        Ok(r#"```json
{"decision": "B", "reasoning": {"score_total_a": 30, "score_total_b": 45, "final_decision": "B",
 "technical_precision": {"score_a": 6, "score_b": 9, "justification": "B covers errors"}}}
```"#
            .to_string())
    } else {
        Ok("not json at all".to_string())
    }
}

#[tokio::test]
async fn pairwise_flow_structured() {
    let examples = load_dataset_from_str(DOCS_DATASET).unwrap();
    let options = PairwiseOptions::new(JudgeMode::Structured, "0915");

    let report = run_pairwise(
        &executor(ScriptedProvider::new(doc_writer)),
        &settings(),
        &doc_prompts(),
        &examples,
        &options,
    )
    .await
    .unwrap();

    assert_eq!(report.items.len(), 3);

    let first = &report.items[0];
    assert_eq!(first.decision, Some(Decision::B));
    assert_eq!(first.answer_a.as_deref(), Some("short docs for auth.py"));
    assert_eq!(first.judge_scores[0].name, "Winner");
    assert_eq!(
        first.judge_scores[0].value,
        ScoreValue::Categorical("ExperimentB_0915".to_string())
    );
    assert_eq!(
        first.judge_scores[0].comment,
        "Scores: A=30/50, B=45/50\n\nTotal Scores - A: 30/50, B: 45/50\n\nDecision: B\n\nTechnical Precision: A=6/10, B=9/10\n  -> B covers errors"
    );
    assert_eq!(first.scores_a[0].value, ScoreValue::Categorical("Lost".to_string()));
    assert!(first.scores_a[0].comment.starts_with("Lost against ExperimentB_0915"));
    assert_eq!(first.scores_b[0].value, ScoreValue::Categorical("Won".to_string()));

    let second = &report.items[1];
    assert_eq!(second.decision, Some(Decision::Tie));
    assert_eq!(second.reasoning.error(), Some("Failed to parse JSON"));

    let third = &report.items[2];
    assert_eq!(third.decision, None);
    assert!(third.error.as_deref().unwrap().starts_with("candidate B:"));
    assert!(third.judge_scores.is_empty());

    assert_eq!(report.tally.wins_b, 1);
    assert_eq!(report.tally.ties, 1);
    assert_eq!(report.tally.total(), 2);
    assert_eq!(report.tally.mean_weights(), [0.25, 0.75]);
    assert_eq!(report.failed(), 1);
}

#[tokio::test]
async fn pairwise_judge_sees_both_answers_and_reference() {
    let examples = load_dataset_from_str(DOCS_DATASET).unwrap();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = seen.clone();
    let provider = ScriptedProvider::new(move |prompt| {
        if prompt.starts_with("JUDGE") {
            log.lock().unwrap().push(prompt.to_string());
            return Ok("Answer: A is clearly better".to_string());
        }
        Ok(prompt.to_lowercase())
    });

    let report = run_pairwise(
        &executor(provider),
        &settings(),
        &doc_prompts(),
        &examples,
        &PairwiseOptions::new(JudgeMode::Keyword, "0915"),
    )
    .await
    .unwrap();

    assert!(report.items.iter().all(|i| i.decision == Some(Decision::A)));
    assert_eq!(report.tally.wins_a, 3);

    let prompts = seen.lock().unwrap();
    assert_eq!(prompts.len(), 3);
    assert!(prompts.iter().any(|p| p.contains(
        "A: doc-a auth.py\nB: doc-b auth.py\nREF: Documents login()\nReply as {\"decision\": ...}"
    )));
    // no reference in the dataset renders as empty
    assert!(prompts.iter().any(|p| p.contains("REF: \n")));
}

// =========================================================================
// Criteria
// =========================================================================

#[tokio::test]
async fn criteria_flow_binary() {
    let examples = load_dataset_from_str(
        r#"{"inputs": {"code": "def add(a, b): return a + b"}}
{"inputs": {"code": "x = 1"}}"#,
    )
    .unwrap();
    let provider = ScriptedProvider::new(|prompt| {
        if !prompt.contains("[BEGIN DATA]") {
            return Ok(format!("Review of: {}", prompt));
        }
        if prompt.contains("[Criteria]: conciseness") {
            Ok("The review is brief.\nY".to_string())
        } else if prompt.contains("x = 1") {
            Ok("I am not sure.".to_string())
        } else {
            Ok("Not helpful.\nN".to_string())
        }
    });

    let options = CriteriaOptions {
        criteria: vec![
            Criterion::builtin("conciseness").unwrap(),
            Criterion::builtin("helpfulness").unwrap(),
        ],
        mode: CriteriaMode::Binary { with_reference: false },
        input_key: "code".to_string(),
    };
    let report = run_criteria(
        &executor(provider),
        &settings(),
        &PromptTemplate::new("criteria_eval", "{code}"),
        &examples,
        &options,
    )
    .await
    .unwrap();

    assert_eq!(report.averages["conciseness"], 1.0);
    assert_eq!(report.averages["helpfulness"], 0.0);

    let second = &report.items[1];
    assert_eq!(second.scores[1].name, "helpfulness");
    assert_eq!(second.scores[1].value, ScoreValue::Numeric(0.0));
    assert_eq!(second.scores[1].comment, "could not parse verdict");
    assert_eq!(second.grades[1].score, None);
}

#[tokio::test]
async fn criteria_flow_labeled() {
    let examples = load_dataset_from_str(
        r#"{"inputs": {"code": "sum([1, 2])"}, "outputs": {"reference": "3"}}"#,
    )
    .unwrap();
    let provider = ScriptedProvider::new(|prompt| {
        if prompt.contains("[Ground truth]\n3") {
            Ok("Matches the reference.\nRating: [[8]]".to_string())
        } else {
            Ok("3".to_string())
        }
    });

    let options = CriteriaOptions {
        criteria: vec![Criterion::builtin("correctness").unwrap()],
        mode: CriteriaMode::Labeled { normalize_by: 10.0 },
        input_key: "code".to_string(),
    };
    let report = run_criteria(
        &executor(provider),
        &settings(),
        &PromptTemplate::new("answer", "{code}"),
        &examples,
        &options,
    )
    .await
    .unwrap();

    assert_eq!(report.averages["correctness"], 0.8);
    assert_eq!(report.items[0].grades[0].score, Some(0.8));
}

#[tokio::test]
async fn criteria_requires_criteria() {
    let options = CriteriaOptions {
        criteria: Vec::new(),
        mode: CriteriaMode::Binary { with_reference: false },
        input_key: "code".to_string(),
    };
    let err = run_criteria(
        &executor(ScriptedProvider::new(|_| Ok(String::new()))),
        &settings(),
        &PromptTemplate::new("answer", "{code}"),
        &[],
        &options,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EvalError::NoCriteria));
}
