//! Property-based tests for EvalKit scoring using proptest

use proptest::prelude::*;
use std::collections::HashSet;
use evalkit::{
    confusion_counts, findings_from_text, keyword_decision, parse_judge_response,
    precision_recall_f1, Decision, FindingId, PairwiseTally,
};

// =========================================================================
// Strategies
// =========================================================================

fn arb_finding_id() -> impl Strategy<Value = FindingId> {
    (
        prop_oneof![
            Just("sql_injection"),
            Just("missing_timeout"),
            Just("race_condition"),
            Just("null_deref"),
        ],
        prop_oneof![Just("critical"), Just("HIGH"), Just("Medium"), Just("low")],
    )
        .prop_map(|(kind, severity)| FindingId::new(kind, severity))
}

fn arb_set() -> impl Strategy<Value = HashSet<FindingId>> {
    prop::collection::hash_set(arb_finding_id(), 0..6)
}

fn arb_batch() -> impl Strategy<Value = Vec<(HashSet<FindingId>, HashSet<FindingId>)>> {
    prop::collection::vec((arb_set(), arb_set()), 0..8)
}

fn split(batch: &[(HashSet<FindingId>, HashSet<FindingId>)]) -> (Vec<HashSet<FindingId>>, Vec<HashSet<FindingId>>) {
    batch.iter().cloned().unzip()
}

// =========================================================================
// Metric properties
// =========================================================================

proptest! {
    #[test]
    fn identical_sets_score_perfectly(sets in prop::collection::vec(arb_set().prop_filter("non-empty", |s| !s.is_empty()), 1..8)) {
        let results = precision_recall_f1(&sets, &sets, |p| p.clone(), |e| e.clone());
        for result in &results {
            prop_assert_eq!(result.score, 1.0);
        }
    }

    #[test]
    fn disjoint_sets_score_zero(n in 1usize..8) {
        let predicted: Vec<HashSet<FindingId>> =
            (0..n).map(|i| [FindingId::new(format!("p{}", i), "high")].into_iter().collect()).collect();
        let expected: Vec<HashSet<FindingId>> =
            (0..n).map(|i| [FindingId::new(format!("e{}", i), "high")].into_iter().collect()).collect();

        let results = precision_recall_f1(&predicted, &expected, |p| p.clone(), |e| e.clone());
        for result in &results {
            prop_assert_eq!(result.score, 0.0);
        }
    }

    #[test]
    fn scores_stay_in_unit_interval(batch in arb_batch()) {
        let (predicted, expected) = split(&batch);
        for result in precision_recall_f1(&predicted, &expected, |p| p.clone(), |e| e.clone()) {
            prop_assert!(result.score.is_finite());
            prop_assert!((0.0..=1.0).contains(&result.score), "{} out of range: {}", result.key, result.score);
        }
    }

    #[test]
    fn counts_partition_both_sides(batch in arb_batch()) {
        let (predicted, expected) = split(&batch);
        let counts = confusion_counts(&predicted, &expected, |p| p.clone(), |e| e.clone());

        let predicted_total: usize = predicted.iter().map(HashSet::len).sum();
        let expected_total: usize = expected.iter().map(HashSet::len).sum();
        prop_assert_eq!(counts.true_positives + counts.false_positives, predicted_total);
        prop_assert_eq!(counts.true_positives + counts.false_negatives, expected_total);
    }

    #[test]
    fn f1_lies_between_precision_and_recall(batch in arb_batch()) {
        let (predicted, expected) = split(&batch);
        let counts = confusion_counts(&predicted, &expected, |p| p.clone(), |e| e.clone());
        let (p, r, f) = (counts.precision(), counts.recall(), counts.f1());

        prop_assert!(f <= p.max(r) + 1e-12);
        prop_assert!(f >= p.min(r) - 1e-12 || f == 0.0);
    }
}

// =========================================================================
// Parsing never panics and is deterministic
// =========================================================================

proptest! {
    #[test]
    fn finding_extraction_is_idempotent(text in ".{0,200}") {
        prop_assert_eq!(findings_from_text(&text), findings_from_text(&text));
    }

    #[test]
    fn finding_extraction_matches_generated_findings(findings in prop::collection::vec(arb_finding_id(), 0..6)) {
        let items: Vec<String> = findings
            .iter()
            .map(|f| format!(r#"{{"type": "{}", "severity": "{}", "line": 1}}"#, f.kind, f.severity.to_uppercase()))
            .collect();
        let text = format!("```json\n{{\"findings\": [{}]}}\n```", items.join(", "));

        let expected: HashSet<FindingId> = findings.into_iter().collect();
        prop_assert_eq!(findings_from_text(&text), expected);
    }

    #[test]
    fn judge_parse_never_panics(text in ".{0,200}") {
        let verdict = parse_judge_response(&text);
        let _ = verdict.reasoning.summary();
    }

    #[test]
    fn keyword_weights_sum_to_one(text in "[A-Za-z ,.!]{0,60}") {
        let [a, b] = keyword_decision(&text).weights();
        prop_assert_eq!(a + b, 1.0);
    }

    #[test]
    fn tally_matches_decision_count(decisions in prop::collection::vec(
        prop_oneof![Just(Decision::A), Just(Decision::B), Just(Decision::Tie)], 0..50)
    ) {
        let tally: PairwiseTally = decisions.iter().copied().collect();
        prop_assert_eq!(tally.total(), decisions.len());
        let [wa, wb] = tally.weight_totals;
        prop_assert!((wa + wb - decisions.len() as f64).abs() < 1e-9);
    }
}
