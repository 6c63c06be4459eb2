//! Evaluation semantics of the constraint collector

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::counting_leaf;
use proptest::prelude::*;
use serde_json::{json, Value};
use valex_core::constraint::{and, max_length, min_length, not, or, required};
use valex_core::ValidationResultsCollector;

fn collect_ok(constraint: &valex_core::Constraint) -> bool {
    ValidationResultsCollector::new()
        .collect(&Value::Null, constraint)
        .unwrap()
        .is_satisfied()
}

proptest! {
    /// And stops at the first failing child
    #[test]
    fn prop_and_short_circuits(outcomes in prop::collection::vec(any::<bool>(), 1..8)) {
        let counters: Vec<Arc<AtomicUsize>> =
            outcomes.iter().map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let children = outcomes
            .iter()
            .zip(&counters)
            .map(|(outcome, calls)| counting_leaf(*outcome, calls))
            .collect();

        let passed = collect_ok(&and(children));

        let first_false = outcomes.iter().position(|o| !o);
        prop_assert_eq!(passed, first_false.is_none());
        let last_evaluated = first_false.unwrap_or(outcomes.len() - 1);
        for (index, calls) in counters.iter().enumerate() {
            let expected = usize::from(index <= last_evaluated);
            prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
        }
    }

    /// Or stops at the first passing child
    #[test]
    fn prop_or_short_circuits(outcomes in prop::collection::vec(any::<bool>(), 1..8)) {
        let counters: Vec<Arc<AtomicUsize>> =
            outcomes.iter().map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let children = outcomes
            .iter()
            .zip(&counters)
            .map(|(outcome, calls)| counting_leaf(*outcome, calls))
            .collect();

        let passed = collect_ok(&or(children));

        let first_true = outcomes.iter().position(|o| *o);
        prop_assert_eq!(passed, first_true.is_some());
        let last_evaluated = first_true.unwrap_or(outcomes.len() - 1);
        for (index, calls) in counters.iter().enumerate() {
            let expected = usize::from(index <= last_evaluated);
            prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
        }
    }

    /// In collect-all mode every And child is evaluated
    #[test]
    fn prop_collect_all_evaluates_every_child(outcomes in prop::collection::vec(any::<bool>(), 1..8)) {
        let calls = Arc::new(AtomicUsize::new(0));
        let children = outcomes.iter().map(|o| counting_leaf(*o, &calls)).collect();
        let results = ValidationResultsCollector::new()
            .collect_all_errors(true)
            .collect(&Value::Null, &and(children))
            .unwrap();

        prop_assert_eq!(calls.load(Ordering::SeqCst), outcomes.len());
        let failures = outcomes.iter().filter(|o| !**o).count();
        prop_assert_eq!(results.violated_count(), failures);
    }

    /// A leaf under Not passes exactly when the leaf's own test fails
    #[test]
    fn prop_not_inverts_leaf(text in "[a-z]{0,6}", limit in 0usize..6) {
        let value = json!(text);
        let plain = ValidationResultsCollector::new()
            .collect(&value, &max_length(limit))
            .unwrap()
            .is_satisfied();
        let negated = ValidationResultsCollector::new()
            .collect(&value, &not(max_length(limit)))
            .unwrap()
            .is_satisfied();
        prop_assert_eq!(negated, !plain);
    }
}

#[test]
fn test_compound_under_not_keeps_its_own_logic() {
    // the And frame sits between Not and the leaves, so leaves are not negated
    let c = not(and(vec![required(), min_length(2)]));
    let results = ValidationResultsCollector::new()
        .collect(&json!("abc"), &c)
        .unwrap();
    assert!(results.is_satisfied());

    let results = ValidationResultsCollector::new()
        .collect(&json!(""), &c)
        .unwrap();
    assert_eq!(
        results.violated_constraint().unwrap().to_string(),
        "not (required)"
    );
}

#[test]
fn test_violated_tree_is_pruned() {
    let c = and(vec![
        or(vec![required(), min_length(10)]),
        min_length(5),
    ]);
    let results = ValidationResultsCollector::new()
        .collect_all_errors(true)
        .collect(&json!("abc"), &c)
        .unwrap();
    assert_eq!(
        results.violated_constraint().unwrap().to_string(),
        "(minLength(5))"
    );
    assert_eq!(results.rejected_value(), &json!("abc"));
}
