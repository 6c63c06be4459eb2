use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use valex_core::constraint::{min_length, FnPredicate};
use valex_core::reporting::DefaultMessageTranslator;
use valex_core::{
    Constraint, DefaultRulesSource, PropertyChangeEvent, Rules, RulesValidator,
    ValidationResults,
};

/// `username` and `password`, each required with at least two characters
#[allow(dead_code)]
pub fn user_rules() -> Rules {
    let mut rules = Rules::new("User");
    rules
        .add_required("username")
        .add("username", min_length(2))
        .add_required("password")
        .add("password", min_length(2));
    rules
}

/// Validator over a rules source holding `rules`
#[allow(dead_code)]
pub fn validator_for(rules: Rules) -> RulesValidator {
    let mut source = DefaultRulesSource::new();
    source.add_rules(rules);
    RulesValidator::new(Arc::new(source), Box::new(DefaultMessageTranslator::new()))
}

/// Leaf with a fixed outcome that counts how often it is tested
#[allow(dead_code)]
pub fn counting_leaf(outcome: bool, calls: &Arc<AtomicUsize>) -> Constraint {
    let calls = Arc::clone(calls);
    Constraint::leaf(FnPredicate::new(
        if outcome { "alwaysTrue" } else { "alwaysFalse" },
        move |_: &Value| {
            calls.fetch_add(1, Ordering::SeqCst);
            outcome
        },
    ))
}

/// Validation listener that counts notifications
#[allow(dead_code)]
pub fn counting_listener() -> (Rc<RefCell<usize>>, impl Fn(&dyn ValidationResults)) {
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    (count, move |_: &dyn ValidationResults| {
        *sink.borrow_mut() += 1
    })
}

/// Property-change listener that records every event
#[allow(dead_code)]
pub fn recording_listener() -> (
    Rc<RefCell<Vec<PropertyChangeEvent>>>,
    impl Fn(&PropertyChangeEvent),
) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    (events, move |event: &PropertyChangeEvent| {
        sink.borrow_mut().push(*event)
    })
}
