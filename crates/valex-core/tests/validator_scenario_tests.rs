//! End-to-end validation passes through `RulesValidator`

mod common;

use std::sync::Arc;

use common::{counting_listener, user_rules, validator_for};
use proptest::prelude::*;
use valex_core::constraint::{min_length, PropertyConstraint, Relation};
use valex_core::reporting::{DefaultMessageCatalog, DefaultMessageTranslator};
use valex_core::{
    DefaultRulesSource, DefaultValidationResultsModel, PropertyBag, Rules, RulesValidator,
    Severity, ValidationMessage, ValidationResults, ValidationResultsModel, ValidatorConfig,
};

#[test]
fn test_whole_object_then_single_property() {
    let mut validator = validator_for(user_rules());
    let mut bean = PropertyBag::new("User")
        .with("username", "")
        .with("password", "ab");

    let results = validator.validate(Some(&bean), None).unwrap();
    assert_eq!(results.message_count(), 1);
    let messages = results.messages_for_property("username");
    let message = messages.iter().next().unwrap();
    assert_eq!(message.message(), "Username is required.");
    assert_eq!(message.severity(), Severity::Error);
    assert_eq!(results.message_count_for_property("password"), 0);

    bean.set("username", "ab");
    let results = validator.validate(Some(&bean), Some("username")).unwrap();
    assert_eq!(results.message_count(), 0);
    assert_eq!(results.message_count_for_property("password"), 0);
}

#[test]
fn test_filtered_pass_leaves_other_properties_alone() {
    let mut validator = validator_for(user_rules());
    let mut bean = PropertyBag::new("User")
        .with("username", "")
        .with("password", "");
    validator.validate(Some(&bean), None).unwrap();
    assert_eq!(validator.results().message_count(), 2);

    bean.set("username", "abc");
    let results = validator.validate(Some(&bean), Some("username")).unwrap();
    assert_eq!(results.message_count(), 1);
    assert_eq!(results.message_count_for_property("password"), 1);
}

#[test]
fn test_unchanged_message_is_not_replaced() {
    let model = DefaultValidationResultsModel::new();
    let mut validator = validator_for(user_rules()).with_results_model(model.clone());
    let bean = PropertyBag::new("User")
        .with("username", "a")
        .with("password", "secret");
    validator.validate(Some(&bean), None).unwrap();

    let (changes, listener) = counting_listener();
    model.add_property_validation_listener("username", listener);

    validator.validate(Some(&bean), Some("username")).unwrap();
    validator.validate(Some(&bean), None).unwrap();
    assert_eq!(*changes.borrow(), 0);
    assert_eq!(model.message_count(), 1);
}

#[test]
fn test_changed_rejected_value_replaces_message() {
    let mut rules = Rules::new("User");
    rules.add("username", min_length(5));
    let mut source = DefaultRulesSource::new();
    source.add_rules(rules);
    let catalog = DefaultMessageCatalog::new().with_message("minLength", "is too short: {value}");
    let model = DefaultValidationResultsModel::new();
    let mut validator = RulesValidator::new(
        Arc::new(source),
        Box::new(DefaultMessageTranslator::new().with_catalog(catalog)),
    )
    .with_results_model(model.clone());

    let mut bean = PropertyBag::new("User").with("username", "ab");
    validator.validate(Some(&bean), None).unwrap();

    let (changes, listener) = counting_listener();
    model.add_property_validation_listener("username", listener);

    bean.set("username", "abc");
    let results = validator.validate(Some(&bean), Some("username")).unwrap();
    let expected = ValidationMessage::new("username", Severity::Error, "Username is too short: abc.");
    assert_eq!(results.message_count(), 1);
    assert!(results.messages().contains(&expected));
    assert_eq!(*changes.borrow(), 1);
    assert!(model.messages().contains(&expected));
    assert_eq!(model.message_count(), 1);
}

#[test]
fn test_model_sync_on_full_and_filtered_passes() {
    let model = DefaultValidationResultsModel::new();
    let mut validator = validator_for(user_rules()).with_results_model(model.clone());
    let mut bean = PropertyBag::new("User")
        .with("username", "")
        .with("password", "");

    validator.validate(Some(&bean), None).unwrap();
    assert_eq!(model.message_count(), 2);
    assert!(model.has_errors());

    bean.set("password", "secret");
    validator.validate(Some(&bean), Some("password")).unwrap();
    assert_eq!(model.message_count(), 1);

    validator.validate(None, None).unwrap();
    assert_eq!(model.message_count(), 0);
    assert!(!model.has_errors());
}

#[test]
fn test_context_and_severity_from_config() {
    let mut signup = Rules::new("User");
    signup.add_required("email");
    let mut source = DefaultRulesSource::new();
    source.add_rules(user_rules()).add_rules_for_context("signup", signup);

    let config = ValidatorConfig::from_json_str(r#"{"context_id": "signup", "severity": "WARNING"}"#)
        .unwrap();
    let mut validator = RulesValidator::new(
        Arc::new(source),
        Box::new(DefaultMessageTranslator::new()),
    )
    .with_config(config);

    let bean = PropertyBag::new("User")
        .with("username", "")
        .with("email", "");
    let results = validator.validate(Some(&bean), None).unwrap();
    assert_eq!(results.message_count(), 1);
    assert!(results.has_warnings());
    assert_eq!(results.message_count_for_property("email"), 1);
}

#[test]
fn test_cross_property_rule_revalidates_on_either_property() {
    let mut rules = Rules::new("Booking");
    rules.add_constraint(PropertyConstraint::properties("checkIn", Relation::Lt, "checkOut"));
    let mut validator = validator_for(rules);
    let mut bean = PropertyBag::new("Booking")
        .with("checkIn", "2024-05-03")
        .with("checkOut", "2024-05-01");

    let results = validator.validate(Some(&bean), None).unwrap();
    let messages = results.messages_for_property("checkIn");
    assert_eq!(
        messages.iter().next().unwrap().message(),
        "Check In must be less than Check Out."
    );

    bean.set("checkOut", "2024-05-09");
    let results = validator.validate(Some(&bean), Some("checkOut")).unwrap();
    assert_eq!(results.message_count(), 0);
}

#[test]
fn test_collect_all_errors_changes_message() {
    let mut validator = validator_for(user_rules())
        .with_config(ValidatorConfig::default().with_collect_all_errors(true));
    let bean = PropertyBag::new("User")
        .with("username", "")
        .with("password", "ok");
    let results = validator.validate(Some(&bean), None).unwrap();
    let messages = results.messages_for_property("username");
    assert_eq!(
        messages.iter().next().unwrap().message(),
        "Username is required and must be at least 2 characters."
    );
}

proptest! {
    /// Two full passes over an unchanged bean give equal results
    #[test]
    fn prop_full_validation_is_idempotent(username in "[a-z]{0,3}", password in "[a-z]{0,3}") {
        let mut validator = validator_for(user_rules());
        let bean = PropertyBag::new("User")
            .with("username", username)
            .with("password", password);

        let first = validator.validate(Some(&bean), None).unwrap().clone();
        let second = validator.validate(Some(&bean), None).unwrap().clone();
        prop_assert_eq!(first, second);
    }
}
