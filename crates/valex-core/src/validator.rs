//! Rules-driven validation of a bean
//!
//! [`RulesValidator`] keeps at most one live message per rule instance. A
//! pass re-evaluates the applicable rules and diffs the outcome against the
//! messages it recorded last time:
//!
//! - violated with the same message: nothing changes
//! - violated with a different message: the old one is replaced
//! - satisfied: the rule's message is removed
//!
//! A pass without a property filter, or over an object of a different type
//! than the previous one, starts from an empty slate.

use std::collections::HashMap;
use std::sync::Arc;

use valex_core_types::{ConstraintId, ValidationMessage};

use crate::config::ValidatorConfig;
use crate::errors::Result;
use crate::model::DefaultValidationResultsModel;
use crate::property::Validatable;
use crate::reporting::{BeanValidationResultsCollector, MessageTranslator};
use crate::results::{DefaultValidationResults, ValidationResults};
use crate::rules::RulesSource;
use crate::{log_op_end, log_op_error, log_op_start};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Change {
    Added(ValidationMessage),
    Removed(ValidationMessage),
    Replaced {
        old: ValidationMessage,
        new: ValidationMessage,
    },
}

pub struct RulesValidator {
    rules_source: Arc<dyn RulesSource>,
    translator: Box<dyn MessageTranslator>,
    config: ValidatorConfig,
    results: DefaultValidationResults,
    rule_messages: HashMap<ConstraintId, ValidationMessage>,
    last_type: Option<String>,
    results_model: Option<DefaultValidationResultsModel>,
}

impl RulesValidator {
    pub fn new(rules_source: Arc<dyn RulesSource>, translator: Box<dyn MessageTranslator>) -> Self {
        Self {
            rules_source,
            translator,
            config: ValidatorConfig::default(),
            results: DefaultValidationResults::new(),
            rule_messages: HashMap::new(),
            last_type: None,
            results_model: None,
        }
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Mirror every change into `model`'s local results
    pub fn with_results_model(mut self, model: DefaultValidationResultsModel) -> Self {
        self.results_model = Some(model);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn results(&self) -> &DefaultValidationResults {
        &self.results
    }

    pub fn results_model(&self) -> Option<&DefaultValidationResultsModel> {
        self.results_model.as_ref()
    }

    /// Validate `object`, or only the rules depending on `property`
    ///
    /// `None` clears every message this validator produced.
    ///
    /// # Errors
    ///
    /// Returns `BuilderProtocol` if rule evaluation breaks the builder
    /// protocol; the results keep the changes made before the failing rule.
    pub fn validate(
        &mut self,
        object: Option<&dyn Validatable>,
        property: Option<&str>,
    ) -> Result<&DefaultValidationResults> {
        log_op_start!(
            "validate",
            type_name = object.map(|o| o.type_name()),
            property = property
        );
        let start = std::time::Instant::now();

        self.validate_impl(object, property).map_err(|e| {
            log_op_error!(
                "validate",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "validate",
            duration_ms = start.elapsed().as_millis() as u64,
            message_count = self.results.message_count()
        );
        Ok(&self.results)
    }

    /// Drop every message and forget the last validated type
    pub fn clear(&mut self) {
        self.results.clear_messages();
        self.rule_messages.clear();
        self.last_type = None;
        self.sync_model(true, &[]);
    }

    fn validate_impl(&mut self, object: Option<&dyn Validatable>, property: Option<&str>) -> Result<()> {
        let Some(object) = object else {
            self.clear();
            return Ok(());
        };

        let type_name = object.type_name();
        let type_changed = self.last_type.as_deref() != Some(type_name);
        let full_pass = property.is_none() || type_changed;
        if full_pass {
            self.results.clear_messages();
            self.rule_messages.clear();
        }
        self.last_type = Some(type_name.to_string());

        let rules = object.constraints().or_else(|| {
            self.rules_source
                .rules(type_name, self.config.context_id.as_deref())
        });
        let Some(rules) = rules else {
            tracing::debug!(type_name, "no rules for type");
            self.sync_model(full_pass, &[]);
            return Ok(());
        };

        let mut collector = BeanValidationResultsCollector::new(object)
            .collect_all_errors(self.config.collect_all_errors);
        let mut changes = Vec::new();
        let mut outcome = Ok(());

        for rule in rules.constraints() {
            if property.is_some_and(|p| !rule.is_dependent_on(p)) {
                continue;
            }
            if !object.has_property(rule.property_name()) {
                continue;
            }

            let violation = match collector.collect_property_results(rule) {
                Ok(violation) => violation,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            };
            let change = match violation {
                Some(results) => {
                    let message = ValidationMessage::new(
                        results.property_name(),
                        self.config.severity,
                        self.translator.message_for(&results),
                    );
                    self.record_violation(rule.id(), message)
                }
                None => self.record_satisfied(rule.id()),
            };
            changes.extend(change);
        }

        self.sync_model(full_pass, &changes);
        outcome
    }

    fn record_violation(&mut self, rule: ConstraintId, message: ValidationMessage) -> Option<Change> {
        if self.rule_messages.get(&rule) == Some(&message) {
            return None;
        }
        let old = self.rule_messages.insert(rule, message.clone());
        let added = self.results.add_message(message.clone());
        match old {
            Some(old) if !self.is_shared(&old) => {
                self.results.remove_message(&old);
                Some(Change::Replaced { old, new: message })
            }
            _ if added => Some(Change::Added(message)),
            _ => None,
        }
    }

    fn record_satisfied(&mut self, rule: ConstraintId) -> Option<Change> {
        let old = self.rule_messages.remove(&rule)?;
        if self.is_shared(&old) {
            return None;
        }
        self.results.remove_message(&old);
        Some(Change::Removed(old))
    }

    /// Another rule still maps to an equal message
    fn is_shared(&self, message: &ValidationMessage) -> bool {
        self.rule_messages.values().any(|m| m == message)
    }

    fn sync_model(&self, full_pass: bool, changes: &[Change]) {
        let Some(model) = &self.results_model else {
            return;
        };
        if full_pass {
            if model.local_results() != self.results {
                model.update_validation_results(self.results.clone());
            }
            return;
        }
        for change in changes {
            match change {
                Change::Added(message) => model.add_message(message.clone()),
                Change::Removed(message) => model.remove_message(message),
                Change::Replaced { old, new } => model.replace_message(old, new.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::min_length;
    use crate::property::PropertyBag;
    use crate::reporting::DefaultMessageTranslator;
    use crate::rules::{DefaultRulesSource, Rules};

    fn validator() -> RulesValidator {
        let mut rules = Rules::new("User");
        rules
            .add_required("username")
            .add("username", min_length(2))
            .add_required("password");
        let mut source = DefaultRulesSource::new();
        source.add_rules(rules);
        RulesValidator::new(Arc::new(source), Box::new(DefaultMessageTranslator::new()))
    }

    #[test]
    fn test_none_object_clears() {
        let mut validator = validator();
        let bean = PropertyBag::new("User").with("username", "").with("password", "");
        assert_eq!(validator.validate(Some(&bean), None).unwrap().message_count(), 2);
        assert_eq!(validator.validate(None, None).unwrap().message_count(), 0);
    }

    #[test]
    fn test_properties_without_value_are_skipped() {
        let mut validator = validator();
        let bean = PropertyBag::new("User").with("username", "x");
        let results = validator.validate(Some(&bean), None).unwrap();
        assert_eq!(results.message_count(), 1);
        assert_eq!(results.message_count_for_property("password"), 0);
    }

    #[test]
    fn test_type_switch_drops_stale_messages() {
        let mut validator = validator();
        let user = PropertyBag::new("User").with("username", "");
        validator.validate(Some(&user), None).unwrap();
        assert_eq!(validator.results().message_count(), 1);

        let order = PropertyBag::new("Order").with("username", "");
        let results = validator.validate(Some(&order), Some("username")).unwrap();
        assert_eq!(results.message_count(), 0);
    }

    #[test]
    fn test_self_describing_object_rules_win() {
        struct Signup;
        impl crate::property::PropertyAccessStrategy for Signup {
            fn property_value(&self, property: &str) -> Option<serde_json::Value> {
                (property == "email").then(|| serde_json::Value::from(""))
            }
        }
        impl Validatable for Signup {
            fn type_name(&self) -> &str {
                "User"
            }
            fn constraints(&self) -> Option<Rules> {
                let mut rules = Rules::new("User");
                rules.add_required("email");
                Some(rules)
            }
        }

        let mut validator = validator();
        let results = validator.validate(Some(&Signup), None).unwrap();
        assert_eq!(results.message_count_for_property("email"), 1);
    }
}
