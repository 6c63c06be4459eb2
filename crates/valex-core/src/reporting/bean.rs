//! Per-property collection against a bean
//!
//! Each top-level property rule is evaluated on its own: the builder's
//! stack is cleared, the rule's property value is read through the
//! accessor, and the violation (if any) is read back keyed by the rule's
//! property name.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::constraint::{Constraint, PropertyConstraint};
use crate::errors::Result;
use crate::property::PropertyAccessStrategy;
use crate::reporting::builder::{ValidationResultsBuilder, ViolationSink};
use crate::reporting::collector::ConstraintEvaluator;
use crate::reporting::summing::SummingVisitor;
use crate::rules::Rules;

/// Violation of one property rule
#[derive(Debug, Clone)]
pub struct PropertyResults {
    property_name: String,
    rejected_value: Value,
    violated_constraint: Constraint,
}

impl PropertyResults {
    pub fn new(
        property_name: impl Into<String>,
        rejected_value: Value,
        violated_constraint: Constraint,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            rejected_value,
            violated_constraint,
        }
    }

    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// The property's value at evaluation time
    pub fn rejected_value(&self) -> &Value {
        &self.rejected_value
    }

    /// Pruned violating tree
    pub fn violated_constraint(&self) -> &Constraint {
        &self.violated_constraint
    }

    pub fn violated_count(&self) -> usize {
        SummingVisitor::count(&self.violated_constraint)
    }
}

/// Violations of a bean, keyed by property name
#[derive(Debug, Clone, Default)]
pub struct BeanValidationResults {
    results: BTreeMap<String, PropertyResults>,
}

impl BeanValidationResults {
    pub fn property_results(&self, property: &str) -> Option<&PropertyResults> {
        self.results.get(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyResults> {
        self.results.values()
    }

    /// Properties with a violation, in name order
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Violated leaves across every property
    pub fn violated_count(&self) -> usize {
        self.results.values().map(PropertyResults::violated_count).sum()
    }
}

#[derive(Debug, Default)]
struct PropertySink {
    violated: Option<Constraint>,
}

impl ViolationSink for PropertySink {
    fn constraint_violated(&mut self, constraint: Constraint) {
        self.violated = Some(constraint);
    }
}

/// Collects one result per property rule, reading values through `A`
pub struct BeanValidationResultsCollector<'a, A: ?Sized> {
    accessor: &'a A,
    builder: ValidationResultsBuilder<PropertySink>,
    collect_all_errors: bool,
}

impl<'a, A> BeanValidationResultsCollector<'a, A>
where
    A: PropertyAccessStrategy + ?Sized,
{
    pub fn new(accessor: &'a A) -> Self {
        Self {
            accessor,
            builder: ValidationResultsBuilder::new(PropertySink::default()),
            collect_all_errors: false,
        }
    }

    pub fn collect_all_errors(mut self, collect_all_errors: bool) -> Self {
        self.collect_all_errors = collect_all_errors;
        self
    }

    /// Evaluate one property rule; `None` means satisfied
    ///
    /// # Errors
    ///
    /// Returns `BuilderProtocol` if evaluation leaves the builder in an
    /// inconsistent state.
    pub fn collect_property_results(
        &mut self,
        rule: &PropertyConstraint,
    ) -> Result<Option<PropertyResults>> {
        self.builder.clear();
        self.builder.sink_mut().violated = None;

        let property = rule.property_name();
        let value = self
            .accessor
            .property_value(property)
            .unwrap_or(Value::Null);

        ConstraintEvaluator::new(
            &mut self.builder,
            self.accessor,
            value.clone(),
            self.collect_all_errors,
        )
        .evaluate(&Constraint::Property(rule.clone()))?;

        let violated = self.builder.sink_mut().violated.take();
        tracing::trace!(
            property,
            violated = violated.is_some(),
            "property rule evaluated"
        );
        Ok(violated.map(|constraint| PropertyResults::new(property, value, constraint)))
    }

    /// Evaluate every rule in `rules`
    ///
    /// A later rule for the same property replaces an earlier one's result.
    ///
    /// # Errors
    ///
    /// Propagates the first evaluation error.
    pub fn collect_results(&mut self, rules: &Rules) -> Result<BeanValidationResults> {
        let mut results = BeanValidationResults::default();
        for rule in rules.constraints() {
            if let Some(property_results) = self.collect_property_results(rule)? {
                results
                    .results
                    .insert(property_results.property_name().to_string(), property_results);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{min_length, required, Relation};
    use crate::property::PropertyBag;
    use serde_json::json;

    fn user_rules() -> Rules {
        let mut rules = Rules::new("User");
        rules
            .add_required("username")
            .add("username", min_length(2))
            .add_required("password")
            .add("password", min_length(2));
        rules
    }

    #[test]
    fn test_collects_per_property() {
        let bean = PropertyBag::new("User")
            .with("username", "")
            .with("password", "ab");
        let mut collector = BeanValidationResultsCollector::new(&bean);
        let results = collector.collect_results(&user_rules()).unwrap();

        assert_eq!(results.len(), 1);
        let username = results.property_results("username").unwrap();
        assert_eq!(username.rejected_value(), &json!(""));
        assert_eq!(username.violated_count(), 1);
        assert!(results.property_results("password").is_none());
    }

    #[test]
    fn test_state_does_not_leak_between_rules() {
        let bean = json!({"username": "", "password": "abc"});
        let rules = user_rules();
        let mut collector = BeanValidationResultsCollector::new(&bean);
        let mut rules_iter = rules.constraints();
        let first = rules_iter.next().unwrap();
        let second = rules_iter.next().unwrap();

        assert!(collector.collect_property_results(first).unwrap().is_some());
        assert!(collector.collect_property_results(second).unwrap().is_none());
    }

    #[test]
    fn test_missing_property_reads_as_null() {
        let bean = json!({});
        let rule = PropertyConstraint::value("email", required());
        let mut collector = BeanValidationResultsCollector::new(&bean);
        let results = collector.collect_property_results(&rule).unwrap().unwrap();
        assert_eq!(results.rejected_value(), &Value::Null);
    }

    #[test]
    fn test_two_property_rule() {
        let bean = json!({"start": 5, "end": 2});
        let mut rules = Rules::new("Period");
        rules.add_constraint(PropertyConstraint::properties("start", Relation::Lte, "end"));
        let mut collector = BeanValidationResultsCollector::new(&bean);
        let results = collector.collect_results(&rules).unwrap();
        assert_eq!(
            results.property_results("start").unwrap().violated_constraint().to_string(),
            "start <= end"
        );
        assert_eq!(results.violated_count(), 1);
    }
}
