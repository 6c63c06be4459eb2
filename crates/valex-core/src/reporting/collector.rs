//! Constraint tree evaluation
//!
//! [`ConstraintEvaluator`] walks a tree with the visitor protocol, tests
//! every leaf it reaches against the current argument, and drives a
//! [`ValidationResultsBuilder`] so that the builder ends up holding only the
//! violating structure.
//!
//! Evaluation rules:
//! - `And` stops at the first failing child unless collecting all errors
//! - `Or` stops at the first passing child
//! - `Not` pops with its child's raw outcome; the negation is applied by
//!   leaves through [`ValidationResultsBuilder::negated`]
//! - `Transformed` evaluates its child against the transformed argument
//! - property nodes read live values through a [`PropertyAccessStrategy`];
//!   a value binding below the root is reported with its property

use std::sync::Arc;

use serde_json::Value;

use crate::constraint::{
    Constraint, ConstraintVisitor, Predicate, PropertyConstraint, PropertyConstraintKind, Transform,
};
use crate::errors::Result;
use crate::property::PropertyAccessStrategy;
use crate::reporting::builder::{ValidationResultsBuilder, ViolationSink};
use crate::reporting::summing::SummingVisitor;

pub(crate) struct ConstraintEvaluator<'a, S, A: ?Sized> {
    builder: &'a mut ValidationResultsBuilder<S>,
    accessor: &'a A,
    argument: Value,
    collect_all_errors: bool,
}

impl<'a, S, A> ConstraintEvaluator<'a, S, A>
where
    S: ViolationSink,
    A: PropertyAccessStrategy + ?Sized,
{
    pub(crate) fn new(
        builder: &'a mut ValidationResultsBuilder<S>,
        accessor: &'a A,
        argument: Value,
        collect_all_errors: bool,
    ) -> Self {
        Self {
            builder,
            accessor,
            argument,
            collect_all_errors,
        }
    }

    pub(crate) fn evaluate(&mut self, constraint: &Constraint) -> Result<bool> {
        constraint.accept(self)
    }

    fn read(&self, property: &str) -> Value {
        self.accessor.property_value(property).unwrap_or(Value::Null)
    }

    fn with_argument(&mut self, argument: Value, constraint: &Constraint) -> Result<bool> {
        let saved = std::mem::replace(&mut self.argument, argument);
        let result = constraint.accept(self);
        self.argument = saved;
        result
    }

    /// Record the outcome of a test that is a leaf of the reported tree
    fn leaf_outcome(&mut self, raw: bool, reported: impl FnOnce() -> Constraint) -> bool {
        let result = raw ^ self.builder.negated();
        if !result {
            let constraint = reported();
            tracing::trace!(%constraint, negated = self.builder.negated(), "leaf violated");
            self.builder.push(constraint);
        }
        result
    }
}

impl<S, A> ConstraintVisitor for ConstraintEvaluator<'_, S, A>
where
    S: ViolationSink,
    A: PropertyAccessStrategy + ?Sized,
{
    type Output = Result<bool>;

    fn visit_and(&mut self, children: &[Constraint]) -> Result<bool> {
        self.builder.push_and();
        let mut result = true;
        for child in children {
            if !child.accept(self)? {
                result = false;
                if !self.collect_all_errors {
                    break;
                }
            }
        }
        self.builder.pop(result)?;
        Ok(result)
    }

    fn visit_or(&mut self, children: &[Constraint]) -> Result<bool> {
        self.builder.push_or();
        let mut result = false;
        for child in children {
            if child.accept(self)? {
                result = true;
                break;
            }
        }
        self.builder.pop(result)?;
        Ok(result)
    }

    fn visit_not(&mut self, constraint: &Constraint) -> Result<bool> {
        self.builder.push_not();
        let result = constraint.accept(self)?;
        self.builder.pop(result)?;
        Ok(result)
    }

    fn visit_leaf(&mut self, predicate: &Arc<dyn Predicate>) -> Result<bool> {
        let raw = predicate.test(&self.argument);
        Ok(self.leaf_outcome(raw, || Constraint::Leaf(Arc::clone(predicate))))
    }

    fn visit_transformed(&mut self, transform: &Transform, constraint: &Constraint) -> Result<bool> {
        let transformed = transform.apply(&self.argument);
        self.with_argument(transformed, constraint)
    }

    fn visit_property(&mut self, constraint: &PropertyConstraint) -> Result<bool> {
        match constraint.kind() {
            PropertyConstraintKind::Value {
                property,
                constraint: inner,
            } => {
                let value = self.read(property);
                if self.builder.depth() == 0 {
                    return self.with_argument(value, inner);
                }
                // nested bindings keep their property in the reported tree
                self.builder.push_property(property.as_str());
                let result = self.with_argument(value, inner)?;
                self.builder.pop(result)?;
                Ok(result)
            }
            PropertyConstraintKind::Parameterized {
                property,
                relation,
                parameter,
            } => {
                let raw = relation.test(&self.read(property), parameter);
                Ok(self.leaf_outcome(raw, || Constraint::Property(constraint.clone())))
            }
            PropertyConstraintKind::Properties {
                property,
                relation,
                other_property,
            } => {
                let raw = relation.test(&self.read(property), &self.read(other_property));
                Ok(self.leaf_outcome(raw, || Constraint::Property(constraint.clone())))
            }
            PropertyConstraintKind::Compound(expression) => expression.accept(self),
        }
    }
}

#[derive(Debug, Default)]
struct ValueSink {
    violated: Option<Constraint>,
}

impl ViolationSink for ValueSink {
    fn constraint_violated(&mut self, constraint: Constraint) {
        self.violated = Some(constraint);
    }
}

/// Outcome of validating one value against one constraint
#[derive(Debug, Clone)]
pub struct ValueResults {
    rejected_value: Value,
    violated_constraint: Option<Constraint>,
}

impl ValueResults {
    /// The evaluated argument
    pub fn rejected_value(&self) -> &Value {
        &self.rejected_value
    }

    /// Pruned violating tree, `None` when the value passed
    pub fn violated_constraint(&self) -> Option<&Constraint> {
        self.violated_constraint.as_ref()
    }

    /// Number of violated leaves
    pub fn violated_count(&self) -> usize {
        self.violated_constraint
            .as_ref()
            .map_or(0, SummingVisitor::count)
    }

    pub fn is_satisfied(&self) -> bool {
        self.violated_constraint.is_none()
    }
}

/// Single-value entry point to constraint evaluation
///
/// Property constraints in the tree are resolved against the argument
/// itself, so a JSON object can be validated with property rules directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationResultsCollector {
    collect_all_errors: bool,
}

impl ValidationResultsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep evaluating `And` children after the first failure
    pub fn collect_all_errors(mut self, collect_all_errors: bool) -> Self {
        self.collect_all_errors = collect_all_errors;
        self
    }

    /// Evaluate `constraint` against `argument`
    ///
    /// # Errors
    ///
    /// Returns `BuilderProtocol` if evaluation leaves the builder in an
    /// inconsistent state.
    pub fn collect(&self, argument: &Value, constraint: &Constraint) -> Result<ValueResults> {
        let mut builder = ValidationResultsBuilder::new(ValueSink::default());
        ConstraintEvaluator::new(
            &mut builder,
            argument,
            argument.clone(),
            self.collect_all_errors,
        )
        .evaluate(constraint)?;

        Ok(ValueResults {
            rejected_value: argument.clone(),
            violated_constraint: builder.into_sink().violated,
        })
    }
}
