use std::sync::Arc;

use crate::constraint::{
    Constraint, ConstraintVisitor, Predicate, PropertyConstraint, PropertyConstraintKind, Transform,
};

/// Counts the leaves of a constraint tree
///
/// Atomic predicates and parameterized or two-property constraints count as
/// one each; `Not`, transforms and property bindings are transparent. With a
/// limit, counting stops once the limit is reached.
#[derive(Debug, Clone, Default)]
pub struct SummingVisitor {
    sum: usize,
    limit: Option<usize>,
}

impl SummingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            sum: 0,
            limit: Some(limit),
        }
    }

    /// Leaf count of `constraint`
    pub fn count(constraint: &Constraint) -> usize {
        let mut visitor = Self::new();
        constraint.accept(&mut visitor);
        visitor.sum
    }

    /// Accumulate the leaves of `constraint` into the running total
    pub fn sum(&mut self, constraint: &Constraint) -> usize {
        constraint.accept(self);
        self.sum
    }

    pub fn total(&self) -> usize {
        self.sum
    }

    fn reached_limit(&self) -> bool {
        self.limit.is_some_and(|limit| self.sum >= limit)
    }

    fn add_leaf(&mut self) {
        if !self.reached_limit() {
            self.sum += 1;
        }
    }

    fn visit_children(&mut self, children: &[Constraint]) {
        for child in children {
            if self.reached_limit() {
                break;
            }
            child.accept(self);
        }
    }
}

impl ConstraintVisitor for SummingVisitor {
    type Output = ();

    fn visit_and(&mut self, children: &[Constraint]) {
        self.visit_children(children);
    }

    fn visit_or(&mut self, children: &[Constraint]) {
        self.visit_children(children);
    }

    fn visit_not(&mut self, constraint: &Constraint) {
        constraint.accept(self);
    }

    fn visit_leaf(&mut self, _predicate: &Arc<dyn Predicate>) {
        self.add_leaf();
    }

    fn visit_transformed(&mut self, _transform: &Transform, constraint: &Constraint) {
        constraint.accept(self);
    }

    fn visit_property(&mut self, constraint: &PropertyConstraint) {
        match constraint.kind() {
            PropertyConstraintKind::Value {
                constraint: inner, ..
            } => inner.accept(self),
            PropertyConstraintKind::Parameterized { .. }
            | PropertyConstraintKind::Properties { .. } => self.add_leaf(),
            PropertyConstraintKind::Compound(expression) => expression.accept(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{and, max_length, min_length, not, or, required, Relation};

    #[test]
    fn test_counts_leaves_not_wrappers() {
        let c = and(vec![
            required(),
            not(min_length(2)),
            or(vec![max_length(3), required()]),
        ]);
        assert_eq!(SummingVisitor::count(&c), 4);
    }

    #[test]
    fn test_property_leaves_count() {
        let rule = PropertyConstraint::all(vec![
            PropertyConstraint::value("name", and(vec![required(), min_length(2)])),
            PropertyConstraint::parameterized("age", Relation::Gt, 0),
            PropertyConstraint::properties("start", Relation::Lt, "end"),
        ])
        .unwrap();
        assert_eq!(SummingVisitor::count(&Constraint::Property(rule)), 4);
    }

    #[test]
    fn test_limit_stops_counting() {
        let c = and(vec![required(), required(), required(), required()]);
        let mut visitor = SummingVisitor::with_limit(2);
        assert_eq!(visitor.sum(&c), 2);
        assert_eq!(visitor.total(), 2);
    }
}
