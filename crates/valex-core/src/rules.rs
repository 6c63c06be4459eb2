//! Rules and rule sources
//!
//! A [`Rules`] value is the ordered set of property constraints that apply to
//! one type. Constraints added for a property that already has one are folded
//! into a single `And` rule, so each property contributes at most one rule
//! (and therefore at most one message) per validation pass.

use std::collections::HashMap;

use crate::constraint::{required, Constraint, PropertyConstraint};

/// Ordered property constraints for one type
#[derive(Debug, Clone)]
pub struct Rules {
    type_name: String,
    constraints: Vec<PropertyConstraint>,
}

impl Rules {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            constraints: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Bind a value constraint to `property`
    pub fn add(&mut self, property: &str, constraint: Constraint) -> &mut Self {
        self.add_constraint(PropertyConstraint::value(property, constraint))
    }

    /// Shorthand for `add(property, required())`
    pub fn add_required(&mut self, property: &str) -> &mut Self {
        self.add(property, required())
    }

    /// Add a property constraint, merging with the property's existing rule
    ///
    /// The merged rule keeps the identity of the rule already registered.
    pub fn add_constraint(&mut self, constraint: PropertyConstraint) -> &mut Self {
        let position = self
            .constraints
            .iter()
            .position(|c| c.property_name() == constraint.property_name());
        match position {
            Some(index) => {
                let existing = self.constraints.remove(index);
                self.constraints.insert(index, existing.and_also(constraint));
            }
            None => self.constraints.push(constraint),
        }
        self
    }

    /// The rule registered for `property`, if any
    pub fn property_constraint(&self, property: &str) -> Option<&PropertyConstraint> {
        self.constraints
            .iter()
            .find(|c| c.property_name() == property)
    }

    pub fn constraints(&self) -> impl Iterator<Item = &PropertyConstraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// Lookup of the rules that apply to a type in an optional context
pub trait RulesSource {
    /// Rules for `type_name`, preferring those registered for `context_id`
    fn rules(&self, type_name: &str, context_id: Option<&str>) -> Option<Rules>;
}

/// Map-backed rules source
///
/// Rules registered for a context shadow the context-free rules of the same
/// type; lookups for an unknown context fall back to the context-free ones.
#[derive(Debug, Clone, Default)]
pub struct DefaultRulesSource {
    rules: HashMap<(String, Option<String>), Rules>,
}

impl DefaultRulesSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register context-free rules for `rules.type_name()`
    pub fn add_rules(&mut self, rules: Rules) -> &mut Self {
        self.rules
            .insert((rules.type_name().to_string(), None), rules);
        self
    }

    /// Register rules that only apply in `context_id`
    pub fn add_rules_for_context(&mut self, context_id: &str, rules: Rules) -> &mut Self {
        self.rules.insert(
            (rules.type_name().to_string(), Some(context_id.to_string())),
            rules,
        );
        self
    }
}

impl RulesSource for DefaultRulesSource {
    fn rules(&self, type_name: &str, context_id: Option<&str>) -> Option<Rules> {
        let contextual = context_id.and_then(|ctx| {
            self.rules
                .get(&(type_name.to_string(), Some(ctx.to_string())))
        });
        contextual
            .or_else(|| self.rules.get(&(type_name.to_string(), None)))
            .cloned()
    }
}
