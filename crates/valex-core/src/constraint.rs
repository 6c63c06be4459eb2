//! Constraint tree
//!
//! An immutable boolean expression tree over dynamic property values
//! (`serde_json::Value`). Atomic tests implement [`Predicate`]; compound
//! structure (`And`, `Or`, `Not`), value transformation and property binding
//! are variants of the closed [`Constraint`] sum type.
//!
//! Evaluation and rendering are written as [`ConstraintVisitor`]s and
//! dispatched through [`Constraint::accept`].

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use valex_core_types::ConstraintId;

use crate::errors::{Result, ValexError};

/// An atomic test over a single value
pub trait Predicate: fmt::Debug + Send + Sync {
    /// Test the value. Must be a pure function of its argument.
    fn test(&self, value: &Value) -> bool;

    /// Catalog code used to render this predicate in messages
    fn message_code(&self) -> &str;

    /// Positional arguments substituted into the catalog template
    fn message_args(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Double-dispatch interface over constraint variants
pub trait ConstraintVisitor {
    type Output;

    fn visit_and(&mut self, children: &[Constraint]) -> Self::Output;
    fn visit_or(&mut self, children: &[Constraint]) -> Self::Output;
    fn visit_not(&mut self, constraint: &Constraint) -> Self::Output;
    fn visit_leaf(&mut self, predicate: &Arc<dyn Predicate>) -> Self::Output;
    fn visit_transformed(&mut self, transform: &Transform, constraint: &Constraint)
        -> Self::Output;
    fn visit_property(&mut self, constraint: &PropertyConstraint) -> Self::Output;
}

/// A node in a constraint tree
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Atomic predicate over the current argument
    Leaf(Arc<dyn Predicate>),
    /// Every child must hold
    And(Vec<Constraint>),
    /// At least one child must hold
    Or(Vec<Constraint>),
    /// Negation of exactly one child
    Not(Box<Constraint>),
    /// Apply a function to the argument, then test the result
    Transformed {
        transform: Transform,
        constraint: Box<Constraint>,
    },
    /// Constraint bound to a named bean property
    Property(PropertyConstraint),
}

impl Constraint {
    /// Dispatch to the visitor method for this variant
    pub fn accept<V: ConstraintVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Constraint::Leaf(predicate) => visitor.visit_leaf(predicate),
            Constraint::And(children) => visitor.visit_and(children),
            Constraint::Or(children) => visitor.visit_or(children),
            Constraint::Not(inner) => visitor.visit_not(inner),
            Constraint::Transformed {
                transform,
                constraint,
            } => visitor.visit_transformed(transform, constraint),
            Constraint::Property(property) => visitor.visit_property(property),
        }
    }

    /// Wrap a custom predicate
    pub fn leaf(predicate: impl Predicate + 'static) -> Self {
        Constraint::Leaf(Arc::new(predicate))
    }

    /// True for `And` and `Or` nodes
    pub fn is_compound(&self) -> bool {
        matches!(self, Constraint::And(_) | Constraint::Or(_))
    }

    fn contains_property(&self) -> bool {
        match self {
            Constraint::Property(_) => true,
            Constraint::And(children) | Constraint::Or(children) => {
                children.iter().any(Constraint::contains_property)
            }
            Constraint::Not(inner) => inner.contains_property(),
            Constraint::Transformed { constraint, .. } => constraint.contains_property(),
            Constraint::Leaf(_) => false,
        }
    }

    /// Only compound/negation structure with property constraints at the leaves
    fn is_property_expression(&self) -> bool {
        match self {
            Constraint::Property(_) => true,
            Constraint::And(children) | Constraint::Or(children) => {
                !children.is_empty() && children.iter().all(Constraint::is_property_expression)
            }
            Constraint::Not(inner) => inner.is_property_expression(),
            Constraint::Leaf(_) | Constraint::Transformed { .. } => false,
        }
    }

    /// First property constraint in evaluation order
    pub(crate) fn first_property(&self) -> Option<&PropertyConstraint> {
        match self {
            Constraint::Property(property) => Some(property),
            Constraint::And(children) | Constraint::Or(children) => {
                children.iter().find_map(Constraint::first_property)
            }
            Constraint::Not(inner) => inner.first_property(),
            Constraint::Transformed { constraint, .. } => constraint.first_property(),
            Constraint::Leaf(_) => None,
        }
    }

    fn any_property(&self, f: &dyn Fn(&PropertyConstraint) -> bool) -> bool {
        match self {
            Constraint::Property(property) => f(property),
            Constraint::And(children) | Constraint::Or(children) => {
                children.iter().any(|c| c.any_property(f))
            }
            Constraint::Not(inner) => inner.any_property(f),
            Constraint::Transformed { constraint, .. } => constraint.any_property(f),
            Constraint::Leaf(_) => false,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, children: &[Constraint], op: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")
        }

        match self {
            Constraint::Leaf(predicate) => {
                let args = predicate.message_args();
                if args.is_empty() {
                    write!(f, "{}", predicate.message_code())
                } else {
                    write!(f, "{}({})", predicate.message_code(), args.join(", "))
                }
            }
            Constraint::And(children) => join(f, children, "and"),
            Constraint::Or(children) => join(f, children, "or"),
            Constraint::Not(inner) => write!(f, "not {}", inner),
            Constraint::Transformed {
                transform,
                constraint,
            } => write!(f, "{} {}", transform.name(), constraint),
            Constraint::Property(property) => write!(f, "{}", property),
        }
    }
}

// ===== Relations =====

/// Binary comparison between two values
///
/// Numbers compare numerically (as `f64`), strings lexicographically.
/// Ordering relations between any other pair of values are false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Relation {
    pub fn test(&self, left: &Value, right: &Value) -> bool {
        match self {
            Relation::Eq => values_equal(left, right),
            Relation::NotEq => !values_equal(left, right),
            Relation::Lt => compare_values(left, right) == Some(Ordering::Less),
            Relation::Lte => matches!(
                compare_values(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Relation::Gt => compare_values(left, right) == Some(Ordering::Greater),
            Relation::Gte => matches!(
                compare_values(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }

    /// Catalog code for this relation
    pub fn code(&self) -> &'static str {
        match self {
            Relation::Eq => "eq",
            Relation::NotEq => "ne",
            Relation::Lt => "lt",
            Relation::Lte => "lte",
            Relation::Gt => "gt",
            Relation::Gte => "gte",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Eq => "==",
            Relation::NotEq => "!=",
            Relation::Lt => "<",
            Relation::Lte => "<=",
            Relation::Gt => ">",
            Relation::Gte => ">=",
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// Length of a value for length constraints
///
/// Characters for strings, elements for arrays and objects, zero for null,
/// and the rendered width for anything else.
pub fn value_len(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => other.to_string().chars().count(),
    }
}

/// Render a value for messages: strings unquoted, null as empty text
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ===== Built-in predicates =====

/// The value must be present: non-null, non-blank text, non-empty collection
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl Predicate for Required {
    fn test(&self, value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Bool(_) | Value::Number(_) => true,
        }
    }

    fn message_code(&self) -> &str {
        "required"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MinLength(pub usize);

impl Predicate for MinLength {
    fn test(&self, value: &Value) -> bool {
        value_len(value) >= self.0
    }

    fn message_code(&self) -> &str {
        "minLength"
    }

    fn message_args(&self) -> Vec<String> {
        vec![self.0.to_string()]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MaxLength(pub usize);

impl Predicate for MaxLength {
    fn test(&self, value: &Value) -> bool {
        value_len(value) <= self.0
    }

    fn message_code(&self) -> &str {
        "maxLength"
    }

    fn message_args(&self) -> Vec<String> {
        vec![self.0.to_string()]
    }
}

/// Inclusive numeric range
#[derive(Debug, Clone, Copy)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Predicate for Range {
    fn test(&self, value: &Value) -> bool {
        value
            .as_f64()
            .is_some_and(|v| v >= self.min && v <= self.max)
    }

    fn message_code(&self) -> &str {
        "range"
    }

    fn message_args(&self) -> Vec<String> {
        vec![self.min.to_string(), self.max.to_string()]
    }
}

/// Text must match a regular expression; null never matches
#[derive(Debug, Clone)]
pub struct Matches(pub Regex);

impl Predicate for Matches {
    fn test(&self, value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::String(s) => self.0.is_match(s),
            other => self.0.is_match(&other.to_string()),
        }
    }

    fn message_code(&self) -> &str {
        "matches"
    }

    fn message_args(&self) -> Vec<String> {
        vec![self.0.as_str().to_string()]
    }
}

/// Value must be one of a fixed group
#[derive(Debug, Clone)]
pub struct InGroup(pub Vec<Value>);

impl Predicate for InGroup {
    fn test(&self, value: &Value) -> bool {
        self.0.iter().any(|member| values_equal(member, value))
    }

    fn message_code(&self) -> &str {
        "inGroup"
    }

    fn message_args(&self) -> Vec<String> {
        let members: Vec<String> = self.0.iter().map(display_value).collect();
        vec![members.join(", ")]
    }
}

/// Compare the value against a fixed parameter
#[derive(Debug, Clone)]
pub struct Compare {
    pub relation: Relation,
    pub parameter: Value,
}

impl Predicate for Compare {
    fn test(&self, value: &Value) -> bool {
        self.relation.test(value, &self.parameter)
    }

    fn message_code(&self) -> &str {
        self.relation.code()
    }

    fn message_args(&self) -> Vec<String> {
        vec![display_value(&self.parameter)]
    }
}

type TestFn = dyn Fn(&Value) -> bool + Send + Sync;

/// Closure-backed predicate with its own message code
#[derive(Clone)]
pub struct FnPredicate {
    code: String,
    args: Vec<String>,
    test: Arc<TestFn>,
}

impl FnPredicate {
    pub fn new(
        code: impl Into<String>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            code: code.into(),
            args: Vec::new(),
            test: Arc::new(test),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl fmt::Debug for FnPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPredicate")
            .field("code", &self.code)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl Predicate for FnPredicate {
    fn test(&self, value: &Value) -> bool {
        (self.test)(value)
    }

    fn message_code(&self) -> &str {
        &self.code
    }

    fn message_args(&self) -> Vec<String> {
        self.args.clone()
    }
}

// ===== Transforms =====

type TransformFn = dyn Fn(&Value) -> Value + Send + Sync;

/// Named value-transforming function used by `Constraint::Transformed`
#[derive(Clone)]
pub struct Transform {
    name: String,
    apply: Arc<TransformFn>,
}

impl Transform {
    pub fn new(
        name: impl Into<String>,
        apply: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    /// Length of the value as a number (see [`value_len`])
    pub fn length() -> Self {
        Self::new("length", |v| Value::from(value_len(v)))
    }

    /// Text with surrounding whitespace removed; other values unchanged
    pub fn trimmed() -> Self {
        Self::new("trimmed", |v| match v {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other.clone(),
        })
    }

    /// Name, doubling as the catalog code
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: &Value) -> Value {
        (self.apply)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ===== Property constraints =====

/// The shapes a property-bound constraint can take
#[derive(Debug, Clone)]
pub enum PropertyConstraintKind {
    /// Test the property's value with a value constraint
    Value {
        property: String,
        constraint: Box<Constraint>,
    },
    /// Compare the property's value with a fixed parameter
    Parameterized {
        property: String,
        relation: Relation,
        parameter: Value,
    },
    /// Compare two properties of the same bean
    Properties {
        property: String,
        relation: Relation,
        other_property: String,
    },
    /// Compound/negated expression over other property constraints
    Compound(Box<Constraint>),
}

/// A constraint bound to a named bean property, with instance identity
///
/// Clones share the same [`ConstraintId`].
#[derive(Debug, Clone)]
pub struct PropertyConstraint {
    id: ConstraintId,
    kind: PropertyConstraintKind,
}

impl PropertyConstraint {
    fn from_kind(kind: PropertyConstraintKind) -> Self {
        Self {
            id: ConstraintId::new(),
            kind,
        }
    }

    /// Bind a value constraint to a property
    pub fn value(property: impl Into<String>, constraint: Constraint) -> Self {
        Self::from_kind(PropertyConstraintKind::Value {
            property: property.into(),
            constraint: Box::new(constraint),
        })
    }

    /// Compare a property against a fixed parameter
    pub fn parameterized(
        property: impl Into<String>,
        relation: Relation,
        parameter: impl Into<Value>,
    ) -> Self {
        Self::from_kind(PropertyConstraintKind::Parameterized {
            property: property.into(),
            relation,
            parameter: parameter.into(),
        })
    }

    /// Compare a property against another property
    pub fn properties(
        property: impl Into<String>,
        relation: Relation,
        other_property: impl Into<String>,
    ) -> Self {
        Self::from_kind(PropertyConstraintKind::Properties {
            property: property.into(),
            relation,
            other_property: other_property.into(),
        })
    }

    /// Wrap an `And`/`Or`/`Not` expression whose leaves are all property constraints
    ///
    /// # Errors
    ///
    /// Returns `InvalidConstraint` if the expression has a bare value
    /// constraint or no property constraint at all.
    pub fn compound(expression: Constraint) -> Result<Self> {
        if !expression.is_property_expression() || !expression.contains_property() {
            return Err(ValexError::InvalidConstraint {
                reason: format!(
                    "compound property constraint needs property constraints at every leaf: {}",
                    expression
                ),
            });
        }
        Ok(Self::from_kind(PropertyConstraintKind::Compound(Box::new(
            expression,
        ))))
    }

    /// `And` over property constraints
    ///
    /// # Errors
    ///
    /// Returns `InvalidConstraint` if `constraints` is empty.
    pub fn all(constraints: Vec<PropertyConstraint>) -> Result<Self> {
        Self::compound(Constraint::And(
            constraints.into_iter().map(Constraint::Property).collect(),
        ))
    }

    /// `Or` over property constraints
    ///
    /// # Errors
    ///
    /// Returns `InvalidConstraint` if `constraints` is empty.
    pub fn any(constraints: Vec<PropertyConstraint>) -> Result<Self> {
        Self::compound(Constraint::Or(
            constraints.into_iter().map(Constraint::Property).collect(),
        ))
    }

    pub fn id(&self) -> ConstraintId {
        self.id
    }

    pub fn kind(&self) -> &PropertyConstraintKind {
        &self.kind
    }

    /// Primary property; for compounds, the first property constraint's
    pub fn property_name(&self) -> &str {
        match &self.kind {
            PropertyConstraintKind::Value { property, .. }
            | PropertyConstraintKind::Parameterized { property, .. }
            | PropertyConstraintKind::Properties { property, .. } => property,
            PropertyConstraintKind::Compound(expression) => expression
                .first_property()
                .map(PropertyConstraint::property_name)
                .unwrap_or_default(),
        }
    }

    /// Whether a change to `property` can change this constraint's outcome
    pub fn is_dependent_on(&self, property: &str) -> bool {
        match &self.kind {
            PropertyConstraintKind::Value { property: p, .. }
            | PropertyConstraintKind::Parameterized { property: p, .. } => p == property,
            PropertyConstraintKind::Properties {
                property: p,
                other_property,
                ..
            } => p == property || other_property == property,
            PropertyConstraintKind::Compound(expression) => {
                expression.any_property(&|c| c.is_dependent_on(property))
            }
        }
    }

    /// Same rule instance (shared identity), not structural equality
    pub fn same_instance(&self, other: &PropertyConstraint) -> bool {
        self.id == other.id
    }

    /// Wrap this property constraint's expression with more property constraints
    pub(crate) fn and_also(self, other: PropertyConstraint) -> Self {
        let id = self.id;
        let kind = match self.kind {
            PropertyConstraintKind::Compound(expression) => match *expression {
                Constraint::And(mut children) => {
                    children.push(Constraint::Property(other));
                    PropertyConstraintKind::Compound(Box::new(Constraint::And(children)))
                }
                expression => PropertyConstraintKind::Compound(Box::new(Constraint::And(vec![
                    expression,
                    Constraint::Property(other),
                ]))),
            },
            kind => {
                let first = PropertyConstraint {
                    id: ConstraintId::new(),
                    kind,
                };
                PropertyConstraintKind::Compound(Box::new(Constraint::And(vec![
                    Constraint::Property(first),
                    Constraint::Property(other),
                ])))
            }
        };
        Self { id, kind }
    }
}

impl fmt::Display for PropertyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PropertyConstraintKind::Value {
                property,
                constraint,
            } => write!(f, "{}: {}", property, constraint),
            PropertyConstraintKind::Parameterized {
                property,
                relation,
                parameter,
            } => write!(f, "{} {} {}", property, relation.symbol(), parameter),
            PropertyConstraintKind::Properties {
                property,
                relation,
                other_property,
            } => write!(f, "{} {} {}", property, relation.symbol(), other_property),
            PropertyConstraintKind::Compound(expression) => write!(f, "{}", expression),
        }
    }
}

// ===== Convenience constructors =====

pub fn required() -> Constraint {
    Constraint::leaf(Required)
}

pub fn min_length(length: usize) -> Constraint {
    Constraint::leaf(MinLength(length))
}

pub fn max_length(length: usize) -> Constraint {
    Constraint::leaf(MaxLength(length))
}

pub fn range(min: f64, max: f64) -> Constraint {
    Constraint::leaf(Range { min, max })
}

/// Regular-expression constraint
///
/// # Errors
///
/// Returns `InvalidConstraint` if the pattern does not compile.
pub fn matches(pattern: &str) -> Result<Constraint> {
    let regex = Regex::new(pattern).map_err(|e| ValexError::InvalidConstraint {
        reason: format!("invalid pattern {:?}: {}", pattern, e),
    })?;
    Ok(Constraint::leaf(Matches(regex)))
}

pub fn in_group(members: Vec<Value>) -> Constraint {
    Constraint::leaf(InGroup(members))
}

pub fn compare(relation: Relation, parameter: impl Into<Value>) -> Constraint {
    Constraint::leaf(Compare {
        relation,
        parameter: parameter.into(),
    })
}

pub fn and(children: Vec<Constraint>) -> Constraint {
    Constraint::And(children)
}

pub fn or(children: Vec<Constraint>) -> Constraint {
    Constraint::Or(children)
}

pub fn not(constraint: Constraint) -> Constraint {
    Constraint::Not(Box::new(constraint))
}

pub fn transformed(transform: Transform, constraint: Constraint) -> Constraint {
    Constraint::Transformed {
        transform,
        constraint: Box::new(constraint),
    }
}
