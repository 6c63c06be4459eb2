//! Message translation
//!
//! A violated tree renders as `<Display Name> <part> <part> ... .`, named
//! after the first property the tree binds, or the caller's property when it
//! binds none. Each leaf contributes its catalog template, compounds join
//! their children with the `and`/`or` part, and a negation puts `not` before
//! its target.
//!
//! Templates use `{0}`..`{n}` for the predicate's arguments and `{value}` for
//! the rejected value.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::constraint::{
    display_value, Constraint, ConstraintVisitor, Predicate, PropertyConstraint,
    PropertyConstraintKind, Transform,
};
use crate::format::InvalidFormat;
use crate::reporting::bean::PropertyResults;

/// Turns a violated constraint into user-facing text
pub trait MessageTranslator {
    fn translate(&self, constraint: &Constraint, rejected_value: &Value, property: Option<&str>)
        -> String;

    /// Message for a property's collected violation
    fn message_for(&self, results: &PropertyResults) -> String {
        self.translate(
            results.violated_constraint(),
            results.rejected_value(),
            Some(results.property_name()),
        )
    }
}

impl<F> MessageTranslator for F
where
    F: Fn(&Constraint, &Value, Option<&str>) -> String,
{
    fn translate(
        &self,
        constraint: &Constraint,
        rejected_value: &Value,
        property: Option<&str>,
    ) -> String {
        self(constraint, rejected_value, property)
    }
}

/// Source of message templates
pub trait MessageCatalog {
    /// Rendered text for `code`, `None` if the catalog has no template
    fn message(&self, code: &str, args: &[String], rejected_value: &Value) -> Option<String>;
}

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("required", "is required"),
    ("and", "and"),
    ("or", "or"),
    ("not", "not"),
    ("minLength", "must be at least {0} characters"),
    ("maxLength", "must not exceed {0} characters"),
    ("range", "must be in the range {0} to {1}"),
    ("matches", "must match the pattern {0}"),
    ("inGroup", "must be one of {0}"),
    ("eq", "must equal {0}"),
    ("ne", "must not equal {0}"),
    ("lt", "must be less than {0}"),
    ("lte", "must be less than or equal to {0}"),
    ("gt", "must be greater than {0}"),
    ("gte", "must be greater than or equal to {0}"),
    ("length", "length"),
    ("trimmed", ""),
    ("typeMismatch", "must be in the format {0}"),
];

/// In-memory English catalog
#[derive(Debug, Clone)]
pub struct DefaultMessageCatalog {
    templates: HashMap<String, String>,
}

impl Default for DefaultMessageCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultMessageCatalog {
    /// Catalog preloaded with the built-in templates
    pub fn new() -> Self {
        let templates = DEFAULT_TEMPLATES
            .iter()
            .map(|(code, template)| (code.to_string(), template.to_string()))
            .collect();
        Self { templates }
    }

    /// Catalog with no templates
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Add or override the template for `code`
    pub fn with_message(mut self, code: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(code.into(), template.into());
        self
    }
}

impl MessageCatalog for DefaultMessageCatalog {
    fn message(&self, code: &str, args: &[String], rejected_value: &Value) -> Option<String> {
        let template = self.templates.get(code)?;
        Some(render(template, args, rejected_value))
    }
}

/// Fill `{value}` and `{0}`..`{n}` in one pass; substituted text is never rescanned
fn render(template: &str, args: &[String], rejected_value: &Value) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = after.find('}').and_then(|close| {
            let key = &after[..close];
            let text = if key == "value" {
                Some(display_value(rejected_value))
            } else {
                key.parse::<usize>().ok().and_then(|i| args.get(i).cloned())
            };
            text.map(|text| (text, close))
        });
        match placeholder {
            Some((text, close)) => {
                rendered.push_str(&text);
                rest = &after[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

/// Maps a raw property name to its display name
pub trait PropertyNameResolver {
    fn display_name(&self, property: &str) -> String;
}

/// Humanises property names: `userName` and `user_name` become `User Name`
#[derive(Debug, Clone, Default)]
pub struct DefaultPropertyNameResolver {
    overrides: HashMap<String, String>,
}

impl DefaultPropertyNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, property: impl Into<String>, display: impl Into<String>) -> Self {
        self.overrides.insert(property.into(), display.into());
        self
    }
}

impl PropertyNameResolver for DefaultPropertyNameResolver {
    fn display_name(&self, property: &str) -> String {
        if let Some(name) = self.overrides.get(property) {
            return name.clone();
        }
        humanize(property)
    }
}

fn humanize(property: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for ch in property.chars() {
        if matches!(ch, '_' | '.' | '-' | ' ') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if ch.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Catalog-backed translator
pub struct DefaultMessageTranslator {
    catalog: Box<dyn MessageCatalog>,
    resolver: Box<dyn PropertyNameResolver>,
}

impl Default for DefaultMessageTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultMessageTranslator {
    pub fn new() -> Self {
        Self {
            catalog: Box::new(DefaultMessageCatalog::new()),
            resolver: Box::new(DefaultPropertyNameResolver::new()),
        }
    }

    pub fn with_catalog(mut self, catalog: impl MessageCatalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub fn with_resolver(mut self, resolver: impl PropertyNameResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Message for text a formatter could not parse
    pub fn format_error_message(&self, property: &str, error: &InvalidFormat) -> String {
        let rejected = Value::String(error.input.clone());
        let args = [error.expected.clone()];
        let mut parts = vec![self.resolver.display_name(property)];
        parts.push(
            self.catalog
                .message("typeMismatch", &args, &rejected)
                .unwrap_or_else(|| fallback("typeMismatch", &args)),
        );
        finish(parts)
    }
}

impl MessageTranslator for DefaultMessageTranslator {
    fn translate(
        &self,
        constraint: &Constraint,
        rejected_value: &Value,
        property: Option<&str>,
    ) -> String {
        let subject = constraint
            .first_property()
            .map(PropertyConstraint::property_name)
            .or(property);
        let mut parts = MessageParts {
            catalog: self.catalog.as_ref(),
            resolver: self.resolver.as_ref(),
            rejected_value,
            subject,
            parts: Vec::new(),
        };
        if let Some(subject) = subject {
            parts.parts.push(self.resolver.display_name(subject));
        }
        constraint.accept(&mut parts);
        finish(parts.parts)
    }
}

fn fallback(code: &str, args: &[String]) -> String {
    if args.is_empty() {
        code.to_string()
    } else {
        format!("{} {}", code, args.join(", "))
    }
}

fn finish(parts: Vec<String>) -> String {
    let parts: Vec<String> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    format!("{}.", parts.join(" "))
}

struct MessageParts<'a> {
    catalog: &'a dyn MessageCatalog,
    resolver: &'a dyn PropertyNameResolver,
    rejected_value: &'a Value,
    subject: Option<&'a str>,
    parts: Vec<String>,
}

impl MessageParts<'_> {
    fn add(&mut self, code: &str, args: &[String]) {
        let text = self
            .catalog
            .message(code, args, self.rejected_value)
            .unwrap_or_else(|| fallback(code, args));
        self.parts.push(text);
    }

    fn join(&mut self, children: &[Constraint], code: &str) {
        for (index, child) in children.iter().enumerate() {
            if index > 0 {
                self.add(code, &[]);
            }
            child.accept(self);
        }
    }

    /// Name a property that differs from the message's subject
    fn name_property(&mut self, property: &str) {
        if self.subject != Some(property) {
            self.parts.push(self.resolver.display_name(property));
        }
    }
}

impl ConstraintVisitor for MessageParts<'_> {
    type Output = ();

    fn visit_and(&mut self, children: &[Constraint]) {
        self.join(children, "and");
    }

    fn visit_or(&mut self, children: &[Constraint]) {
        self.join(children, "or");
    }

    fn visit_not(&mut self, constraint: &Constraint) {
        self.add("not", &[]);
        constraint.accept(self);
    }

    fn visit_leaf(&mut self, predicate: &Arc<dyn Predicate>) {
        self.add(predicate.message_code(), &predicate.message_args());
    }

    fn visit_transformed(&mut self, transform: &Transform, constraint: &Constraint) {
        self.add(transform.name(), &[]);
        constraint.accept(self);
    }

    fn visit_property(&mut self, constraint: &PropertyConstraint) {
        match constraint.kind() {
            PropertyConstraintKind::Value {
                property,
                constraint: inner,
            } => {
                self.name_property(property);
                inner.accept(self);
            }
            PropertyConstraintKind::Parameterized {
                property,
                relation,
                parameter,
            } => {
                self.name_property(property);
                self.add(relation.code(), &[display_value(parameter)]);
            }
            PropertyConstraintKind::Properties {
                property,
                relation,
                other_property,
            } => {
                self.name_property(property);
                let other = self.resolver.display_name(other_property);
                self.add(relation.code(), &[other]);
            }
            PropertyConstraintKind::Compound(expression) => expression.accept(self),
        }
    }
}
