//! Property access
//!
//! The engine never touches a concrete bean type. It reads live values
//! through [`PropertyAccessStrategy`], which a form layer can back with value
//! models, a JSON document, or anything else that can answer "what is the
//! current value of this property".

use serde_json::{Map, Value};

use crate::rules::Rules;

/// Read access to a bean's current property values
pub trait PropertyAccessStrategy {
    /// Current value of `property`, `None` if the bean has no such property
    fn property_value(&self, property: &str) -> Option<Value>;

    /// Whether `property` is backed by a live value
    fn has_property(&self, property: &str) -> bool {
        self.property_value(property).is_some()
    }
}

/// A bean the validator can check
pub trait Validatable: PropertyAccessStrategy {
    /// Runtime type used to look up rules
    fn type_name(&self) -> &str;

    /// Rules the object carries itself; these take precedence over a rules source
    fn constraints(&self) -> Option<Rules> {
        None
    }
}

/// Dotted paths (`address.city`) walk nested objects
impl PropertyAccessStrategy for Value {
    fn property_value(&self, property: &str) -> Option<Value> {
        if property.contains('.') {
            let pointer = format!("/{}", property.replace('.', "/"));
            self.pointer(&pointer).cloned()
        } else {
            self.get(property).cloned()
        }
    }
}

impl PropertyAccessStrategy for Map<String, Value> {
    fn property_value(&self, property: &str) -> Option<Value> {
        match property.split_once('.') {
            Some((head, rest)) => self.get(head)?.property_value(rest),
            None => self.get(property).cloned(),
        }
    }
}

/// Map-backed bean holding live form values as JSON
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBag {
    type_name: String,
    values: Map<String, Value>,
}

impl PropertyBag {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: Map::new(),
        }
    }

    /// Build from a JSON object; non-object values yield an empty bag
    pub fn from_json(type_name: impl Into<String>, value: Value) -> Self {
        let values = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            type_name: type_name.into(),
            values,
        }
    }

    pub fn with(mut self, property: &str, value: impl Into<Value>) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: &str, value: impl Into<Value>) {
        self.values.insert(property.to_string(), value.into());
    }

    pub fn remove(&mut self, property: &str) -> Option<Value> {
        self.values.remove(property)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl PropertyAccessStrategy for PropertyBag {
    fn property_value(&self, property: &str) -> Option<Value> {
        self.values.property_value(property)
    }
}

impl Validatable for PropertyBag {
    fn type_name(&self) -> &str {
        &self.type_name
    }
}
