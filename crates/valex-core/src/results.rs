//! Validation results container
//!
//! [`DefaultValidationResults`] holds a set of messages and memoizes the
//! subsets callers ask for (by severity or by property). Every structural
//! change drops the whole memo; subsets are rebuilt on the next query.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use valex_core_types::{Severity, ValidationMessage};

/// Read contract over a set of validation messages
pub trait ValidationResults {
    fn messages(&self) -> BTreeSet<ValidationMessage>;

    fn messages_for_severity(&self, severity: Severity) -> BTreeSet<ValidationMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.severity() == severity)
            .collect()
    }

    fn messages_for_property(&self, property: &str) -> BTreeSet<ValidationMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.property() == Some(property))
            .collect()
    }

    fn message_count(&self) -> usize {
        self.messages().len()
    }

    fn message_count_for_severity(&self, severity: Severity) -> usize {
        self.messages_for_severity(severity).len()
    }

    fn message_count_for_property(&self, property: &str) -> usize {
        self.messages_for_property(property).len()
    }

    fn has_errors(&self) -> bool {
        self.message_count_for_severity(Severity::Error) > 0
    }

    fn has_warnings(&self) -> bool {
        self.message_count_for_severity(Severity::Warning) > 0
    }

    fn has_info(&self) -> bool {
        self.message_count_for_severity(Severity::Info) > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SubsetKey {
    Severity(Severity),
    Property(String),
}

impl SubsetKey {
    fn matches(&self, message: &ValidationMessage) -> bool {
        match self {
            SubsetKey::Severity(severity) => message.severity() == *severity,
            SubsetKey::Property(property) => message.property() == Some(property.as_str()),
        }
    }
}

/// Set-backed results with a memoized subset cache
#[derive(Debug, Default)]
pub struct DefaultValidationResults {
    messages: BTreeSet<ValidationMessage>,
    cache: RefCell<HashMap<SubsetKey, Rc<BTreeSet<ValidationMessage>>>>,
}

impl Clone for DefaultValidationResults {
    fn clone(&self) -> Self {
        Self {
            messages: self.messages.clone(),
            cache: RefCell::default(),
        }
    }
}

impl PartialEq for DefaultValidationResults {
    fn eq(&self, other: &Self) -> bool {
        self.messages == other.messages
    }
}

impl Eq for DefaultValidationResults {}

impl FromIterator<ValidationMessage> for DefaultValidationResults {
    fn from_iter<I: IntoIterator<Item = ValidationMessage>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
            cache: RefCell::default(),
        }
    }
}

impl DefaultValidationResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if an equal message was already present
    pub fn add_message(&mut self, message: ValidationMessage) -> bool {
        let added = self.messages.insert(message);
        if added {
            self.invalidate_cache();
        }
        added
    }

    pub fn add_message_for(
        &mut self,
        property: &str,
        severity: Severity,
        text: impl Into<String>,
    ) -> bool {
        self.add_message(ValidationMessage::new(property, severity, text))
    }

    pub fn add_all_messages(&mut self, messages: impl IntoIterator<Item = ValidationMessage>) {
        let before = self.messages.len();
        self.messages.extend(messages);
        if self.messages.len() != before {
            self.invalidate_cache();
        }
    }

    /// Copy every message of `other` into this container
    pub fn add_all_from(&mut self, other: &dyn ValidationResults) {
        self.add_all_messages(other.messages());
    }

    pub fn remove_message(&mut self, message: &ValidationMessage) -> bool {
        let removed = self.messages.remove(message);
        if removed {
            self.invalidate_cache();
        }
        removed
    }

    /// Swap `old` (if present) for `new`; returns whether the set changed
    pub fn replace_message(&mut self, old: Option<&ValidationMessage>, new: ValidationMessage) -> bool {
        let removed = old.is_some_and(|old| self.messages.remove(old));
        let added = self.messages.insert(new);
        if removed || added {
            self.invalidate_cache();
        }
        removed || added
    }

    pub fn clear_messages(&mut self) {
        if !self.messages.is_empty() {
            self.messages.clear();
            self.invalidate_cache();
        }
    }

    /// Drop every message for `property`; returns how many were removed
    pub fn clear_messages_for(&mut self, property: &str) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| m.property() != Some(property));
        let removed = before - self.messages.len();
        if removed > 0 {
            self.invalidate_cache();
        }
        removed
    }

    pub fn contains(&self, message: &ValidationMessage) -> bool {
        self.messages.contains(message)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.messages.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Properties that have at least one message
    pub fn properties(&self) -> BTreeSet<String> {
        self.messages
            .iter()
            .filter_map(|m| m.property().map(str::to_string))
            .collect()
    }

    pub fn invalidate_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    #[cfg(test)]
    pub(crate) fn cached_subsets(&self) -> usize {
        self.cache.borrow().len()
    }

    fn subset(&self, key: SubsetKey) -> Rc<BTreeSet<ValidationMessage>> {
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Rc::clone(cached);
        }
        let subset: Rc<BTreeSet<ValidationMessage>> = Rc::new(
            self.messages
                .iter()
                .filter(|m| key.matches(m))
                .cloned()
                .collect(),
        );
        self.cache.borrow_mut().insert(key, Rc::clone(&subset));
        subset
    }
}

impl ValidationResults for DefaultValidationResults {
    fn messages(&self) -> BTreeSet<ValidationMessage> {
        self.messages.clone()
    }

    fn messages_for_severity(&self, severity: Severity) -> BTreeSet<ValidationMessage> {
        self.subset(SubsetKey::Severity(severity)).as_ref().clone()
    }

    fn messages_for_property(&self, property: &str) -> BTreeSet<ValidationMessage> {
        self.subset(SubsetKey::Property(property.to_string()))
            .as_ref()
            .clone()
    }

    fn message_count(&self) -> usize {
        self.messages.len()
    }

    fn message_count_for_severity(&self, severity: Severity) -> usize {
        self.subset(SubsetKey::Severity(severity)).len()
    }

    fn message_count_for_property(&self, property: &str) -> usize {
        self.subset(SubsetKey::Property(property.to_string())).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(property: &str, text: &str) -> ValidationMessage {
        ValidationMessage::new(property, Severity::Error, text)
    }

    #[test]
    fn test_set_semantics() {
        let mut results = DefaultValidationResults::new();
        assert!(results.add_message(error("name", "is required")));
        assert!(!results.add_message(error("name", "is required")));
        assert_eq!(results.message_count(), 1);
    }

    #[test]
    fn test_counts_and_flags() {
        let results: DefaultValidationResults = vec![
            error("name", "is required"),
            ValidationMessage::new("age", Severity::Warning, "looks young"),
            ValidationMessage::global(Severity::Info, "draft saved"),
        ]
        .into_iter()
        .collect();

        assert_eq!(results.message_count_for_severity(Severity::Error), 1);
        assert_eq!(results.message_count_for_property("age"), 1);
        assert_eq!(results.message_count_for_property("missing"), 0);
        assert!(results.has_errors());
        assert!(results.has_warnings());
        assert!(results.has_info());
    }

    #[test]
    fn test_cache_is_invalidated_on_change() {
        let mut results = DefaultValidationResults::new();
        results.add_message(error("name", "is required"));
        assert_eq!(results.message_count_for_property("name"), 1);
        assert_eq!(results.cached_subsets(), 1);

        results.add_message(error("name", "is too short"));
        assert_eq!(results.cached_subsets(), 0);
        assert_eq!(results.messages_for_property("name").len(), 2);
        assert_eq!(results.messages_for_severity(Severity::Error).len(), 2);
    }

    #[test]
    fn test_clear_for_property() {
        let mut results = DefaultValidationResults::new();
        results.add_message(error("name", "a"));
        results.add_message(error("name", "b"));
        results.add_message(error("age", "c"));
        assert_eq!(results.clear_messages_for("name"), 2);
        assert_eq!(results.message_count(), 1);
        assert_eq!(results.message_count_for_property("name"), 0);
    }

    #[test]
    fn test_replace_message() {
        let mut results = DefaultValidationResults::new();
        let old = error("name", "a");
        results.add_message(old.clone());
        assert!(results.replace_message(Some(&old), error("name", "b")));
        assert!(!results.contains(&old));
        assert_eq!(results.message_count(), 1);
        assert!(results.replace_message(None, error("age", "c")));
        assert_eq!(results.message_count(), 2);
    }

    #[test]
    fn test_clone_gets_fresh_cache() {
        let mut results = DefaultValidationResults::new();
        results.add_message(error("name", "a"));
        results.message_count_for_property("name");
        let copy = results.clone();
        assert_eq!(copy.cached_subsets(), 0);
        assert_eq!(copy, results);
    }
}
