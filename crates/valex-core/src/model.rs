//! Hierarchical, observable validation results
//!
//! A [`DefaultValidationResultsModel`] owns one set of local results and any
//! number of child models. Its effective messages are the union of its own
//! and its children's; its `hasErrors`/`hasWarnings`/`hasInfo` summaries are
//! memoized and announced only when they flip.
//!
//! Data flows strictly upward. A parent keeps its children alive; a child
//! only reaches its parent through weak listener closures registered by
//! [`DefaultValidationResultsModel::add_child`], and the returned
//! [`ChildHandle`] is the only way to unregister them.
//!
//! Single-threaded by construction (`Rc`/`RefCell`). Listeners run after all
//! internal borrows are released, so they may read the model; mutating a
//! model from inside one of its listeners is not supported.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use valex_core_types::{Severity, ValidationMessage};

use crate::errors::{Result, ValexError};
use crate::results::{DefaultValidationResults, ValidationResults};

pub const HAS_ERRORS_PROPERTY: &str = "hasErrors";
pub const HAS_WARNINGS_PROPERTY: &str = "hasWarnings";
pub const HAS_INFO_PROPERTY: &str = "hasInfo";

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Registration token for any listener kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// A summary flag flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyChangeEvent {
    pub property_name: &'static str,
    pub old_value: bool,
    pub new_value: bool,
}

type ValidationListener = Rc<dyn Fn(&dyn ValidationResults)>;
type ChangeListener = Rc<dyn Fn(&PropertyChangeEvent)>;
type ParentLink = Rc<dyn Fn(&BTreeSet<String>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Summary {
    Errors,
    Warnings,
    Info,
}

impl Summary {
    const ALL: [Summary; 3] = [Summary::Errors, Summary::Warnings, Summary::Info];

    fn property_name(self) -> &'static str {
        match self {
            Summary::Errors => HAS_ERRORS_PROPERTY,
            Summary::Warnings => HAS_WARNINGS_PROPERTY,
            Summary::Info => HAS_INFO_PROPERTY,
        }
    }

    fn from_property_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.property_name() == name)
    }

    fn severity(self) -> Severity {
        match self {
            Summary::Errors => Severity::Error,
            Summary::Warnings => Severity::Warning,
            Summary::Info => Severity::Info,
        }
    }
}

/// Subscribe contract of an observable results aggregate
pub trait ValidationResultsModel: ValidationResults {
    /// Called after any change to the effective messages
    fn add_validation_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&dyn ValidationResults) + 'static;

    /// Called after a change touching messages for `property`
    fn add_property_validation_listener<F>(&self, property: &str, listener: F) -> ListenerId
    where
        F: Fn(&dyn ValidationResults) + 'static;

    /// Called when the named summary flag flips
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProperty` unless `property_name` is one of
    /// `HAS_ERRORS_PROPERTY`, `HAS_WARNINGS_PROPERTY` or `HAS_INFO_PROPERTY`.
    fn add_property_change_listener<F>(&self, property_name: &str, listener: F) -> Result<ListenerId>
    where
        F: Fn(&PropertyChangeEvent) + 'static;

    /// Unregister a listener of any kind; false if the id is unknown
    fn remove_listener(&self, id: ListenerId) -> bool;
}

struct AttachedChild {
    model: DefaultValidationResultsModel,
    subscriptions: Vec<ListenerId>,
}

struct ModelState {
    id: u64,
    results: DefaultValidationResults,
    children: Vec<AttachedChild>,
    has_errors: bool,
    has_warnings: bool,
    has_info: bool,
    next_listener: u64,
    validation_listeners: Vec<(ListenerId, ValidationListener)>,
    property_listeners: BTreeMap<String, Vec<(ListenerId, ValidationListener)>>,
    change_listeners: BTreeMap<&'static str, Vec<(ListenerId, ChangeListener)>>,
    parent_links: Vec<(ListenerId, ParentLink)>,
}

impl ModelState {
    fn flag(&self, summary: Summary) -> bool {
        match summary {
            Summary::Errors => self.has_errors,
            Summary::Warnings => self.has_warnings,
            Summary::Info => self.has_info,
        }
    }

    fn set_flag(&mut self, summary: Summary, value: bool) {
        match summary {
            Summary::Errors => self.has_errors = value,
            Summary::Warnings => self.has_warnings = value,
            Summary::Info => self.has_info = value,
        }
    }

    fn next_listener_id(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        fn remove_from<T>(list: &mut Vec<(ListenerId, T)>, id: ListenerId) -> bool {
            let before = list.len();
            list.retain(|(lid, _)| *lid != id);
            list.len() != before
        }

        remove_from(&mut self.validation_listeners, id)
            || self
                .property_listeners
                .values_mut()
                .any(|list| remove_from(list, id))
            || self
                .change_listeners
                .values_mut()
                .any(|list| remove_from(list, id))
            || remove_from(&mut self.parent_links, id)
    }
}

/// Owned registration of a child under a parent model
///
/// Pass it back to [`DefaultValidationResultsModel::remove_child`] to detach
/// the child and drop the parent's subscriptions.
#[must_use = "dropping the handle leaves the child attached with no way to detach it"]
#[derive(Debug)]
pub struct ChildHandle {
    parent_id: u64,
    child: DefaultValidationResultsModel,
}

impl ChildHandle {
    pub fn model(&self) -> &DefaultValidationResultsModel {
        &self.child
    }
}

/// A rejected detach, handing the [`ChildHandle`] back to the caller
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DetachError {
    pub error: ValexError,
    pub handle: ChildHandle,
}

impl DetachError {
    pub fn into_handle(self) -> ChildHandle {
        self.handle
    }
}

impl From<DetachError> for ValexError {
    fn from(err: DetachError) -> Self {
        err.error
    }
}

/// Cheap-clone handle over shared model state
#[derive(Clone)]
pub struct DefaultValidationResultsModel {
    state: Rc<RefCell<ModelState>>,
}

impl Default for DefaultValidationResultsModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultValidationResultsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("DefaultValidationResultsModel")
            .field("id", &state.id)
            .field("messages", &state.results.message_count())
            .field("children", &state.children.len())
            .field("has_errors", &state.has_errors)
            .field("has_warnings", &state.has_warnings)
            .field("has_info", &state.has_info)
            .finish_non_exhaustive()
    }
}

impl DefaultValidationResultsModel {
    pub fn new() -> Self {
        Self::with_results(DefaultValidationResults::new())
    }

    /// Model starting from `results`, with summaries computed up front
    pub fn with_results(results: DefaultValidationResults) -> Self {
        let state = ModelState {
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            has_errors: results.has_errors(),
            has_warnings: results.has_warnings(),
            has_info: results.has_info(),
            results,
            children: Vec::new(),
            next_listener: 0,
            validation_listeners: Vec::new(),
            property_listeners: BTreeMap::new(),
            change_listeners: BTreeMap::new(),
            parent_links: Vec::new(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    fn from_weak(state: &Weak<RefCell<ModelState>>) -> Option<Self> {
        state.upgrade().map(|state| Self { state })
    }

    pub fn id(&self) -> u64 {
        self.state.borrow().id
    }

    /// Copy of this model's own results, children excluded
    pub fn local_results(&self) -> DefaultValidationResults {
        self.state.borrow().results.clone()
    }

    pub fn child_count(&self) -> usize {
        self.state.borrow().children.len()
    }

    /// Replace the local results wholesale
    ///
    /// Nothing is announced when both the old and the new results are empty.
    pub fn update_validation_results(&self, results: DefaultValidationResults) {
        let (old, new_properties, new_empty) = {
            let mut state = self.state.borrow_mut();
            let old = std::mem::replace(&mut state.results, results);
            (old, state.results.properties(), state.results.is_empty())
        };
        if old.is_empty() && new_empty {
            return;
        }
        let mut touched = old.properties();
        touched.extend(new_properties);
        self.fire_changed_events(&touched);
    }

    pub fn add_message(&self, message: ValidationMessage) {
        let mut results = self.local_results();
        if results.add_message(message) {
            self.update_validation_results(results);
        }
    }

    pub fn remove_message(&self, message: &ValidationMessage) {
        let mut results = self.local_results();
        if results.remove_message(message) {
            self.update_validation_results(results);
        }
    }

    /// Swap `old` for `new` in one notification pass
    ///
    /// When the two messages belong to different properties, listeners on
    /// the old property are told again after the pass.
    pub fn replace_message(&self, old: &ValidationMessage, new: ValidationMessage) {
        let mut results = self.local_results();
        let contained = results.contains(old);
        let property_moved = contained && old.property() != new.property();
        results.replace_message(Some(old), new);
        self.update_validation_results(results);
        if property_moved {
            if let Some(property) = old.property() {
                self.fire_property_results_changed(property);
            }
        }
    }

    pub fn clear_messages(&self) {
        self.update_validation_results(DefaultValidationResults::new());
    }

    /// Attach `child`; its messages join this model's effective messages
    ///
    /// # Errors
    ///
    /// Returns `CyclicModel` if `child` is this model or one of its
    /// ancestors, and `ChildAlreadyAttached` if it is already a direct child.
    pub fn add_child(&self, child: &DefaultValidationResultsModel) -> Result<ChildHandle> {
        let parent_id = self.id();
        let child_id = child.id();
        if parent_id == child_id || child.contains_model(parent_id) {
            return Err(ValexError::CyclicModel {
                parent_id,
                child_id,
            });
        }
        if self.child_index(child_id).is_some() {
            return Err(ValexError::ChildAlreadyAttached {
                parent_id,
                child_id,
            });
        }

        let weak = Rc::downgrade(&self.state);
        let mut subscriptions = Vec::with_capacity(Summary::ALL.len() + 1);
        for summary in Summary::ALL {
            let weak = weak.clone();
            let listener: ChangeListener = Rc::new(move |_event: &PropertyChangeEvent| {
                if let Some(parent) = Self::from_weak(&weak) {
                    parent.update_summary(summary);
                }
            });
            subscriptions.push(child.register_change_listener(summary.property_name(), listener));
        }
        let link: ParentLink = Rc::new(move |touched: &BTreeSet<String>| {
            if let Some(parent) = Self::from_weak(&weak) {
                parent.propagate(touched);
            }
        });
        subscriptions.push(child.register_parent_link(link));

        self.state.borrow_mut().children.push(AttachedChild {
            model: child.clone(),
            subscriptions,
        });
        tracing::debug!(parent = parent_id, child = child_id, "child model attached");

        if child.message_count() > 0 {
            self.fire_changed_events(&child.message_properties());
        }
        Ok(ChildHandle {
            parent_id,
            child: child.clone(),
        })
    }

    /// Detach the child registered by `handle`
    ///
    /// # Errors
    ///
    /// Returns `ChildNotAttached` if `handle` was issued by another model or
    /// its child is no longer attached. The handle comes back inside the
    /// error so the child can still be detached from its real parent.
    pub fn remove_child(&self, handle: ChildHandle) -> std::result::Result<(), DetachError> {
        let parent_id = self.id();
        let child_id = handle.child.id();
        let index = if handle.parent_id == parent_id {
            self.child_index(child_id)
        } else {
            None
        };
        let Some(index) = index else {
            return Err(DetachError {
                error: ValexError::ChildNotAttached {
                    parent_id,
                    child_id,
                },
                handle,
            });
        };

        let attached = self.state.borrow_mut().children.remove(index);
        for id in attached.subscriptions {
            attached.model.remove_listener(id);
        }
        tracing::debug!(parent = parent_id, child = child_id, "child model detached");

        if attached.model.message_count() > 0 {
            self.fire_changed_events(&attached.model.message_properties());
        }
        Ok(())
    }

    fn child_index(&self, child_id: u64) -> Option<usize> {
        self.state
            .borrow()
            .children
            .iter()
            .position(|c| c.model.id() == child_id)
    }

    fn children(&self) -> Vec<DefaultValidationResultsModel> {
        self.state
            .borrow()
            .children
            .iter()
            .map(|c| c.model.clone())
            .collect()
    }

    /// Whether a model with `id` sits anywhere below this one
    fn contains_model(&self, id: u64) -> bool {
        self.children()
            .iter()
            .any(|child| child.id() == id || child.contains_model(id))
    }

    fn message_properties(&self) -> BTreeSet<String> {
        self.messages()
            .iter()
            .filter_map(|m| m.property().map(str::to_string))
            .collect()
    }

    fn register_change_listener(&self, name: &'static str, listener: ChangeListener) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = state.next_listener_id();
        state
            .change_listeners
            .entry(name)
            .or_default()
            .push((id, listener));
        id
    }

    fn register_parent_link(&self, link: ParentLink) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = state.next_listener_id();
        state.parent_links.push((id, link));
        id
    }

    fn summary(&self, summary: Summary) -> bool {
        self.state.borrow().flag(summary)
    }

    /// Recompute one summary flag and announce it if it flipped
    fn update_summary(&self, summary: Summary) {
        let (old, local) = {
            let state = self.state.borrow();
            (
                state.flag(summary),
                state.results.message_count_for_severity(summary.severity()) > 0,
            )
        };
        let new = local || self.children().iter().any(|c| c.summary(summary));
        if new == old {
            return;
        }

        let listeners = {
            let mut state = self.state.borrow_mut();
            state.set_flag(summary, new);
            tracing::debug!(
                model = state.id,
                property = summary.property_name(),
                old,
                new,
                "summary flipped"
            );
            state
                .change_listeners
                .get(summary.property_name())
                .map(|list| list.iter().map(|(_, l)| Rc::clone(l)).collect::<Vec<_>>())
                .unwrap_or_default()
        };
        let event = PropertyChangeEvent {
            property_name: summary.property_name(),
            old_value: old,
            new_value: new,
        };
        for listener in listeners {
            listener(&event);
        }
    }

    /// Full notification pass after a change to this model's own results
    fn fire_changed_events(&self, touched: &BTreeSet<String>) {
        for summary in Summary::ALL {
            self.update_summary(summary);
        }
        self.propagate(touched);
    }

    /// Announce a change whose summaries are already up to date
    fn propagate(&self, touched: &BTreeSet<String>) {
        self.fire_validation_results_changed();
        for property in touched {
            self.fire_property_results_changed(property);
        }
        let links: Vec<ParentLink> = self
            .state
            .borrow()
            .parent_links
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for link in links {
            link(touched);
        }
    }

    fn fire_validation_results_changed(&self) {
        let listeners: Vec<ValidationListener> = self
            .state
            .borrow()
            .validation_listeners
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        tracing::trace!(model = self.id(), listeners = listeners.len(), "results changed");
        for listener in listeners {
            listener(self);
        }
    }

    fn fire_property_results_changed(&self, property: &str) {
        let listeners: Vec<ValidationListener> = self
            .state
            .borrow()
            .property_listeners
            .get(property)
            .map(|list| list.iter().map(|(_, l)| Rc::clone(l)).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(self);
        }
    }
}

impl ValidationResults for DefaultValidationResultsModel {
    fn messages(&self) -> BTreeSet<ValidationMessage> {
        let mut messages = self.state.borrow().results.messages();
        for child in self.children() {
            messages.extend(child.messages());
        }
        messages
    }

    fn has_errors(&self) -> bool {
        self.summary(Summary::Errors)
    }

    fn has_warnings(&self) -> bool {
        self.summary(Summary::Warnings)
    }

    fn has_info(&self) -> bool {
        self.summary(Summary::Info)
    }
}

impl ValidationResultsModel for DefaultValidationResultsModel {
    fn add_validation_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&dyn ValidationResults) + 'static,
    {
        let mut state = self.state.borrow_mut();
        let id = state.next_listener_id();
        state.validation_listeners.push((id, Rc::new(listener)));
        id
    }

    fn add_property_validation_listener<F>(&self, property: &str, listener: F) -> ListenerId
    where
        F: Fn(&dyn ValidationResults) + 'static,
    {
        let mut state = self.state.borrow_mut();
        let id = state.next_listener_id();
        state
            .property_listeners
            .entry(property.to_string())
            .or_default()
            .push((id, Rc::new(listener)));
        id
    }

    fn add_property_change_listener<F>(&self, property_name: &str, listener: F) -> Result<ListenerId>
    where
        F: Fn(&PropertyChangeEvent) + 'static,
    {
        let summary = Summary::from_property_name(property_name).ok_or_else(|| {
            ValexError::UnsupportedProperty {
                property: property_name.to_string(),
            }
        })?;
        Ok(self.register_change_listener(summary.property_name(), Rc::new(listener)))
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.state.borrow_mut().remove_listener(id)
    }
}
