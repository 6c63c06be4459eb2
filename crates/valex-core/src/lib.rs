//! Valex Core - constraint evaluation and validation results engine
//!
//! This crate evaluates boolean constraint trees against live property
//! values and keeps the resulting validation messages up to date:
//! - Constraint trees (`And`/`Or`/`Not`, transforms, property-bound rules)
//!   with a visitor interface
//! - A results builder that keeps only the violating structure of a tree
//! - Single-value and per-property collectors, leaf counting, and message
//!   translation
//! - A cached results container and a hierarchical, observable results model
//! - `RulesValidator`, which diffs each pass against the last one so each
//!   rule owns at most one live message
//!
//! Evaluation and notification are synchronous and single-threaded.

pub mod config;
pub mod constraint;
pub mod errors;
pub mod format;
pub mod logging_facility;
pub mod model;
pub mod property;
pub mod reporting;
pub mod results;
pub mod rules;
pub mod validator;

// Re-export commonly used types
pub use config::ValidatorConfig;
pub use constraint::{Constraint, ConstraintVisitor, Predicate, PropertyConstraint, Relation};
pub use errors::{Result, ValexError, VxError, VxErrorKind};
pub use format::{InvalidFormat, ValueFormatter};
pub use model::{
    ChildHandle, DefaultValidationResultsModel, DetachError, ListenerId, PropertyChangeEvent,
    ValidationResultsModel, HAS_ERRORS_PROPERTY, HAS_INFO_PROPERTY, HAS_WARNINGS_PROPERTY,
};
pub use property::{PropertyAccessStrategy, PropertyBag, Validatable};
pub use reporting::{
    DefaultMessageTranslator, MessageTranslator, ValidationResultsCollector, ViolationSink,
};
pub use results::{DefaultValidationResults, ValidationResults};
pub use rules::{DefaultRulesSource, Rules, RulesSource};
pub use validator::RulesValidator;
pub use valex_core_types::{ConstraintId, Severity, ValidationMessage};
