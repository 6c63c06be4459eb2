//! Constraint evaluation and violation reporting
//!
//! - `builder`: stack machine mirroring the evaluated tree, pruning satisfied branches
//! - `collector`: visitor that evaluates a tree and drives the builder
//! - `bean`: per-property collection against a bean
//! - `summing`: leaf counting over a (violated) tree
//! - `translator`: violated tree to user-facing text

pub mod bean;
pub mod builder;
pub mod collector;
pub mod summing;
pub mod translator;

pub use bean::{BeanValidationResults, BeanValidationResultsCollector, PropertyResults};
pub use builder::{ValidationResultsBuilder, ViolationSink};
pub use collector::{ValidationResultsCollector, ValueResults};
pub use summing::SummingVisitor;
pub use translator::{
    DefaultMessageCatalog, DefaultMessageTranslator, DefaultPropertyNameResolver, MessageCatalog,
    MessageTranslator, PropertyNameResolver,
};
