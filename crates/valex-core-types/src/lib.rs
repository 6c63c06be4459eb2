//! Core types shared across the Valex validation engine
//!
//! This crate provides the plain value types that travel between the
//! engine, its results models, and whatever presentation layer consumes them:
//!
//! - **Messages**: `Severity`, `ValidationMessage`
//! - **Identity**: `ConstraintId` for rule-instance bookkeeping
//! - **Schema constants**: Canonical field keys and event names for logging

pub mod id;
pub mod message;
pub mod schema;

pub use id::ConstraintId;
pub use message::{Severity, ValidationMessage};
