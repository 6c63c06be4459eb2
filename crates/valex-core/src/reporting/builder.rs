//! Results builder stack machine
//!
//! Callers open a frame (`push_and`, `push_or`, `push_not`) before descending
//! into a compound node, record failing leaves with `push`, and close the
//! frame with `pop(result)`. Closed frames are attached to their parent, so
//! the finished tree mirrors the evaluated one with satisfied sub-branches
//! pruned. Branches under a `Not` are never pruned: the negation has a single
//! slot rather than a child list.
//!
//! `push_property` opens a binding frame that rewraps whatever violated
//! beneath it in a value constraint on that property. Binding frames are
//! transparent to [`ValidationResultsBuilder::negated`].

use crate::constraint::{Constraint, PropertyConstraint};
use crate::errors::{Result, ValexError};

/// Receiver of the builder's final verdicts
pub trait ViolationSink {
    /// A root-level node failed; `constraint` is the pruned violating tree
    fn constraint_violated(&mut self, constraint: Constraint);

    /// The root node passed
    fn constraint_satisfied(&mut self) {}
}

#[derive(Debug)]
enum Frame {
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    Not(Option<Constraint>),
    Property {
        property: String,
        target: Option<Constraint>,
    },
}

impl Frame {
    fn attach(&mut self, constraint: Constraint) {
        match self {
            Frame::And(children) | Frame::Or(children) => children.push(constraint),
            Frame::Not(slot) | Frame::Property { target: slot, .. } => *slot = Some(constraint),
        }
    }

    fn finish(self) -> Option<Constraint> {
        match self {
            Frame::And(children) => Some(Constraint::And(children)),
            Frame::Or(children) => Some(Constraint::Or(children)),
            Frame::Not(slot) => slot.map(|c| Constraint::Not(Box::new(c))),
            Frame::Property { property, target } => {
                target.map(|c| Constraint::Property(PropertyConstraint::value(property, c)))
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Frame::And(_) => "and",
            Frame::Or(_) => "or",
            Frame::Not(_) => "not",
            Frame::Property { .. } => "property",
        }
    }
}

/// Stack machine that accumulates the violating structure of a tree
#[derive(Debug)]
pub struct ValidationResultsBuilder<S> {
    levels: Vec<Frame>,
    sink: S,
}

impl<S: ViolationSink> ValidationResultsBuilder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            levels: Vec::new(),
            sink,
        }
    }

    pub fn push_and(&mut self) {
        self.open(Frame::And(Vec::new()));
    }

    pub fn push_or(&mut self) {
        self.open(Frame::Or(Vec::new()));
    }

    pub fn push_not(&mut self) {
        self.open(Frame::Not(None));
    }

    /// Bind everything recorded until the matching `pop` to `property`
    pub fn push_property(&mut self, property: impl Into<String>) {
        self.open(Frame::Property {
            property: property.into(),
            target: None,
        });
    }

    fn open(&mut self, frame: Frame) {
        tracing::trace!(frame = frame.label(), depth = self.levels.len(), "push");
        self.levels.push(frame);
    }

    /// Record a failing leaf under the current frame
    ///
    /// With no open frame the leaf is itself the root violation.
    pub fn push(&mut self, constraint: Constraint) {
        match self.levels.last_mut() {
            Some(top) => top.attach(constraint),
            None => {
                tracing::trace!(%constraint, "root leaf violated");
                self.sink.constraint_violated(constraint);
            }
        }
    }

    /// Close the current frame with the node's boolean outcome
    ///
    /// # Errors
    ///
    /// Returns `BuilderProtocol` if no frame is open, or if a failing root
    /// negation never received its target.
    pub fn pop(&mut self, result: bool) -> Result<()> {
        let frame = self
            .levels
            .pop()
            .ok_or_else(|| ValexError::BuilderProtocol {
                reason: "pop called with no open compound".to_string(),
            })?;
        tracing::trace!(frame = frame.label(), result, depth = self.levels.len(), "pop");

        match self.levels.last_mut() {
            None if result => self.sink.constraint_satisfied(),
            None => {
                let violated = frame.finish().ok_or_else(|| ValexError::BuilderProtocol {
                    reason: "negation or binding popped as violated without a target".to_string(),
                })?;
                self.sink.constraint_violated(violated);
            }
            Some(parent @ (Frame::Not(_) | Frame::Property { .. })) => {
                if let Some(child) = frame.finish() {
                    parent.attach(child);
                }
            }
            Some(parent) => {
                // satisfied children of a compound are pruned
                if !result {
                    if let Some(child) = frame.finish() {
                        parent.attach(child);
                    }
                }
            }
        }
        Ok(())
    }

    /// True iff the innermost non-binding frame is a negation
    pub fn negated(&self) -> bool {
        matches!(
            self.levels
                .iter()
                .rev()
                .find(|frame| !matches!(frame, Frame::Property { .. })),
            Some(Frame::Not(_))
        )
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Drop any open frames
    pub fn clear(&mut self) {
        self.levels.clear();
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{min_length, required};

    #[derive(Default)]
    struct Recorder {
        violated: Vec<Constraint>,
        satisfied: usize,
    }

    impl ViolationSink for Recorder {
        fn constraint_violated(&mut self, constraint: Constraint) {
            self.violated.push(constraint);
        }

        fn constraint_satisfied(&mut self) {
            self.satisfied += 1;
        }
    }

    fn builder() -> ValidationResultsBuilder<Recorder> {
        ValidationResultsBuilder::new(Recorder::default())
    }

    #[test]
    fn test_root_leaf_reported_directly() {
        let mut b = builder();
        b.push(required());
        assert_eq!(b.sink().violated.len(), 1);
        assert_eq!(b.sink().violated[0].to_string(), "required");
    }

    #[test]
    fn test_satisfied_child_pruned_from_compound() {
        let mut b = builder();
        b.push_and();
        b.push_or();
        b.pop(true).unwrap();
        b.push(min_length(2));
        b.pop(false).unwrap();

        let recorder = b.into_sink();
        assert_eq!(recorder.violated.len(), 1);
        assert_eq!(recorder.violated[0].to_string(), "(minLength(2))");
    }

    #[test]
    fn test_failed_child_kept() {
        let mut b = builder();
        b.push_or();
        b.push_and();
        b.push(required());
        b.pop(false).unwrap();
        b.push(min_length(1));
        b.pop(false).unwrap();

        assert_eq!(
            b.sink().violated[0].to_string(),
            "((required) or minLength(1))"
        );
    }

    #[test]
    fn test_branch_under_not_never_pruned() {
        let mut b = builder();
        b.push_not();
        b.push_and();
        b.push(required());
        b.pop(true).unwrap();
        assert!(b.negated());
        b.pop(false).unwrap();

        assert_eq!(b.sink().violated[0].to_string(), "not (required)");
    }

    #[test]
    fn test_root_satisfied() {
        let mut b = builder();
        b.push_and();
        b.pop(true).unwrap();
        assert_eq!(b.sink().satisfied, 1);
        assert!(b.sink().violated.is_empty());
    }

    #[test]
    fn test_negated_tracks_top_frame() {
        let mut b = builder();
        assert!(!b.negated());
        b.push_not();
        assert!(b.negated());
        b.push_and();
        assert!(!b.negated());
        b.clear();
        assert_eq!(b.depth(), 0);
    }

    #[test]
    fn test_property_frame_rebinds_violation() {
        let mut b = builder();
        b.push_and();
        b.push_property("end");
        b.push(required());
        b.pop(false).unwrap();
        b.push_property("start");
        b.pop(true).unwrap();
        b.pop(false).unwrap();

        assert_eq!(b.sink().violated[0].to_string(), "(end: required)");
    }

    #[test]
    fn test_property_frame_is_transparent_to_negation() {
        let mut b = builder();
        b.push_not();
        b.push_property("age");
        assert!(b.negated());
        b.push_and();
        assert!(!b.negated());
    }

    #[test]
    fn test_pop_on_empty_stack_is_protocol_error() {
        let mut b = builder();
        let err = b.pop(false).unwrap_err();
        assert!(matches!(err, ValexError::BuilderProtocol { .. }));
    }

    #[test]
    fn test_violated_empty_negation_is_protocol_error() {
        let mut b = builder();
        b.push_not();
        assert!(b.pop(false).is_err());
    }
}
