//! Identity types for constraint instances
//!
//! A `ConstraintId` names one logical rule instance. Clones of a property
//! constraint share the id, so a validator can track "the message produced
//! by this rule" across validation passes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single constraint instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConstraintId(Uuid);

impl ConstraintId {
    /// Generate a fresh id using UUIDv7 (time ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID (for deserialization or fixtures)
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConstraintId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_id_generation() {
        let id1 = ConstraintId::new();
        let id2 = ConstraintId::new();

        assert_ne!(id1, id2);
        assert!(!id1.to_string().is_empty());
    }

    #[test]
    fn test_constraint_id_is_time_ordered() {
        let first = ConstraintId::new();
        let second = ConstraintId::new();
        assert!(first <= second);
    }

    #[test]
    fn test_constraint_id_copy_preserves_identity() {
        let id = ConstraintId::new();
        let copied = id;
        assert_eq!(id, copied);
        assert_eq!(id.as_uuid(), copied.as_uuid());
    }

    #[test]
    fn test_serialization() {
        let id = ConstraintId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: ConstraintId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
