use thiserror::Error;

/// Result type alias using ValexError
pub type Result<T> = std::result::Result<T, ValexError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling
/// and test assertions. Validation failures proper are never errors: they
/// travel as `ValidationMessage`s. Everything here signals a defect in the
/// calling code or malformed input at a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VxErrorKind {
    // Protocol/precondition
    ProtocolViolation,
    InvalidConstraint,
    CycleDetected,
    NotFound,
    UnsupportedProperty,

    // Boundary input
    InvalidFormat,
    InvalidConfig,
    Serialization,

    // Internal
    Internal,
}

impl VxErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            VxErrorKind::ProtocolViolation => "ERR_PROTOCOL_VIOLATION",
            VxErrorKind::InvalidConstraint => "ERR_INVALID_CONSTRAINT",
            VxErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            VxErrorKind::NotFound => "ERR_NOT_FOUND",
            VxErrorKind::UnsupportedProperty => "ERR_UNSUPPORTED_PROPERTY",
            VxErrorKind::InvalidFormat => "ERR_INVALID_FORMAT",
            VxErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            VxErrorKind::Serialization => "ERR_SERIALIZATION",
            VxErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Classification fields for programmatic handling plus context for
/// debugging. Built from a `ValexError` or directly with the `with_*` methods.
#[derive(Debug, Clone)]
pub struct VxError {
    kind: VxErrorKind,
    op: Option<String>,
    property: Option<String>,
    input: Option<String>,
    message: String,
}

impl VxError {
    /// Create a new error with the specified kind
    pub fn new(kind: VxErrorKind) -> Self {
        Self {
            kind,
            op: None,
            property: None,
            input: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add property context
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Add the offending raw input
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> VxErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for VxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(property) = &self.property {
            write!(f, " (property: {})", property)?;
        }
        if let Some(input) = &self.input {
            write!(f, " (input: {:?})", input)?;
        }
        Ok(())
    }
}

impl std::error::Error for VxError {}

// ========== End Error Facility ==========

/// Error taxonomy for Valex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValexError {
    /// The builder stack machine was driven outside its push/pop protocol
    #[error("Results builder protocol violated: {reason}")]
    BuilderProtocol { reason: String },

    /// A constraint could not be constructed from the given parts
    #[error("Invalid constraint: {reason}")]
    InvalidConstraint { reason: String },

    /// Attaching the child would make a model its own ancestor
    #[error("Attaching model {child_id} under {parent_id} would create a cycle")]
    CyclicModel { parent_id: u64, child_id: u64 },

    /// The child is already attached under this model
    #[error("Model {child_id} is already attached to model {parent_id}")]
    ChildAlreadyAttached { parent_id: u64, child_id: u64 },

    /// The child handle does not belong to this model
    #[error("Model {child_id} is not attached to model {parent_id}")]
    ChildNotAttached { parent_id: u64, child_id: u64 },

    /// Listener registration for a property the model does not publish
    #[error("Unsupported property for change listeners: {property}")]
    UnsupportedProperty { property: String },

    /// Text could not be parsed by a formatter
    #[error("Invalid format: {input:?} (expected {expected})")]
    InvalidFormat { input: String, expected: String },

    /// Configuration could not be read
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// JSON serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<ValexError> for VxError {
    fn from(err: ValexError) -> Self {
        let message = err.to_string();
        match err {
            ValexError::BuilderProtocol { .. } => {
                VxError::new(VxErrorKind::ProtocolViolation).with_message(message)
            }
            ValexError::InvalidConstraint { .. } => {
                VxError::new(VxErrorKind::InvalidConstraint).with_message(message)
            }
            ValexError::CyclicModel { .. } => {
                VxError::new(VxErrorKind::CycleDetected).with_message(message)
            }
            ValexError::ChildAlreadyAttached { .. } => {
                VxError::new(VxErrorKind::ProtocolViolation).with_message(message)
            }
            ValexError::ChildNotAttached { .. } => {
                VxError::new(VxErrorKind::NotFound).with_message(message)
            }
            ValexError::UnsupportedProperty { property } => {
                VxError::new(VxErrorKind::UnsupportedProperty)
                    .with_property(property)
                    .with_message(message)
            }
            ValexError::InvalidFormat { input, .. } => VxError::new(VxErrorKind::InvalidFormat)
                .with_input(input)
                .with_message(message),
            ValexError::InvalidConfig { .. } => {
                VxError::new(VxErrorKind::InvalidConfig).with_message(message)
            }
            ValexError::Serialization(_) => {
                VxError::new(VxErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for ValexError {
    fn from(err: serde_json::Error) -> Self {
        ValexError::Serialization(err.to_string())
    }
}
