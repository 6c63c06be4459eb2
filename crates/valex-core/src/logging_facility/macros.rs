//! Canonical logging macros
//!
//! These macros provide a structured, consistent way to log operations.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use valex_core::log_op_start;
/// log_op_start!("validate");
/// log_op_start!("validate", property = "username");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = valex_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = valex_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use valex_core::log_op_end;
/// log_op_end!("validate", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = valex_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = valex_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// The error is converted into a `VxError` to extract kind and code.
///
/// # Example
///
/// ```
/// # use valex_core::{log_op_error, errors::ValexError};
/// let err = ValexError::BuilderProtocol { reason: "pop on empty stack".to_string() };
/// log_op_error!("validate", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::VxError;
        let vx_err: VxError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = valex_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?vx_err.kind(),
            err_code = vx_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        use $crate::errors::VxError;
        let vx_err: VxError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = valex_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?vx_err.kind(),
            err_code = vx_err.code(),
            $($field)*
        );
    }};
}
