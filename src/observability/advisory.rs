//! Advisory operations.
//!
//! Some work is done on the side of a request: dumping the last backend body
//! to disk, persisting the call record. Their failures must reach the logs but
//! can never change what the caller receives. Call sites route such results
//! through these helpers instead of `?`, which makes the policy visible.

use std::fmt::Display;

/// Log a failure at `debug` and discard it. For purely diagnostic side effects.
pub fn quiet<T, E: Display>(operation: &'static str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(operation, error = %e, "Advisory operation failed");
            None
        }
    }
}

/// Log a failure at `error` and discard it. For side effects an operator
/// must hear about, such as a lost call record.
pub fn report<T, E: Display>(operation: &'static str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(operation, error = %e, "Advisory operation failed");
            None
        }
    }
}
