//! Failure policy for remote operations.
//!
//! The local session is authoritative. Remote writes and reads made on its
//! behalf are best effort: a failure is logged and the caller carries on.

use super::store::RemoteError;

/// Log a failed remote operation and swallow it.
///
/// Returns the success value, or `None` after logging the error at `warn`.
pub fn best_effort<T>(operation: &str, order_id: &str, result: Result<T, RemoteError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                operation,
                order_id = %order_id,
                error = %e,
                "Remote sync failed, continuing with local state"
            );
            None
        }
    }
}
