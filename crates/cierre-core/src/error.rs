//! Error kinds of the closure engine.

use thiserror::Error;
use uuid::Uuid;

use cierre_store::store::StoreError;

/// Errors surfaced by the closure engine.
///
/// Everything except `Store` is raised before any remote call and leaves no
/// side effects. A `Store` error during commit aborts the remainder of the
/// sequence; steps already committed are not rolled back (the store offers
/// no transaction to wrap them in), and the workflow must be retried from
/// its confirmed state.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is missing or inconsistent. Fully recoverable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Required upstream configuration is absent (e.g. a fertilizer product
    /// with no kg-per-bulto factor). Must be fixed before capture can run.
    #[error("missing configuration: {0}")]
    Configuration(String),

    /// An input value is outside its documented domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The workflow is not in a state that permits the requested operation.
    #[error("cannot {operation} while workflow is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// The application was already closed; closure is never re-applied.
    #[error("application {id} is already closed")]
    AlreadyClosed { id: Uuid },

    /// A persistence call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
