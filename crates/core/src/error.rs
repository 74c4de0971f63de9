use thiserror::Error;

use crate::store::persist::PersistError;

/// Everything a store mutation can fail with. All variants are recovered at
/// the call site; none are fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("you must be logged in")]
    Unauthenticated,
    #[error("{0} cannot be empty")]
    EmptyContent(&'static str),
    #[error("{0} not found or already deleted")]
    NotFound(&'static str),
    #[error("only the author can modify this {0}")]
    Forbidden(&'static str),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}
