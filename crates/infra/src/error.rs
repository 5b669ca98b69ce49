use crate::relational::AccessError;
use thiserror::Error;
use tracing::error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The query ran but matched nothing where a row was required
    #[error("The requested {entity} was not found")]
    NotFound { entity: &'static str },
    #[error("Persistence failure in `{operation}`. Error message: `{source}`")]
    Persistence {
        operation: &'static str,
        #[source]
        source: AccessError,
    },
    #[error("`{operation}` was cancelled before it completed")]
    Cancelled { operation: &'static str },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Maps failures of statements that may legitimately match nothing.
    /// `AccessError::NoRows` becomes `StoreError::NotFound`.
    pub(crate) fn lookup(
        operation: &'static str,
        entity: &'static str,
    ) -> impl FnOnce(AccessError) -> StoreError {
        move |e| match e {
            AccessError::NoRows => StoreError::NotFound { entity },
            e => Self::classify(operation, e),
        }
    }

    /// Maps failures of statements where matching nothing is itself a
    /// failure, e.g. an insert that returns no id.
    pub(crate) fn persist(operation: &'static str) -> impl FnOnce(AccessError) -> StoreError {
        move |e| Self::classify(operation, e)
    }

    fn classify(operation: &'static str, e: AccessError) -> StoreError {
        match e {
            AccessError::Cancelled | AccessError::DeadlineExceeded => {
                StoreError::Cancelled { operation }
            }
            source => {
                error!("Store operation `{}` failed: {}", operation, source);
                StoreError::Persistence { operation, source }
            }
        }
    }
}
