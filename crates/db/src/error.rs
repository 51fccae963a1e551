use eduboard_core::error::CoreError;

use crate::store::StoreError;

/// Error returned by repositories: a domain rule failed, or storage did.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RepoResult<T> = Result<T, RepoError>;
