use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid page: {0}. pages start at 1")]
    InvalidPage(u64),
    #[error("invalid page size: {0}. page size must be at least 1")]
    InvalidPageSize(u64),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}
