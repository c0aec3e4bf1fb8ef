// src/error.rs
use thiserror::Error;

use crate::models::Endpoint;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("too many ':' separators in '{0}'")]
    TooManySeparators(String),

    #[error("unclosed '[' in '{0}'")]
    UnclosedBracket(String),
}

/// Outcome of a failed query exchange. The variants are the complete set of
/// failure kinds a caller can observe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("no response within the query timeout")]
    Timeout,

    #[error("host unreachable: {0}")]
    Unreachable(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    Timeout,
    Unreachable,
    Malformed,
    Unknown,
}

impl QueryError {
    pub fn kind(&self) -> QueryErrorKind {
        match self {
            Self::Timeout => QueryErrorKind::Timeout,
            Self::Unreachable(_) => QueryErrorKind::Unreachable,
            Self::Malformed(_) => QueryErrorKind::Malformed,
            Self::Unknown(_) => QueryErrorKind::Unknown,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("server '{0}' already exists")]
    DuplicateName(String),

    #[error("server '{0}' not found")]
    NotFound(String),

    #[error("invalid server name: {0}")]
    InvalidName(String),

    #[error("hostname must not be empty")]
    InvalidHostname,

    #[error("port {0} is outside 0-65535")]
    InvalidPort(i64),

    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("invalid address '{input}': {source}")]
    InvalidAddress {
        input: String,
        #[source]
        source: AddressError,
    },

    #[error("query against {endpoint} failed: {source}")]
    Query {
        endpoint: Endpoint,
        #[source]
        source: QueryError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
