// src/utils.rs
use actix_web::http::{header, StatusCode};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::RateLimiter;
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

use crate::error::{AddressError, QueryError, RegistryError, ServiceError};
use crate::models::Endpoint;

pub type CommunityRateLimiter = RateLimiter<u64, DefaultKeyedStateStore<u64>, DefaultClock>;

/// Bearer token that unlocks registry mutation. `None` disables it.
#[derive(Debug, Clone)]
pub struct AdminToken(pub Option<String>);

/// Every failure the HTTP front end can report. Each kind renders its own
/// message and status.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid address '{0}': {1}.")]
    InvalidAddress(String, AddressError),

    #[error("Server '{0}' is offline.")]
    Offline(Endpoint),

    #[error("Server '{0}' is unreachable.")]
    Unreachable(Endpoint),

    #[error("Server '{0}' sent an invalid response.")]
    Malformed(Endpoint),

    #[error("Error occurred while querying server '{0}'.")]
    QueryFailed(Endpoint),

    #[error("Server '{0}' already exists.")]
    DuplicateName(String),

    #[error("Server '{0}' not found.")]
    NotFound(String),

    #[error("Invalid server: {0}.")]
    InvalidServer(String),

    #[error("The server registry is unavailable.")]
    Storage,

    #[error("You do not have permission to use this command.")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl From<RegistryError> for RequestError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::DuplicateName(name) => Self::DuplicateName(name),
            RegistryError::NotFound(name) => Self::NotFound(name),
            RegistryError::InvalidName(_)
            | RegistryError::InvalidHostname
            | RegistryError::InvalidPort(_) => Self::InvalidServer(e.to_string()),
            RegistryError::Storage(msg) => {
                error!("Registry storage failure: {}", msg);
                Self::Storage
            }
        }
    }
}

impl From<ServiceError> for RequestError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::InvalidAddress { input, source } => Self::InvalidAddress(input, source),
            ServiceError::Query { endpoint, source } => match source {
                QueryError::Timeout => Self::Offline(endpoint),
                QueryError::Unreachable(_) => Self::Unreachable(endpoint),
                QueryError::Malformed(detail) => {
                    warn!("Malformed response from {}: {}", endpoint, detail);
                    Self::Malformed(endpoint)
                }
                QueryError::Unknown(detail) => {
                    error!("Transport failure querying {}: {}", endpoint, detail);
                    Self::QueryFailed(endpoint)
                }
            },
            ServiceError::Registry(e) => e.into(),
        }
    }
}

impl ResponseError for RequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAddress(..) | Self::InvalidServer(_) => StatusCode::BAD_REQUEST,
            Self::Offline(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Unreachable(_) | Self::Malformed(_) => StatusCode::BAD_GATEWAY,
            Self::QueryFailed(_) | Self::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DuplicateName(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Checks the `Authorization: Bearer` header against the configured token.
pub fn require_admin(req: &HttpRequest, token: &AdminToken) -> Result<(), RequestError> {
    let expected = token.0.as_deref().ok_or(RequestError::Unauthorized)?;
    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(RequestError::Unauthorized)?;

    if provided.trim() != expected {
        warn!("Rejected registry mutation with a bad admin token");
        return Err(RequestError::Unauthorized);
    }
    Ok(())
}

pub fn check_rate_limit(limiter: &CommunityRateLimiter, community_id: u64) -> Result<(), RequestError> {
    if limiter.check_key(&community_id).is_err() {
        error!("Rate limit exceeded for community {}", community_id);
        return Err(RequestError::RateLimitExceeded);
    }
    Ok(())
}
