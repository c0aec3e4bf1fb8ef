// src/storage/mod.rs
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::RegistryError;
use crate::models::{Endpoint, NamedServer};

pub use memory::MemoryRegistry;
pub use sqlite::SqliteRegistry;

pub const MAX_NAME_CHARS: usize = 100;

/// Suggestion lists are capped at what a selection menu can show.
pub const SUGGESTION_LIMIT: usize = 25;

/// Per-community mapping from a short name to a server endpoint.
///
/// Names are unique within a community; `add` is the only place that
/// invariant is established, and it must hold under concurrent writers.
/// Prefix search is ASCII case-insensitive and ordered by name.
#[async_trait]
pub trait ServerRegistry: Send + Sync {
    async fn add(
        &self,
        community_id: u64,
        name: &str,
        endpoint: Endpoint,
    ) -> Result<NamedServer, RegistryError>;

    async fn remove(&self, community_id: u64, name: &str) -> Result<(), RegistryError>;

    async fn get(&self, community_id: u64, name: &str) -> Result<Option<NamedServer>, RegistryError>;

    async fn list(&self, community_id: u64) -> Result<Vec<NamedServer>, RegistryError>;

    async fn search_by_prefix(
        &self,
        community_id: u64,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<NamedServer>, RegistryError>;
}

/// Checks a record before it is written.
pub fn validate(name: &str, endpoint: &Endpoint) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::InvalidName("name must not be empty".to_string()));
    }
    let len = name.chars().count();
    if len > MAX_NAME_CHARS {
        return Err(RegistryError::InvalidName(format!(
            "name is {} characters, limit is {}",
            len, MAX_NAME_CHARS
        )));
    }
    if endpoint.hostname.trim().is_empty() {
        return Err(RegistryError::InvalidHostname);
    }
    Ok(())
}

pub(crate) fn has_prefix_ignore_ascii_case(name: &str, prefix: &str) -> bool {
    name.len() >= prefix.len()
        && name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
