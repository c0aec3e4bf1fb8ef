// src/storage/memory.rs
use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use super::{has_prefix_ignore_ascii_case, validate, ServerRegistry};
use crate::error::RegistryError;
use crate::models::{Endpoint, NamedServer};

/// Volatile registry. Each community's servers live in one map entry, so a
/// uniqueness check and its insert happen under the same shard lock while
/// other communities stay readable.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    communities: DashMap<u64, BTreeMap<String, Endpoint>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn named(community_id: u64, name: &str, endpoint: &Endpoint) -> NamedServer {
    NamedServer {
        community_id,
        name: name.to_string(),
        endpoint: endpoint.clone(),
    }
}

#[async_trait]
impl ServerRegistry for MemoryRegistry {
    async fn add(
        &self,
        community_id: u64,
        name: &str,
        endpoint: Endpoint,
    ) -> Result<NamedServer, RegistryError> {
        validate(name, &endpoint)?;

        let mut servers = self.communities.entry(community_id).or_default();
        match servers.entry(name.to_string()) {
            Entry::Occupied(_) => {
                debug!("Server '{}' already registered in community {}", name, community_id);
                Err(RegistryError::DuplicateName(name.to_string()))
            }
            Entry::Vacant(slot) => {
                let server = named(community_id, name, &endpoint);
                slot.insert(endpoint);
                Ok(server)
            }
        }
    }

    async fn remove(&self, community_id: u64, name: &str) -> Result<(), RegistryError> {
        let removed = self
            .communities
            .get_mut(&community_id)
            .and_then(|mut servers| servers.remove(name));

        match removed {
            Some(_) => {
                self.communities.remove_if(&community_id, |_, servers| servers.is_empty());
                Ok(())
            }
            None => Err(RegistryError::NotFound(name.to_string())),
        }
    }

    async fn get(&self, community_id: u64, name: &str) -> Result<Option<NamedServer>, RegistryError> {
        Ok(self.communities.get(&community_id).and_then(|servers| {
            servers.get(name).map(|endpoint| named(community_id, name, endpoint))
        }))
    }

    async fn list(&self, community_id: u64) -> Result<Vec<NamedServer>, RegistryError> {
        Ok(self
            .communities
            .get(&community_id)
            .map(|servers| {
                servers
                    .iter()
                    .map(|(name, endpoint)| named(community_id, name, endpoint))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn search_by_prefix(
        &self,
        community_id: u64,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<NamedServer>, RegistryError> {
        Ok(self
            .communities
            .get(&community_id)
            .map(|servers| {
                servers
                    .iter()
                    .filter(|(name, _)| has_prefix_ignore_ascii_case(name, prefix))
                    .take(limit)
                    .map(|(name, endpoint)| named(community_id, name, endpoint))
                    .collect()
            })
            .unwrap_or_default())
    }
}
