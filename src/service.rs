// src/service.rs
use log::debug;
use std::sync::Arc;

use crate::address;
use crate::error::ServiceError;
use crate::models::{Endpoint, QueryKind, QueryReport};
use crate::query::QueryClient;
use crate::storage::ServerRegistry;

/// Turns a free-text target (a registered name or a literal address) into a
/// query result.
#[derive(Clone)]
pub struct QueryService {
    registry: Arc<dyn ServerRegistry>,
    client: QueryClient,
    default_port: u16,
}

impl QueryService {
    pub fn new(registry: Arc<dyn ServerRegistry>, client: QueryClient, default_port: u16) -> Self {
        Self { registry, client, default_port }
    }

    pub fn registry(&self) -> &Arc<dyn ServerRegistry> {
        &self.registry
    }

    /// A name registered in this community wins; anything else is parsed as
    /// `host[:port]`. Other communities' registrations are never consulted.
    pub async fn resolve(&self, community_id: u64, input: &str) -> Result<Endpoint, ServiceError> {
        let input = input.trim();
        if let Some(server) = self.registry.get(community_id, input).await? {
            debug!("Resolved '{}' via registry of community {}", input, community_id);
            return Ok(server.endpoint);
        }
        address::parse(input, self.default_port).map_err(|source| ServiceError::InvalidAddress {
            input: input.to_string(),
            source,
        })
    }

    pub async fn query(
        &self,
        community_id: u64,
        input: &str,
        kind: QueryKind,
    ) -> Result<QueryReport, ServiceError> {
        let endpoint = self.resolve(community_id, input).await?;
        match self.client.query(&endpoint, kind).await {
            Ok(response) => Ok(QueryReport { endpoint, response }),
            Err(source) => Err(ServiceError::Query { endpoint, source }),
        }
    }
}
