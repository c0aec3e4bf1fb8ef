// src/storage/sqlite.rs
use async_trait::async_trait;
use log::{debug, error, info};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use super::{validate, ServerRegistry};
use crate::error::RegistryError;
use crate::models::{Endpoint, NamedServer};

type ServerRow = (i64, String, String, i64);

const SELECT: &str = r#"SELECT "guild_id", "name", "hostname", "port" FROM "server""#;

/// Durable registry backed by one sqlite table keyed on `(guild_id, name)`.
/// The primary key makes concurrent inserts of the same name race-free.
pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    /// Opens (creating if missing) the database at `url` and applies the
    /// schema.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        info!("Opened server registry at {}", url);
        Self::new(pool).await
    }

    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_server(row: ServerRow) -> Result<NamedServer, RegistryError> {
        let (guild_id, name, hostname, port) = row;
        Ok(NamedServer {
            community_id: guild_id as u64,
            name,
            endpoint: Endpoint::checked(hostname, port)?,
        })
    }

    fn rows_to_servers(rows: Vec<ServerRow>) -> Result<Vec<NamedServer>, RegistryError> {
        rows.into_iter().map(Self::row_to_server).collect()
    }
}

fn storage_error(context: &str, e: sqlx::Error) -> RegistryError {
    error!("{}: {}", context, e);
    RegistryError::Storage(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl ServerRegistry for SqliteRegistry {
    async fn add(
        &self,
        community_id: u64,
        name: &str,
        endpoint: Endpoint,
    ) -> Result<NamedServer, RegistryError> {
        validate(name, &endpoint)?;

        let result = sqlx::query(
            r#"INSERT INTO "server" ("guild_id", "name", "hostname", "port") VALUES (?, ?, ?, ?)"#,
        )
        .bind(community_id as i64)
        .bind(name)
        .bind(&endpoint.hostname)
        .bind(endpoint.port as i64)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(NamedServer {
                community_id,
                name: name.to_string(),
                endpoint,
            }),
            Err(e) if is_unique_violation(&e) => {
                debug!("Server '{}' already registered in community {}", name, community_id);
                Err(RegistryError::DuplicateName(name.to_string()))
            }
            Err(e) => Err(storage_error("Failed to add server", e)),
        }
    }

    async fn remove(&self, community_id: u64, name: &str) -> Result<(), RegistryError> {
        let result = sqlx::query(r#"DELETE FROM "server" WHERE "guild_id" = ? AND "name" = ?"#)
            .bind(community_id as i64)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to remove server", e))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn get(&self, community_id: u64, name: &str) -> Result<Option<NamedServer>, RegistryError> {
        let row = sqlx::query_as::<_, ServerRow>(&format!(
            r#"{} WHERE "guild_id" = ? AND "name" = ?"#,
            SELECT
        ))
        .bind(community_id as i64)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to look up server", e))?;

        row.map(Self::row_to_server).transpose()
    }

    async fn list(&self, community_id: u64) -> Result<Vec<NamedServer>, RegistryError> {
        let rows = sqlx::query_as::<_, ServerRow>(&format!(
            r#"{} WHERE "guild_id" = ? ORDER BY "name""#,
            SELECT
        ))
        .bind(community_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to list servers", e))?;

        Self::rows_to_servers(rows)
    }

    async fn search_by_prefix(
        &self,
        community_id: u64,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<NamedServer>, RegistryError> {
        // lower() only folds ASCII, matching the in-memory backend.
        let rows = sqlx::query_as::<_, ServerRow>(&format!(
            r#"{} WHERE "guild_id" = ? AND lower(substr("name", 1, length(?))) = lower(?)
               ORDER BY "name" LIMIT ?"#,
            SELECT
        ))
        .bind(community_id as i64)
        .bind(prefix)
        .bind(prefix)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to search servers", e))?;

        Self::rows_to_servers(rows)
    }
}
