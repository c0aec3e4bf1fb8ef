// src/models/server.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RegistryError;

/// A queryable game server address. The hostname is resolved by the network
/// layer at query time, never here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub hostname: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self { hostname: hostname.into(), port }
    }

    /// Builds an endpoint from an untrusted integer port, as submitted by a
    /// front end form.
    pub fn checked(hostname: impl Into<String>, port: i64) -> Result<Self, RegistryError> {
        let hostname = hostname.into();
        let hostname = hostname.trim();
        if hostname.is_empty() {
            return Err(RegistryError::InvalidHostname);
        }
        let port = u16::try_from(port).map_err(|_| RegistryError::InvalidPort(port))?;
        Ok(Self::new(hostname, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hostname.contains(':') {
            write!(f, "[{}]:{}", self.hostname, self.port)
        } else {
            write!(f, "{}:{}", self.hostname, self.port)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedServer {
    pub community_id: u64,
    pub name: String,
    pub endpoint: Endpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Info,
    PlayerList,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::PlayerList => write!(f, "players"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub protocol: u8,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub app_id: u16,
    pub player_count: u8,
    pub max_players: u8,
    pub bot_count: u8,
    pub server_type: char,
    pub platform: char,
    pub password_protected: bool,
    pub vac_secured: bool,
    pub version: String,
    // Extra data block, only sent by newer Source servers.
    pub game_port: Option<u16>,
    pub steam_id: Option<u64>,
    pub keywords: Option<String>,
    pub game_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub index: u8,
    pub name: String,
    pub score: i32,
    pub duration_secs: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum QueryResponse {
    Info(ServerInfo),
    PlayerList(Vec<Player>),
}

/// A successful query together with the endpoint it was run against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    pub endpoint: Endpoint,
    pub response: QueryResponse,
}

/// Renders a connected duration as `MM:SS`, or `H:MM:SS` past the hour.
pub fn format_duration(duration_secs: f32) -> String {
    let total = if duration_secs.is_finite() && duration_secs > 0.0 {
        duration_secs as u64
    } else {
        0
    };
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
