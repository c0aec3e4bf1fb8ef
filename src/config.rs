// src/config.rs
use governor::Quota;
use std::env;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use crate::address::DEFAULT_PORT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryBackend {
    Sqlite,
    Memory,
}

impl FromStr for RegistryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown registry backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,

    // Registry
    pub registry_backend: RegistryBackend,
    pub db_path: String,

    // Query engine
    pub query_timeout_secs: f64,
    pub default_query_port: u16,

    // Front end
    pub admin_token: Option<String>,
    pub query_period_secs: u64,
    pub query_burst_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            registry_backend: RegistryBackend::Sqlite,
            db_path: "querybot.sqlite3".to_string(),
            query_timeout_secs: 3.0,
            default_query_port: DEFAULT_PORT,
            admin_token: None,
            query_period_secs: 1,
            query_burst_limit: 10,
        }
    }
}

fn var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: var("PORT").unwrap_or(defaults.port),

            registry_backend: var("REGISTRY_BACKEND").unwrap_or(defaults.registry_backend),
            db_path: env::var("DB_PATH").unwrap_or(defaults.db_path),

            query_timeout_secs: var::<f64>("QUERY_TIMEOUT_SECS")
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .unwrap_or(defaults.query_timeout_secs),
            default_query_port: var("DEFAULT_QUERY_PORT").unwrap_or(defaults.default_query_port),

            admin_token: env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            query_period_secs: var::<u64>("QUERY_PERIOD_SECS")
                .filter(|p| *p > 0)
                .unwrap_or(defaults.query_period_secs),
            query_burst_limit: var("QUERY_BURST_LIMIT").unwrap_or(defaults.query_burst_limit),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.query_timeout_secs)
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// sqlx connection string for `db_path`.
    pub fn database_url(&self) -> String {
        if self.db_path.starts_with("sqlite:") {
            self.db_path.clone()
        } else {
            format!("sqlite://{}", self.db_path)
        }
    }

    pub fn query_quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.query_burst_limit).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(Duration::from_secs(self.query_period_secs.max(1)))
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_conventions() {
        let config = Config::default();
        assert_eq!(config.query_timeout(), Duration::from_secs(3));
        assert_eq!(config.default_query_port, 27015);
        assert_eq!(config.registry_backend, RegistryBackend::Sqlite);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn database_url_accepts_paths_and_urls() {
        let mut config = Config::default();
        config.db_path = "/var/lib/querybot.sqlite3".into();
        assert_eq!(config.database_url(), "sqlite:///var/lib/querybot.sqlite3");
        config.db_path = "sqlite::memory:".into();
        assert_eq!(config.database_url(), "sqlite::memory:");
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("Memory".parse::<RegistryBackend>(), Ok(RegistryBackend::Memory));
        assert!("postgres".parse::<RegistryBackend>().is_err());
    }

    #[test]
    fn zero_burst_does_not_panic() {
        let config = Config {
            query_burst_limit: 0,
            ..Config::default()
        };
        assert_eq!(config.query_quota().burst_size().get(), 1);
    }
}
