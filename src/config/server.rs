//! Process configuration from environment (optionally seeded from `.env`).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Postgres { url: String },
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub backend: Backend,
    pub bind_addr: SocketAddr,
    /// Collections JSON file.
    pub config_path: PathBuf,
    /// PostgreSQL schema holding one table per collection.
    pub data_schema: String,
    pub body_limit: usize,
    pub max_connections: u32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());
        let backend = match lookup("STORE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("memory") => Backend::Memory,
            Some("postgres") | Some("pg") => Backend::Postgres {
                url: database_url
                    .ok_or_else(|| ConfigError::Validation("STORE=postgres requires DATABASE_URL".into()))?,
            },
            Some(other) => return Err(ConfigError::Validation(format!("unknown STORE: {}", other))),
            None => match database_url {
                Some(url) => Backend::Postgres { url },
                None => Backend::Memory,
            },
        };

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.into())
            .parse()
            .map_err(|e| ConfigError::Validation(format!("BIND_ADDR: {}", e)))?;
        let body_limit = match lookup("BODY_LIMIT_BYTES") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Validation(format!("BODY_LIMIT_BYTES: not a number: {}", v)))?,
            None => DEFAULT_BODY_LIMIT,
        };
        let max_connections = match lookup("MAX_CONNECTIONS") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Validation(format!("MAX_CONNECTIONS: not a number: {}", v)))?,
            None => 5,
        };

        Ok(ServerConfig {
            backend,
            bind_addr,
            config_path: lookup("CONFIG_PATH").unwrap_or_else(|| "collections.json".into()).into(),
            data_schema: lookup("DATA_SCHEMA").unwrap_or_else(|| "public".into()),
            body_limit,
            max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_to_memory_store() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.backend, Backend::Memory);
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.body_limit, DEFAULT_BODY_LIMIT);
        assert_eq!(cfg.data_schema, "public");
    }

    #[test]
    fn database_url_selects_postgres() {
        let cfg = ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/shop")])).unwrap();
        assert_eq!(cfg.backend, Backend::Postgres { url: "postgres://localhost/shop".into() });
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("STORE", "postgres")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn explicit_memory_wins_over_database_url() {
        let cfg = ServerConfig::from_lookup(lookup(&[("STORE", "memory"), ("DATABASE_URL", "postgres://x/y")])).unwrap();
        assert_eq!(cfg.backend, Backend::Memory);
    }
}
