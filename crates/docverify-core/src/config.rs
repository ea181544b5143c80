//! Service configuration from the environment.
//!
//! Reads:
//! - DOCVERIFY_BIND (optional, default: "127.0.0.1:8080")
//! - DOCVERIFY_DB_URL (optional, default: "mem://")
//! - DOCVERIFY_PERSIST_ATTEMPTS (optional, default: 3)
//! - DOCVERIFY_PERSIST_BACKOFF_MS (optional, default: 50)
//! - DOCVERIFY_SEED (optional): JSON file of records to import at startup
//!
//! Remote SurrealDB credentials are read separately by
//! `docverify_state::DbConfig::from_env`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::service::RetryPolicy;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DB_URL: &str = "mem://";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewConfig {
    pub bind: SocketAddr,
    pub db_url: String,
    pub retry: RetryPolicy,
    pub seed: Option<PathBuf>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_url: DEFAULT_DB_URL.to_string(),
            retry: RetryPolicy::default(),
            seed: None,
        }
    }
}

impl ReviewConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(bind) = get("DOCVERIFY_BIND") {
            config.bind = bind.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    var: "DOCVERIFY_BIND",
                    value: bind.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(url) = get("DOCVERIFY_DB_URL") {
            config.db_url = url.trim().to_string();
        }
        if let Some(raw) = get("DOCVERIFY_PERSIST_ATTEMPTS") {
            let attempts: u32 = parse_number("DOCVERIFY_PERSIST_ATTEMPTS", &raw)?;
            if attempts == 0 {
                return Err(ConfigError::Invalid {
                    var: "DOCVERIFY_PERSIST_ATTEMPTS",
                    value: raw,
                    reason: "must be at least 1".to_string(),
                });
            }
            config.retry.max_attempts = attempts;
        }
        if let Some(raw) = get("DOCVERIFY_PERSIST_BACKOFF_MS") {
            let ms: u64 = parse_number("DOCVERIFY_PERSIST_BACKOFF_MS", &raw)?;
            config.retry.backoff = Duration::from_millis(ms);
        }
        config.seed = get("DOCVERIFY_SEED").map(PathBuf::from);

        Ok(config)
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ReviewConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ReviewConfig::default());
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff, Duration::from_millis(50));
    }

    #[test]
    fn reads_overrides() {
        let config = ReviewConfig::from_lookup(lookup(&[
            ("DOCVERIFY_BIND", "0.0.0.0:9000"),
            ("DOCVERIFY_DB_URL", "surrealkv:///var/lib/docverify"),
            ("DOCVERIFY_PERSIST_ATTEMPTS", "5"),
            ("DOCVERIFY_PERSIST_BACKOFF_MS", "10"),
            ("DOCVERIFY_SEED", "/etc/docverify/seed.json"),
            ("SURREALDB_ENDPOINT", "ignored"),
        ]))
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.db_url, "surrealkv:///var/lib/docverify");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff, Duration::from_millis(10));
        assert_eq!(config.seed, Some(PathBuf::from("/etc/docverify/seed.json")));
    }

    #[test]
    fn rejects_bad_values() {
        let err = ReviewConfig::from_lookup(lookup(&[("DOCVERIFY_PERSIST_ATTEMPTS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("DOCVERIFY_PERSIST_ATTEMPTS"));

        assert!(ReviewConfig::from_lookup(lookup(&[("DOCVERIFY_BIND", "nowhere")])).is_err());
        assert!(
            ReviewConfig::from_lookup(lookup(&[("DOCVERIFY_PERSIST_BACKOFF_MS", "-1")])).is_err()
        );
    }
}
