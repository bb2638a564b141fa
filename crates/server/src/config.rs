//! Process configuration read from the environment (and `.env` via dotenvy).

use std::{fmt::Display, str::FromStr, time::Duration};

use secrecy::SecretString;
use services::services::config::{
    DEFAULT_ENTRY_TIMEOUT_POLL, DEFAULT_MINUTES_PER_CUSTOMER, QueueSettings,
};
use thiserror::Error;
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "barbershop-dev-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("{0} must be set")]
    Missing(&'static str),
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: SecretString,
    pub queue: QueueSettings,
    pub entry_timeout_poll: Duration,
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let jwt_secret = match var("AUTH_JWT_SECRET") {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => {
                warn!("AUTH_JWT_SECRET not set, using the insecure development secret");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing("AUTH_JWT_SECRET")),
        };

        let minutes_per_customer: i32 = parse_or(
            &var,
            "QUEUE_MINUTES_PER_CUSTOMER",
            DEFAULT_MINUTES_PER_CUSTOMER,
        )?;
        if minutes_per_customer < 1 {
            return Err(ConfigError::Invalid {
                key: "QUEUE_MINUTES_PER_CUSTOMER",
                message: "must be at least 1".to_string(),
            });
        }

        let poll_seconds: u64 = parse_or(
            &var,
            "ENTRY_TIMEOUT_POLL_SECONDS",
            DEFAULT_ENTRY_TIMEOUT_POLL.as_secs(),
        )?;
        if poll_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "ENTRY_TIMEOUT_POLL_SECONDS",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&var, "PORT", 3000)?,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://barbershop.db".to_string()),
            jwt_secret: SecretString::from(jwt_secret),
            queue: QueueSettings {
                minutes_per_customer,
            },
            entry_timeout_poll: Duration::from_secs(poll_seconds),
            sentry_dsn: var("SENTRY_DSN"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.database_url, "sqlite://barbershop.db");
        assert_eq!(config.queue.minutes_per_customer, 15);
        assert_eq!(config.entry_timeout_poll, Duration::from_secs(10));
        assert!(config.sentry_dsn.is_none());
        assert_eq!(config.jwt_secret.expose_secret(), DEV_JWT_SECRET);
    }

    #[test]
    fn values_are_read_and_validated() {
        let loaded = config(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("AUTH_JWT_SECRET", "s3cret"),
            ("QUEUE_MINUTES_PER_CUSTOMER", "20"),
            ("SENTRY_DSN", "  "),
        ])
        .unwrap();
        assert_eq!(loaded.bind_address(), "0.0.0.0:8080");
        assert_eq!(loaded.queue.minutes_per_customer, 20);
        assert_eq!(loaded.jwt_secret.expose_secret(), "s3cret");
        assert!(loaded.sentry_dsn.is_none());

        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("QUEUE_MINUTES_PER_CUSTOMER", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("ENTRY_TIMEOUT_POLL_SECONDS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
