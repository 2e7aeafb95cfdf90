use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use rand::RngCore;
use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub mongo_url: String,
    pub mongo_db: String,
    pub request_timeout: Duration,
    pub token_secret: Vec<u8>,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let token_secret = read_secret("TOKEN_SECRET")
            .map(String::into_bytes)
            .unwrap_or_else(|| {
                warn!("TOKEN_SECRET not set, tokens will not survive a restart");
                random_secret()
            });

        Ok(Self {
            port: try_load("RUST_PORT", "8000")?,
            mongo_url: try_load("MONGO_URL", "mongodb://localhost:27017")?,
            mongo_db: try_load("MONGO_DB", "restaurant")?,
            request_timeout: Duration::from_secs(try_load("REQUEST_TIMEOUT_SECS", "100")?),
            token_secret,
            access_token_ttl: chrono::Duration::hours(try_load("ACCESS_TOKEN_TTL_HOURS", "24")?),
            refresh_token_ttl: chrono::Duration::hours(try_load(
                "REFRESH_TOKEN_TTL_HOURS",
                "168",
            )?),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            mongo_url: "mongodb://localhost:27017".to_string(),
            mongo_db: "restaurant".to_string(),
            request_timeout: Duration::from_secs(100),
            token_secret: random_secret(),
            access_token_ttl: chrono::Duration::hours(24),
            refresh_token_ttl: chrono::Duration::hours(168),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value {value:?}: {e}"))
}

/// Docker secret first, then an environment variable of the same name.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) => Some(secret.trim().to_string()),
        Err(_) => var(secret_name).filter(|secret| !secret.is_empty()),
    }
}

fn random_secret() -> Vec<u8> {
    let mut bytes = vec![0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_load_default() {
        let port: u16 = try_load("RESTAURANT_TEST_UNSET_PORT", "8123").unwrap();
        assert_eq!(port, 8123);
    }

    #[test]
    fn test_try_load_rejects_garbage() {
        let result: anyhow::Result<u16> = try_load("RESTAURANT_TEST_UNSET_PORT", "eighty");
        assert!(result.is_err());
    }

    #[test]
    fn test_random_secrets_differ() {
        assert_eq!(random_secret().len(), 32);
        assert_ne!(random_secret(), random_secret());
    }
}
