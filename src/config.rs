use std::{env, str::FromStr};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payments: PaymentsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Razorpay credentials. Payments that need the provider are refused when
/// either key is absent.
#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    pub api_url: String,
    pub currency: String,
}

impl PaymentsConfig {
    /// `(key_id, key_secret)` when both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.key_id.as_deref()?, self.key_secret.as_deref()?))
    }
}

/// Reads the configuration from the process environment. Call
/// `bootstrap::init_env` first so `.env` values are visible.
pub fn load() -> Result<AppConfig> {
    Ok(AppConfig {
        server: ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or("0.0.0.0".to_string()),
            port: parse_or("SERVER_PORT", 8001)?,
        },
        database: DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
        },
        auth: AuthConfig {
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
        },
        payments: PaymentsConfig {
            key_id: non_empty("RAZORPAY_KEY_ID"),
            key_secret: non_empty("RAZORPAY_KEY_SECRET"),
            api_url: env::var("RAZORPAY_API_URL")
                .unwrap_or("https://api.razorpay.com".to_string()),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or("INR".to_string()),
        },
    })
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payments_need_both_keys() {
        let mut config = PaymentsConfig {
            key_id: Some("rzp_test".into()),
            key_secret: None,
            api_url: "https://api.razorpay.com".into(),
            currency: "INR".into(),
        };
        assert_eq!(config.credentials(), None);

        config.key_secret = Some("secret".into());
        assert_eq!(config.credentials(), Some(("rzp_test", "secret")));
    }
}
