use std::env;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool_size: u32,
    /// Book an `out` ledger entry per product when an order is created.
    pub reserve_stock: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let pool_size = parse_or(&lookup, "DB_POOL_SIZE", 10u32)?;
        if pool_size == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_POOL_SIZE",
                value: "0".to_string(),
            });
        }
        let reserve_stock = match lookup("RESERVE_STOCK_ON_ORDER") {
            None => true,
            Some(v) => parse_flag(&v).ok_or(ConfigError::Invalid {
                name: "RESERVE_STOCK_ON_ORDER",
                value: v,
            })?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            pool_size,
            reserve_stock,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://db")])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.pool_size, 10);
        assert!(config.reserve_stock);
    }

    #[test]
    fn missing_database_url_is_reported() {
        assert_eq!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn bad_port_is_reported_with_its_value() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("PORT", "eighty")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "PORT has invalid value 'eighty'");
    }

    #[test]
    fn reservation_can_be_switched_off() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "x"),
            ("RESERVE_STOCK_ON_ORDER", "false"),
            ("DB_POOL_SIZE", "4"),
        ]))
        .unwrap();
        assert!(!config.reserve_stock);
        assert_eq!(config.pool_size, 4);
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("DB_POOL_SIZE", "0")])),
            Err(ConfigError::Invalid { name: "DB_POOL_SIZE", .. })
        ));
    }
}
