use std::collections::HashMap;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    /// Upper bound on rows accepted per request.
    pub max_operations: usize,
    pub csv_delimiter: u8,
}

/// Decoded CSV bytes allowed per accepted row, plus room for the header.
const CSV_BYTES_PER_ROW: usize = 256;
const CSV_HEADER_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Cap on a decoded CSV body, derived from `max_operations`.
    pub fn max_csv_bytes(&self) -> usize {
        self.max_operations
            .saturating_mul(CSV_BYTES_PER_ROW)
            .saturating_add(CSV_HEADER_BYTES)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let bind_addr = env_map
            .get("BIND_ADDR")
            .map(|s| s.as_str())
            .unwrap_or("127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "BIND_ADDR".to_string(),
                    "must be an IP address".to_string(),
                )
            })?;

        let max_operations = match env_map
            .get("MAX_OPERATIONS")
            .map(|s| s.as_str())
            .unwrap_or("200000")
            .parse::<usize>()
        {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "MAX_OPERATIONS".to_string(),
                    "must be a positive integer".to_string(),
                ))
            }
        };

        let csv_delimiter = match env_map
            .get("CSV_DELIMITER")
            .map(|s| s.as_str())
            .unwrap_or(",")
            .as_bytes()
        {
            [b] if b.is_ascii() && *b != b'"' && *b != b'\n' => *b,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "CSV_DELIMITER".to_string(),
                    "must be a single ASCII character".to_string(),
                ))
            }
        };

        Ok(Config {
            port,
            bind_addr,
            max_operations,
            csv_delimiter,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            max_operations: 200_000,
            csv_delimiter: b',',
        }
    }
}
