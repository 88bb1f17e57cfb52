//! Process configuration read from the environment.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `DATABASE_URL` | unset | Postgres directory and ledger; both in-memory when unset |
//! | `LEDGER_PARTITION` | `1` | ledger tag stamped on accounts and transfers |
//! | `SERIALIZE_DEBITS` | `false` | per-account lock around read-check-submit |

use std::net::SocketAddr;

use thiserror::Error;

use ledgerbank_banking::BankingOptions;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LEDGER_PARTITION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub ledger_partition: u32,
    pub serialize_debits: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    key: "BIND_ADDR",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        };

        let ledger_partition = match get("LEDGER_PARTITION") {
            Some(raw) => parse_partition(&raw)?,
            None => DEFAULT_LEDGER_PARTITION,
        };

        let serialize_debits = match get("SERIALIZE_DEBITS") {
            Some(raw) => parse_bool("SERIALIZE_DEBITS", &raw)?,
            None => false,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            ledger_partition,
            serialize_debits,
        })
    }

    pub fn banking_options(&self) -> BankingOptions {
        BankingOptions {
            serialize_debits: self.serialize_debits,
        }
    }
}

fn parse_partition(raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: "LEDGER_PARTITION",
        value: raw.to_string(),
        reason,
    };
    let partition: u32 = raw.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    if partition == 0 {
        return Err(invalid("partition 0 is reserved by the engine".to_string()));
    }
    Ok(partition)
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
