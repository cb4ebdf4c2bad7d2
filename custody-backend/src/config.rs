use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::flow::{ChainId, FlowAddress};
use crate::templates::Token;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not valid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub chain_id: ChainId,
    pub port: u16,
    pub database_url: String,
    /// Listener cursor; a separate file so its lock never covers records
    pub status_database_url: String,
    pub access_api_url: String,
    pub worker_count: usize,
    pub job_queue_capacity: usize,
    pub events_interval: Duration,
    pub events_max_blocks: u64,
    /// Tokens enabled in addition to FlowToken
    pub enabled_tokens: Vec<Token>,
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chain_id = parsed(&lookup, "FLOW_WALLET_CHAIN_ID", ChainId::Emulator)?;
        let worker_count: usize = parsed(&lookup, "FLOW_WALLET_WORKER_COUNT", 100)?;
        let job_queue_capacity: usize = parsed(&lookup, "FLOW_WALLET_JOB_QUEUE_CAPACITY", 1000)?;

        if worker_count == 0 {
            return Err(invalid("FLOW_WALLET_WORKER_COUNT", "must be at least 1"));
        }
        if job_queue_capacity == 0 {
            return Err(invalid("FLOW_WALLET_JOB_QUEUE_CAPACITY", "must be at least 1"));
        }

        Ok(Self {
            chain_id,
            port: parsed(&lookup, "PORT", 3000)?,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "./.db/custody.db".to_string()),
            status_database_url: lookup("LISTENER_STATUS_DATABASE_URL")
                .unwrap_or_else(|| "./.db/listener-status.db".to_string()),
            access_api_url: lookup("FLOW_WALLET_ACCESS_API_HOST")
                .unwrap_or_else(|| "http://localhost:8888".to_string()),
            worker_count,
            job_queue_capacity,
            events_interval: Duration::from_millis(parsed(
                &lookup,
                "FLOW_WALLET_EVENTS_INTERVAL_MS",
                10_000,
            )?),
            events_max_blocks: parsed(&lookup, "FLOW_WALLET_EVENTS_MAX_BLOCKS", 100)?,
            enabled_tokens: match lookup("FLOW_WALLET_ENABLED_TOKENS") {
                Some(value) => parse_tokens(&value, chain_id)?,
                None => Vec::new(),
            },
        })
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.into(),
    }
}

fn parsed<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(name, e.to_string())),
        _ => Ok(default),
    }
}

/// `Name:0xaddress,Name:0xaddress`
fn parse_tokens(value: &str, chain: ChainId) -> Result<Vec<Token>, ConfigError> {
    let mut tokens = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, address) = entry
            .split_once(':')
            .ok_or_else(|| invalid("FLOW_WALLET_ENABLED_TOKENS", format!("expected Name:address, got {}", entry)))?;
        let address = FlowAddress::from_str(address.trim())
            .map_err(|e| invalid("FLOW_WALLET_ENABLED_TOKENS", e))?;
        if !address.is_valid_for(chain) {
            return Err(invalid(
                "FLOW_WALLET_ENABLED_TOKENS",
                format!("{} is not an address on {}", address, chain),
            ));
        }
        tokens.push(Token::new(name.trim(), address));
    }
    Ok(tokens)
}
