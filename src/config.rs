use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use ethers::types::Address;

const DEFAULT_ONMETA_URL: &str = "https://stg.api.onmeta.in/v1/offramp/orders/create";

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub contract_address: Address,
    pub poll_interval: Duration,
    pub lookback_blocks: u64,
    pub ledger_capacity: usize,
    pub rpc_timeout: Duration,
    pub bind_addr: SocketAddr,
    pub offramp: Option<OfframpConfig>,
}

#[derive(Debug, Clone)]
pub struct OfframpConfig {
    pub api_url: String,
    pub api_key: String,
}

impl Config {
    /// Read and validate all configuration from the environment. Any
    /// invalid value is a startup failure, never a runtime condition.
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("RPC_URL").context("RPC_URL must be set")?;

        let contract_address: Address = std::env::var("CONTRACT_ADDRESS")
            .context("CONTRACT_ADDRESS must be set")?
            .parse()
            .context("CONTRACT_ADDRESS is not a valid address")?;

        let poll_interval = Duration::from_secs(env_parse("POLL_INTERVAL_SECS", 5)?);
        ensure!(!poll_interval.is_zero(), "POLL_INTERVAL_SECS must be at least 1");

        let lookback_blocks: u64 = env_parse("LOOKBACK_BLOCKS", 100)?;

        let ledger_capacity: usize = env_parse("LEDGER_CAPACITY", 100)?;
        ensure!(ledger_capacity > 0, "LEDGER_CAPACITY must be at least 1");

        let rpc_timeout = Duration::from_secs(env_parse("RPC_TIMEOUT_SECS", 10)?);
        ensure!(!rpc_timeout.is_zero(), "RPC_TIMEOUT_SECS must be at least 1");

        let port: u16 = env_parse("PORT", 3001)?;
        let bind_addr = SocketAddr::from(([127, 0, 0, 1], port));

        // The off-ramp is optional: no key means payouts are only recorded,
        // not forwarded for settlement.
        let offramp = match std::env::var("ONMETA_API_KEY") {
            Ok(api_key) if !api_key.is_empty() => Some(OfframpConfig {
                api_url: std::env::var("ONMETA_API_URL")
                    .unwrap_or_else(|_| DEFAULT_ONMETA_URL.to_string()),
                api_key,
            }),
            _ => None,
        };

        Ok(Config {
            rpc_url,
            contract_address,
            poll_interval,
            lookback_blocks,
            ledger_capacity,
            rpc_timeout,
            bind_addr,
            offramp,
        })
    }
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value")),
        Err(_) => Ok(default),
    }
}
