use std::{collections::HashSet, path::Path};

use alloy::primitives::{
    address,
    utils::{parse_units, ParseUnits},
    Address, Bytes, U256,
};
use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Base-token placeholder the bridge uses for the source chain's gas token.
pub const NATIVE_TOKEN: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Evm,
    Cosmos,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainProfile {
    pub key: String,
    pub name: String,
    pub kind: ChainKind,
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub rpc_urls: Vec<String>,
    pub explorer_tx_url: Option<String>,
    pub bech32_prefix: Option<String>,
    /// Env var prefix holding per-wallet receivers, read as `<receiver_env>_<index>`.
    pub receiver_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetProfile {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(default)]
    pub native: bool,
    pub base_token: Address,
    /// Hex address on EVM destinations, bech32 contract address on Cosmos ones.
    pub quote_token: String,
    #[serde(default)]
    pub token_path: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteProfile {
    pub key: String,
    pub label: String,
    pub source: String,
    pub destination: String,
    pub channel_id: u32,
    pub asset: AssetProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeSettings {
    pub contract: Address,
    pub graphql_endpoint: String,
    pub bridge_explorer_url: String,
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_indexer_attempts")]
    pub indexer_attempts: u32,
    #[serde(default = "default_indexer_interval")]
    pub indexer_interval_secs: u64,
    #[serde(default = "default_indexer_request_timeout")]
    pub indexer_request_timeout_secs: u64,
    #[serde(default = "default_tx_delay")]
    pub tx_delay_secs: u64,
    #[serde(default = "default_timeout_window")]
    pub timeout_window_secs: u64,
    #[serde(default = "default_priority_fee")]
    pub priority_fee_gwei: String,
}

fn default_confirmation_timeout() -> u64 {
    300
}

fn default_indexer_attempts() -> u32 {
    50
}

fn default_indexer_interval() -> u64 {
    5
}

fn default_indexer_request_timeout() -> u64 {
    10
}

fn default_tx_delay() -> u64 {
    10
}

fn default_timeout_window() -> u64 {
    86_400
}

fn default_priority_fee() -> String {
    "1.5".to_string()
}

impl BridgeSettings {
    /// Priority fee in wei.
    pub fn priority_fee(&self) -> Result<u128, ConfigError> {
        let fee = match parse_units(&self.priority_fee_gwei, "gwei") {
            Ok(ParseUnits::U256(fee)) => fee,
            _ => {
                return Err(ConfigError::Validation(format!(
                    "priority_fee_gwei {:?} is not a non-negative gwei amount",
                    self.priority_fee_gwei
                )))
            }
        };
        u128::try_from(fee)
            .map_err(|_| ConfigError::Validation("priority_fee_gwei is too large".into()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bridge: BridgeSettings,
    pub chains: Vec<ChainProfile>,
    pub routes: Vec<RouteProfile>,
}

impl Config {
    /// Loads the config at `path`, or the built-in table when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?),
            None => Self::from_toml(DEFAULT_CONFIG),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn chain(&self, key: &str) -> Option<&ChainProfile> {
        self.chains.iter().find(|c| c.key == key)
    }

    pub fn route(&self, key: &str) -> Option<&RouteProfile> {
        self.routes.iter().find(|r| r.key == key)
    }

    /// Source and destination profiles of a route. Both exist after validation.
    pub fn endpoints(
        &self,
        route: &RouteProfile,
    ) -> Result<(&ChainProfile, &ChainProfile), ConfigError> {
        let lookup = |key: &str| {
            self.chain(key).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "route {} references unknown chain {key}",
                    route.key
                ))
            })
        };
        Ok((lookup(&route.source)?, lookup(&route.destination)?))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routes.is_empty() {
            return Err(ConfigError::Validation("no routes configured".into()));
        }
        self.bridge.priority_fee()?;
        if self.bridge.indexer_attempts == 0 {
            return Err(ConfigError::Validation(
                "indexer_attempts must be at least 1".into(),
            ));
        }

        let mut chain_keys = HashSet::new();
        for chain in &self.chains {
            if !chain_keys.insert(chain.key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate chain key {}",
                    chain.key
                )));
            }
        }

        let mut route_keys = HashSet::new();
        for route in &self.routes {
            if !route_keys.insert(route.key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate route key {}",
                    route.key
                )));
            }
            let (source, destination) = self.endpoints(route)?;

            if source.kind != ChainKind::Evm || source.chain_id.is_none() {
                return Err(ConfigError::Validation(format!(
                    "route {}: source chain {} must be an EVM chain with a chain_id",
                    route.key, source.key
                )));
            }
            if source.rpc_urls.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "route {}: source chain {} has no rpc_urls",
                    route.key, source.key
                )));
            }
            if route.asset.native && route.asset.base_token != NATIVE_TOKEN {
                return Err(ConfigError::Validation(format!(
                    "route {}: native asset must use base_token {NATIVE_TOKEN}",
                    route.key
                )));
            }
            if destination.kind == ChainKind::Cosmos
                && (destination.bech32_prefix.is_none() || destination.receiver_env.is_none())
            {
                return Err(ConfigError::Validation(format!(
                    "route {}: cosmos destination {} needs bech32_prefix and receiver_env",
                    route.key, destination.key
                )));
            }
            quote_token_bytes(destination, &route.asset.quote_token).map_err(|e| match e {
                ConfigError::Validation(msg) => {
                    ConfigError::Validation(format!("route {}: {msg}", route.key))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Quote token as the destination chain spells it: raw address bytes on EVM,
/// the bech32 string on Cosmos.
pub fn quote_token_bytes(
    destination: &ChainProfile,
    quote_token: &str,
) -> Result<Bytes, ConfigError> {
    match destination.kind {
        ChainKind::Evm => quote_token
            .parse::<Address>()
            .map(|a| Bytes::copy_from_slice(a.as_slice()))
            .map_err(|e| {
                ConfigError::Validation(format!("quote_token {quote_token} is not an address: {e}"))
            }),
        ChainKind::Cosmos => {
            let prefix = destination.bech32_prefix.as_deref().unwrap_or_default();
            if !quote_token.starts_with(&format!("{prefix}1")) {
                return Err(ConfigError::Validation(format!(
                    "quote_token {quote_token} does not carry the {prefix} prefix"
                )));
            }
            Ok(Bytes::copy_from_slice(quote_token.as_bytes()))
        }
    }
}

impl AssetProfile {
    pub fn token_path(&self) -> U256 {
        U256::from(self.token_path)
    }
}
