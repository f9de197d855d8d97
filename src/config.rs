//! Network and signer configuration
//!
//! A [`NetworkConfig`] is built once and never mutated; switching networks means
//! building a new one (and a new signer). Tunables come from a JSON file or from
//! `COW_*` environment variables.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::allowance::{PollConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLLING_DELAY_MS};
use crate::eip712::{Eip712Domain, SigningScheme};
use crate::error::{Result, SignerError};
use crate::types::Address;

/// GPv2 settlement contract, the EIP-712 verifying contract on every network
pub const SETTLEMENT_CONTRACT: Address = Address([
    0x90, 0x08, 0xd1, 0x9f, 0x58, 0xaa, 0xbd, 0x9e, 0xd0, 0xd6, 0x09, 0x71, 0x56, 0x5a, 0xa8, 0x51,
    0x05, 0x60, 0xab, 0x41,
]);

/// GPv2 vault relayer, the spender that needs the ERC-20 allowance
pub const VAULT_RELAYER: Address = Address([
    0xc9, 0x2e, 0x8b, 0xdf, 0x79, 0xf0, 0x50, 0x7f, 0x65, 0xa3, 0x92, 0xb0, 0xab, 0x46, 0x67, 0x71,
    0x6b, 0xfe, 0x01, 0x10,
]);

pub const PROD_HOST: &str = "https://api.cow.fi";
pub const BARN_HOST: &str = "https://barn.api.cow.fi";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Mainnet,
    Xdai,
    ArbitrumOne,
    Base,
    Sepolia,
}

impl Network {
    pub const ALL: [Network; 5] = [
        Network::Mainnet,
        Network::Xdai,
        Network::ArbitrumOne,
        Network::Base,
        Network::Sepolia,
    ];

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Xdai => 100,
            Network::ArbitrumOne => 42161,
            Network::Base => 8453,
            Network::Sepolia => 11_155_111,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Xdai => "xdai",
            Network::ArbitrumOne => "arbitrum_one",
            Network::Base => "base",
            Network::Sepolia => "sepolia",
        }
    }

    /// Path segment the orderbook API uses for this network
    pub fn api_network_id(&self) -> &'static str {
        match self {
            Network::ArbitrumOne => "arbitrum-one",
            other => other.name(),
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|n| n.chain_id() == chain_id)
            .ok_or_else(|| SignerError::UnknownNetwork(format!("chain id {}", chain_id)))
    }
}

impl FromStr for Network {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|n| n.name() == wanted)
            .ok_or_else(|| SignerError::UnknownNetwork(s.to_string()))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Orderbook deployment: production or the staging "barn"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderbookEnv {
    #[default]
    Prod,
    Barn,
}

impl OrderbookEnv {
    pub fn host(&self) -> &'static str {
        match self {
            OrderbookEnv::Prod => PROD_HOST,
            OrderbookEnv::Barn => BARN_HOST,
        }
    }
}

impl FromStr for OrderbookEnv {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "prod" => Ok(OrderbookEnv::Prod),
            "barn" => Ok(OrderbookEnv::Barn),
            _ => Err(SignerError::TypeMismatch {
                field: "env".to_string(),
                expected: format!("prod|barn, got {}", s),
            }),
        }
    }
}

/// Chain id, contracts and RPC endpoint for one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    network: Network,
    chain_id: u64,
    verifying_contract: Address,
    vault_relayer: Address,
    rpc_url: Url,
    env: OrderbookEnv,
}

impl NetworkConfig {
    pub fn new(network: Network, rpc_url: &str) -> Result<Self> {
        if rpc_url.trim().is_empty() {
            return Err(SignerError::ConfigurationMissing {
                field: "rpc_url".to_string(),
            });
        }
        Ok(Self {
            network,
            chain_id: network.chain_id(),
            verifying_contract: SETTLEMENT_CONTRACT,
            vault_relayer: VAULT_RELAYER,
            rpc_url: Url::parse(rpc_url.trim())?,
            env: OrderbookEnv::default(),
        })
    }

    pub fn with_env(self, env: OrderbookEnv) -> Self {
        Self { env, ..self }
    }

    pub fn with_contracts(self, verifying_contract: Address, vault_relayer: Address) -> Self {
        Self {
            verifying_contract,
            vault_relayer,
            ..self
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn verifying_contract(&self) -> &Address {
        &self.verifying_contract
    }

    pub fn vault_relayer(&self) -> &Address {
        &self.vault_relayer
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    pub fn env(&self) -> OrderbookEnv {
        self.env
    }

    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain::gnosis_protocol(self.chain_id, self.verifying_contract)
    }

    /// e.g. `https://api.cow.fi/mainnet/api/v1`
    pub fn orderbook_base_url(&self) -> String {
        format!("{}/{}/api/v1", self.env.host(), self.network.api_network_id())
    }
}

/// Serializable signer settings (`config.json` or `COW_*` variables)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfig {
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default)]
    pub env: OrderbookEnv,
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default)]
    pub verifying_contract: Option<Address>,
    #[serde(default)]
    pub vault_relayer: Option<Address>,
    #[serde(default = "default_polling_delay_ms")]
    pub polling_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub signing_scheme: SigningScheme,
}

fn default_network() -> String {
    Network::Mainnet.name().to_string()
}

fn default_polling_delay_ms() -> u64 {
    DEFAULT_POLLING_DELAY_MS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            env: OrderbookEnv::default(),
            rpc_url: String::new(),
            verifying_contract: None,
            vault_relayer: None,
            polling_delay_ms: default_polling_delay_ms(),
            max_attempts: default_max_attempts(),
            signing_scheme: SigningScheme::default(),
        }
    }
}

impl SignerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Read `COW_NETWORK`, `COW_ENV`, `COW_RPC_URL`, `COW_POLL_DELAY_MS`,
    /// `COW_POLL_MAX_ATTEMPTS` and `COW_SIGNING_SCHEME`. Load `.env` first if wanted.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(network) = lookup("COW_NETWORK") {
            config.network = network;
        }
        if let Some(env) = lookup("COW_ENV") {
            config.env = env.parse()?;
        }
        config.rpc_url = lookup("COW_RPC_URL").ok_or_else(|| SignerError::ConfigurationMissing {
            field: "COW_RPC_URL".to_string(),
        })?;
        if let Some(delay) = lookup("COW_POLL_DELAY_MS") {
            config.polling_delay_ms = parse_number("COW_POLL_DELAY_MS", &delay)?;
        }
        if let Some(attempts) = lookup("COW_POLL_MAX_ATTEMPTS") {
            config.max_attempts = parse_number("COW_POLL_MAX_ATTEMPTS", &attempts)?;
        }
        if let Some(scheme) = lookup("COW_SIGNING_SCHEME") {
            config.signing_scheme = scheme.parse()?;
        }
        Ok(config)
    }

    pub fn network_config(&self) -> Result<NetworkConfig> {
        let network: Network = self.network.parse()?;
        let config = NetworkConfig::new(network, &self.rpc_url)?.with_env(self.env);
        Ok(config.with_contracts(
            self.verifying_contract.unwrap_or(SETTLEMENT_CONTRACT),
            self.vault_relayer.unwrap_or(VAULT_RELAYER),
        ))
    }

    pub fn poll_config(&self) -> Result<PollConfig> {
        if self.max_attempts == 0 {
            return Err(SignerError::NumberOutOfRange {
                field: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(PollConfig {
            polling_delay: Duration::from_millis(self.polling_delay_ms),
            max_attempts: self.max_attempts,
        })
    }
}

fn parse_number<T: FromStr>(field: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| SignerError::TypeMismatch {
        field: field.to_string(),
        expected: format!("integer, got {}", value),
    })
}
