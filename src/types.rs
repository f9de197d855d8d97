use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::codec::{bytes_to_hex, hex_to_array, pad32, to_checksum_address};
use crate::eip712::{Eip712Domain, SigningScheme};
use crate::error::{Result, SignerError};

/// 20-byte account or contract address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        <[u8; 20]>::try_from(bytes)
            .map(Address)
            .map_err(|_| SignerError::InvalidLength {
                field: "address".to_string(),
                expected: 20,
                actual: bytes.len(),
            })
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Left-padded 32-byte ABI word
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }

    /// EIP-55 mixed-case form, only used for display
    pub fn to_checksum(&self) -> String {
        to_checksum_address(&self.0)
    }
}

impl FromStr for Address {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self> {
        hex_to_array::<20>("address", s)
            .map(Address)
            .map_err(|_| SignerError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bytes_to_hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub const ORDER_UID_LEN: usize = 56;

/// Order identifier: order digest (32) ‖ owner (20) ‖ validTo (4, big-endian)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderUid(pub [u8; ORDER_UID_LEN]);

impl OrderUid {
    pub fn from_parts(digest: &[u8; 32], owner: &Address, valid_to: u32) -> Self {
        let mut uid = [0u8; ORDER_UID_LEN];
        uid[..32].copy_from_slice(digest);
        uid[32..52].copy_from_slice(owner.as_bytes());
        uid[52..].copy_from_slice(&valid_to.to_be_bytes());
        OrderUid(uid)
    }

    pub fn digest(&self) -> [u8; 32] {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&self.0[..32]);
        digest
    }

    pub fn owner(&self) -> Address {
        let mut owner = [0u8; 20];
        owner.copy_from_slice(&self.0[32..52]);
        Address(owner)
    }

    pub fn valid_to(&self) -> u32 {
        u32::from_be_bytes([self.0[52], self.0[53], self.0[54], self.0[55]])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for OrderUid {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self> {
        hex_to_array::<ORDER_UID_LEN>("order uid", s).map(OrderUid)
    }
}

impl fmt::Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bytes_to_hex(&self.0))
    }
}

impl fmt::Debug for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderUid({})", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Sell,
    Buy,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Sell => "sell",
            OrderKind::Buy => "buy",
        }
    }
}

impl FromStr for OrderKind {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sell" => Ok(OrderKind::Sell),
            "buy" => Ok(OrderKind::Buy),
            _ => Err(SignerError::TypeMismatch {
                field: "kind".to_string(),
                expected: format!("sell|buy, got {}", s),
            }),
        }
    }
}

/// Where the settlement contract pulls or pushes token balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBalance {
    #[default]
    Erc20,
    External,
    Internal,
}

impl TokenBalance {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenBalance::Erc20 => "erc20",
            TokenBalance::External => "external",
            TokenBalance::Internal => "internal",
        }
    }
}

impl FromStr for TokenBalance {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "erc20" => Ok(TokenBalance::Erc20),
            "external" => Ok(TokenBalance::External),
            "internal" => Ok(TokenBalance::Internal),
            _ => Err(SignerError::TypeMismatch {
                field: "tokenBalance".to_string(),
                expected: format!("erc20|external|internal, got {}", s),
            }),
        }
    }
}

/// Default order validity in seconds
pub const DEFAULT_VALID_FOR_SECS: u32 = 30;

/// Default app data: 32 zero bytes
pub const DEFAULT_APP_DATA: [u8; 32] = [0u8; 32];

/// A CoW Protocol order intent, as signed off-chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub sell_token: Address,
    pub buy_token: Address,
    pub receiver: Address,
    pub sell_amount: BigUint,
    pub buy_amount: BigUint,
    pub valid_to: u32,
    pub app_data: [u8; 32],
    pub fee_amount: BigUint,
    pub kind: OrderKind,
    pub partially_fillable: bool,
    pub sell_token_balance: TokenBalance,
    pub buy_token_balance: TokenBalance,
}

impl Order {
    /// Unix timestamp `valid_for` seconds from now
    pub fn valid_to_from_now(valid_for: u32) -> u32 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        u32::try_from(now + valid_for as u64).unwrap_or(u32::MAX)
    }

    /// 56-byte uid the orderbook assigns to this order once placed by `owner`
    pub fn uid(&self, domain: &Eip712Domain, owner: &Address) -> Result<OrderUid> {
        let digest = crate::eip712::order_digest(domain, self)?;
        Ok(OrderUid::from_parts(&digest, owner, self.valid_to))
    }

    /// JSON body for `POST /api/v1/orders`
    pub fn to_api_json(&self, owner: &Address, signature: &str, scheme: SigningScheme) -> Value {
        json!({
            "sellToken": self.sell_token.to_string(),
            "buyToken": self.buy_token.to_string(),
            "receiver": self.receiver.to_string(),
            "sellAmount": self.sell_amount.to_string(),
            "buyAmount": self.buy_amount.to_string(),
            "validTo": self.valid_to,
            "appData": bytes_to_hex(&self.app_data),
            "feeAmount": self.fee_amount.to_string(),
            "kind": self.kind.as_str(),
            "partiallyFillable": self.partially_fillable,
            "sellTokenBalance": self.sell_token_balance.as_str(),
            "buyTokenBalance": self.buy_token_balance.as_str(),
            "signingScheme": scheme.as_str(),
            "signature": signature,
            "from": owner.to_string(),
        })
    }
}

/// Parse a 32-byte app data value, accepting short hex by left-padding
pub fn parse_app_data(value: &str) -> Result<[u8; 32]> {
    let bytes = crate::codec::hex_to_bytes(value)?;
    pad32(&bytes).map_err(|_| SignerError::InvalidLength {
        field: "appData".to_string(),
        expected: 32,
        actual: bytes.len(),
    })
}

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Value,
    pub id: u64,
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}
