use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid hex: {value}")]
    InvalidHex { value: String },

    #[error("Invalid {field} length: expected {expected}, got {actual}")]
    InvalidLength {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Typed data field {field} expects a {expected} value")]
    TypeMismatch { field: String, expected: String },

    #[error("Number out of range: {field}")]
    NumberOutOfRange { field: String },

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Configuration missing: {field}")]
    ConfigurationMissing { field: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("RPC {method} returned error {code}: {message} (payload: {payload})")]
    Rpc {
        method: String,
        code: i64,
        message: String,
        payload: serde_json::Value,
    },

    #[error("RPC {method} transport error: {message}")]
    RpcTransport { method: String, message: String },

    #[error("RPC {method} returned an unexpected result, expected {expected}")]
    UnexpectedResult { method: String, expected: String },

    #[error(
        "Allowance for token {token} (owner {owner}, spender {spender}) did not reach {required} after {attempts} polls"
    )]
    AllowanceTimeout {
        token: String,
        owner: String,
        spender: String,
        required: String,
        attempts: u32,
    },
}

pub type Result<T> = std::result::Result<T, SignerError>;
