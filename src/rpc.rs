use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};
use url::Url;

use crate::codec::{bytes_to_hex, hex_to_array, hex_to_bytes, parse_quantity};
use crate::error::{Result, SignerError};
use crate::types::{Address, RpcRequest, RpcResponse};

/// Performs one HTTP POST of a JSON body and returns the parsed JSON reply.
///
/// Injected into [`RpcClient`] so tests can script node responses.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post_json(&self, body: &Value) -> Result<Value>;
}

/// reqwest-backed transport for a node's HTTP endpoint
pub struct HttpTransport {
    client: Client,
    url: Url,
}

impl HttpTransport {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = Url::parse(rpc_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("cow-signer/0.1.0")
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post_json(&self, body: &Value) -> Result<Value> {
        let method = body.get("method").and_then(Value::as_str).unwrap_or("unknown");
        let response = self.client.post(self.url.clone()).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("RPC HTTP error for {}: {} - {}", method, status, error_text);
            return Err(SignerError::RpcTransport {
                method: method.to_string(),
                message: format!("HTTP {}: {}", status, error_text),
            });
        }

        Ok(response.json().await?)
    }
}

/// Minimal JSON-RPC 2.0 client. One POST per call, no batching, no retries.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn with_http(rpc_url: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(rpc_url)?)))
    }

    /// Send `method` and return its `result`, or the node's `error` object as [`SignerError::Rpc`]
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        let body = serde_json::to_value(&request)?;
        debug!("RPC request {} (id {})", method, id);

        let raw = self.transport.post_json(&body).await.map_err(|e| match e {
            SignerError::RpcTransport { .. } => e,
            other => SignerError::RpcTransport {
                method: method.to_string(),
                message: other.to_string(),
            },
        })?;

        let response: RpcResponse =
            serde_json::from_value(raw).map_err(|e| SignerError::RpcTransport {
                method: method.to_string(),
                message: format!("malformed response: {}", e),
            })?;

        if let Some(rpc_error) = response.error {
            debug!("RPC {} (id {}) failed: {} {}", method, id, rpc_error.code, rpc_error.message);
            let payload = serde_json::to_value(&rpc_error)?;
            return Err(SignerError::Rpc {
                method: method.to_string(),
                code: rpc_error.code,
                message: rpc_error.message,
                payload,
            });
        }

        response.result.ok_or_else(|| SignerError::UnexpectedResult {
            method: method.to_string(),
            expected: "result".to_string(),
        })
    }

    async fn call_str(&self, method: &str, params: Value) -> Result<String> {
        match self.call(method, params).await? {
            Value::String(s) => Ok(s),
            _ => Err(SignerError::UnexpectedResult {
                method: method.to_string(),
                expected: "hex string".to_string(),
            }),
        }
    }

    async fn call_quantity(&self, method: &str, params: Value) -> Result<BigUint> {
        let raw = self.call_str(method, params).await?;
        parse_quantity(&raw).map_err(|_| SignerError::UnexpectedResult {
            method: method.to_string(),
            expected: format!("hex quantity, got {}", raw),
        })
    }

    /// `eth_call` against the latest block; returns the raw return data
    pub async fn eth_call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>> {
        let params = json!([{ "to": to.to_string(), "data": bytes_to_hex(data) }, "latest"]);
        let raw = self.call_str("eth_call", params).await?;
        hex_to_bytes(&raw).map_err(|_| SignerError::UnexpectedResult {
            method: "eth_call".to_string(),
            expected: format!("hex data, got {}", raw),
        })
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let value = self.call_quantity("eth_chainId", json!([])).await?;
        value.to_u64().ok_or_else(|| SignerError::NumberOutOfRange {
            field: "eth_chainId".to_string(),
        })
    }

    /// Nonce from the `latest` block
    pub async fn get_transaction_count(&self, address: &Address) -> Result<u64> {
        let value = self
            .call_quantity("eth_getTransactionCount", json!([address.to_string(), "latest"]))
            .await?;
        value.to_u64().ok_or_else(|| SignerError::NumberOutOfRange {
            field: "eth_getTransactionCount".to_string(),
        })
    }

    pub async fn gas_price(&self) -> Result<BigUint> {
        self.call_quantity("eth_gasPrice", json!([])).await
    }

    /// Broadcast a signed transaction and return the hash the node reports
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<[u8; 32]> {
        let hash = self
            .call_str("eth_sendRawTransaction", json!([bytes_to_hex(raw)]))
            .await?;
        hex_to_array::<32>("transaction hash", &hash).map_err(|_| SignerError::UnexpectedResult {
            method: "eth_sendRawTransaction".to_string(),
            expected: format!("32-byte transaction hash, got {}", hash),
        })
    }
}
