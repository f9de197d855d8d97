//! ERC-20 reads over `eth_call` and `approve` via a signed legacy transaction

use num_bigint::BigUint;
use tracing::{debug, info, warn};

use crate::codec::{bytes_to_hex, uint_to_word};
use crate::ecdsa::PrivateKey;
use crate::error::{Result, SignerError};
use crate::rpc::RpcClient;
use crate::transaction::LegacyTransaction;
use crate::types::Address;

/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// `allowance(address,address)`
pub const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];

/// `approve(address,uint256)`
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Fixed gas limit for `approve`
pub const APPROVE_GAS_LIMIT: u64 = 100_000;

pub fn balance_of_calldata(owner: &Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&owner.to_word());
    data
}

pub fn allowance_calldata(owner: &Address, spender: &Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&ALLOWANCE_SELECTOR);
    data.extend_from_slice(&owner.to_word());
    data.extend_from_slice(&spender.to_word());
    data
}

pub fn approve_calldata(spender: &Address, amount: &BigUint) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&APPROVE_SELECTOR);
    data.extend_from_slice(&spender.to_word());
    data.extend_from_slice(&uint_to_word(amount)?);
    Ok(data)
}

/// Decode a single `uint256` return value.
///
/// Empty return data (e.g. the token address has no code) is an error, not zero.
pub fn decode_uint256(function: &str, data: &[u8]) -> Result<BigUint> {
    if data.len() < 32 {
        return Err(SignerError::UnexpectedResult {
            method: format!("eth_call {}", function),
            expected: format!("32-byte uint256 word, got {} bytes", data.len()),
        });
    }
    Ok(BigUint::from_bytes_be(&data[..32]))
}

/// Unsigned `approve(spender, amount)` transaction sent to `token`
pub fn approve_transaction(
    token: &Address,
    spender: &Address,
    amount: &BigUint,
    nonce: u64,
    gas_price: BigUint,
    chain_id: u64,
) -> Result<LegacyTransaction> {
    Ok(LegacyTransaction {
        nonce,
        gas_price,
        gas_limit: APPROVE_GAS_LIMIT,
        to: *token,
        value: BigUint::from(0u32),
        data: approve_calldata(spender, amount)?,
        chain_id,
    })
}

/// ERC-20 reader/writer bound to one node
#[derive(Clone)]
pub struct Erc20Client {
    rpc: RpcClient,
}

impl Erc20Client {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn balance_of(&self, token: &Address, owner: &Address) -> Result<BigUint> {
        let data = self.rpc.eth_call(token, &balance_of_calldata(owner)).await?;
        let balance = decode_uint256("balanceOf", &data)?;
        debug!("balanceOf({}) on {} = {}", owner, token, balance);
        Ok(balance)
    }

    pub async fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Result<BigUint> {
        let data = self.rpc.eth_call(token, &allowance_calldata(owner, spender)).await?;
        let allowance = decode_uint256("allowance", &data)?;
        debug!("allowance({}, {}) on {} = {}", owner, spender, token, allowance);
        Ok(allowance)
    }

    /// Sign and broadcast `approve(spender, amount)` from the key's address.
    ///
    /// The nonce is read from the `latest` block right before signing. Another
    /// transaction sent from the same address between that read and the broadcast
    /// makes the node reject this one; callers must serialize approvals per signer.
    ///
    /// Any RPC failure aborts before or at the broadcast. Returns the transaction hash.
    pub async fn approve(
        &self,
        key: &PrivateKey,
        chain_id: u64,
        token: &Address,
        spender: &Address,
        amount: &BigUint,
    ) -> Result<[u8; 32]> {
        let sender = key.address();
        let nonce = self.rpc.get_transaction_count(&sender).await?;
        let gas_price = self.rpc.gas_price().await?;

        let tx = approve_transaction(token, spender, amount, nonce, gas_price, chain_id)?;
        let signed = tx.sign(key)?;
        let local_hash = signed.hash();

        info!(
            "Sending approve({}, {}) on {} from {} (nonce {}, gas price {}, tx {})",
            spender,
            amount,
            token,
            sender,
            nonce,
            tx.gas_price,
            bytes_to_hex(&local_hash)
        );

        let tx_hash = self.rpc.send_raw_transaction(&signed.raw).await?;
        if tx_hash != local_hash {
            warn!(
                "Node reported tx hash {} but the signed transaction hashes to {}",
                bytes_to_hex(&tx_hash),
                bytes_to_hex(&local_hash)
            );
        }
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::codec::{function_selector, hex_to_bytes};
    use crate::rpc::mock::ScriptedTransport;

    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    const RELAYER: &str = "0xc92e8bdf79f0507f65a392b0ab4667716bfe0110";
    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn word(value: u64) -> String {
        format!("0x{:064x}", value)
    }

    fn client(transport: ScriptedTransport) -> (Erc20Client, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        (Erc20Client::new(RpcClient::new(transport.clone())), transport)
    }

    #[test]
    fn test_selectors_match_signatures() {
        assert_eq!(BALANCE_OF_SELECTOR, function_selector("balanceOf(address)"));
        assert_eq!(ALLOWANCE_SELECTOR, function_selector("allowance(address,address)"));
        assert_eq!(APPROVE_SELECTOR, function_selector("approve(address,uint256)"));
    }

    #[test]
    fn test_approve_calldata() {
        let spender: Address = "0x0000000000000000000000000000000000000001".parse().unwrap();
        let data = approve_calldata(&spender, &BigUint::from(1u32)).unwrap();
        let expected = format!("0x095ea7b3{}01{}01", "00".repeat(31), "00".repeat(31));
        assert_eq!(data, hex_to_bytes(&expected).unwrap());
        assert_eq!(data.len(), 68);
    }

    #[test]
    fn test_read_calldata() {
        let owner: Address = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap();
        let spender: Address = RELAYER.parse().unwrap();

        let balance = balance_of_calldata(&owner);
        assert_eq!(
            bytes_to_hex(&balance),
            "0x70a082310000000000000000000000007e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );

        let allowance = allowance_calldata(&owner, &spender);
        assert_eq!(&allowance[..4], &ALLOWANCE_SELECTOR);
        assert_eq!(&allowance[4..36], &owner.to_word());
        assert_eq!(&allowance[36..], &spender.to_word());
    }

    #[test]
    fn test_decode_uint256() {
        let data = hex_to_bytes(&word(1_000_000)).unwrap();
        assert_eq!(decode_uint256("balanceOf", &data).unwrap(), BigUint::from(1_000_000u32));
        assert!(matches!(
            decode_uint256("balanceOf", &[]),
            Err(SignerError::UnexpectedResult { .. })
        ));
    }

    #[tokio::test]
    async fn test_balance_and_allowance_reads() {
        let (erc20, transport) = client(
            ScriptedTransport::new()
                .on("eth_call", json!(word(5_000_000)))
                .on("eth_call", json!(word(42))),
        );
        let token: Address = USDC.parse().unwrap();
        let owner: Address = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap();
        let spender: Address = RELAYER.parse().unwrap();

        assert_eq!(erc20.balance_of(&token, &owner).await.unwrap(), BigUint::from(5_000_000u32));
        assert_eq!(erc20.allowance(&token, &owner, &spender).await.unwrap(), BigUint::from(42u32));

        let requests = transport.requests();
        assert_eq!(requests[0]["params"][0]["to"], USDC);
        assert_eq!(requests[0]["params"][0]["data"], bytes_to_hex(&balance_of_calldata(&owner)));
        assert_eq!(
            requests[1]["params"][0]["data"],
            bytes_to_hex(&allowance_calldata(&owner, &spender))
        );
    }

    #[tokio::test]
    async fn test_approve_flow() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let token: Address = USDC.parse().unwrap();
        let spender: Address = RELAYER.parse().unwrap();
        let amount = BigUint::from(3_000_000_000u64);

        let expected_tx = approve_transaction(&token, &spender, &amount, 5, BigUint::from(30_000_000_000u64), 1)
            .unwrap()
            .sign(&key)
            .unwrap();
        let expected_hash = expected_tx.hash();

        let (erc20, transport) = client(
            ScriptedTransport::new()
                .on("eth_getTransactionCount", json!("0x5"))
                .on("eth_gasPrice", json!("0x6fc23ac00"))
                .on("eth_sendRawTransaction", json!(bytes_to_hex(&expected_hash))),
        );

        let tx_hash = erc20.approve(&key, 1, &token, &spender, &amount).await.unwrap();
        assert_eq!(tx_hash, expected_hash);

        assert_eq!(
            transport.methods(),
            vec!["eth_getTransactionCount", "eth_gasPrice", "eth_sendRawTransaction"]
        );
        let requests = transport.requests();
        assert_eq!(requests[0]["params"][0], key.address().to_string());
        assert_eq!(requests[0]["params"][1], "latest");
        assert_eq!(requests[2]["params"][0], expected_tx.to_hex());
    }

    #[tokio::test]
    async fn test_approve_aborts_on_rpc_error() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let (erc20, transport) = client(
            ScriptedTransport::new()
                .on("eth_getTransactionCount", json!("0x5"))
                .on_error("eth_gasPrice", -32603, "internal error"),
        );

        let err = erc20
            .approve(&key, 1, &USDC.parse().unwrap(), &RELAYER.parse().unwrap(), &BigUint::from(1u32))
            .await
            .unwrap_err();
        assert!(matches!(err, SignerError::Rpc { ref method, .. } if method == "eth_gasPrice"));
        assert_eq!(transport.count("eth_sendRawTransaction"), 0);
    }
}
