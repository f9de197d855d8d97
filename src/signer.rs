use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde_json::Value;
use tracing::info;

use crate::allowance::{AllowanceOutcome, AllowanceSource, AllowanceSync, PollConfig};
use crate::config::{NetworkConfig, SignerConfig};
use crate::ecdsa::{PrivateKey, Signature};
use crate::eip712::{self, Eip712Domain, SigningScheme};
use crate::erc20::Erc20Client;
use crate::error::Result;
use crate::rpc::{RpcClient, RpcTransport};
use crate::types::{Address, Order, OrderUid};

/// One key bound to one network.
///
/// The key, its address and the network settings are fixed at construction;
/// every signature is a pure function of them and the message.
pub struct CowSigner {
    key: PrivateKey,
    address: Address,
    network: NetworkConfig,
    erc20: Erc20Client,
    poll: PollConfig,
    scheme: SigningScheme,
}

impl CowSigner {
    pub fn new(key: PrivateKey, network: NetworkConfig, transport: Arc<dyn RpcTransport>) -> Self {
        Self::with_rpc(key, network, RpcClient::new(transport))
    }

    /// Talk to the network's RPC URL over HTTP
    pub fn with_http(key: PrivateKey, network: NetworkConfig) -> Result<Self> {
        let rpc = RpcClient::with_http(network.rpc_url().as_str())?;
        Ok(Self::with_rpc(key, network, rpc))
    }

    fn with_rpc(key: PrivateKey, network: NetworkConfig, rpc: RpcClient) -> Self {
        let address = key.address();
        info!(
            "Signer {} on {} (chain id {})",
            address,
            network.network(),
            network.chain_id()
        );
        Self {
            key,
            address,
            erc20: Erc20Client::new(rpc),
            network,
            poll: PollConfig::default(),
            scheme: SigningScheme::default(),
        }
    }

    pub fn from_config(key: PrivateKey, config: &SignerConfig) -> Result<Self> {
        Ok(Self::with_http(key, config.network_config()?)?
            .with_poll_config(config.poll_config()?)
            .with_signing_scheme(config.signing_scheme))
    }

    pub fn with_poll_config(self, poll: PollConfig) -> Self {
        Self { poll, ..self }
    }

    pub fn with_signing_scheme(self, scheme: SigningScheme) -> Self {
        Self { scheme, ..self }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn signing_scheme(&self) -> SigningScheme {
        self.scheme
    }

    pub fn domain(&self) -> Eip712Domain {
        self.network.domain()
    }

    pub fn sign_order(&self, order: &Order) -> Result<Signature> {
        eip712::sign_order(&self.key, &self.domain(), order, self.scheme)
    }

    pub fn order_uid(&self, order: &Order) -> Result<OrderUid> {
        order.uid(&self.domain(), &self.address)
    }

    /// Signed body for the orderbook's order submission endpoint
    pub fn order_api_body(&self, order: &Order) -> Result<Value> {
        let signature = self.sign_order(order)?;
        Ok(order.to_api_json(&self.address, &signature.to_hex(), self.scheme))
    }

    pub fn sign_cancellations(&self, order_uids: &[OrderUid]) -> Result<Signature> {
        eip712::sign_cancellations(&self.key, &self.domain(), order_uids, self.scheme)
    }

    pub fn sign_cancellation(&self, order_uid: &OrderUid) -> Result<Signature> {
        eip712::sign_cancellation(&self.key, &self.domain(), order_uid, self.scheme)
    }

    pub async fn balance_of(&self, token: &Address) -> Result<BigUint> {
        self.erc20.balance_of(token, &self.address).await
    }

    pub async fn allowance_for(&self, token: &Address, spender: &Address) -> Result<BigUint> {
        self.erc20.allowance(token, &self.address, spender).await
    }

    pub async fn vault_allowance(&self, token: &Address) -> Result<BigUint> {
        self.allowance_for(token, self.network.vault_relayer()).await
    }

    /// Approve exactly `required` for `spender` if the current allowance is short,
    /// then wait until the chain shows it
    pub async fn ensure_allowance(
        &self,
        token: &Address,
        spender: &Address,
        required: &BigUint,
    ) -> Result<AllowanceOutcome> {
        AllowanceSync::new(self, self.poll)
            .ensure_allowance(token, &self.address, spender, required)
            .await
    }

    pub async fn ensure_vault_allowance(&self, token: &Address, required: &BigUint) -> Result<AllowanceOutcome> {
        let spender = *self.network.vault_relayer();
        self.ensure_allowance(token, &spender, required).await
    }
}

#[async_trait]
impl AllowanceSource for CowSigner {
    async fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Result<BigUint> {
        self.erc20.allowance(token, owner, spender).await
    }

    async fn approve(&self, token: &Address, spender: &Address, amount: &BigUint) -> Result<[u8; 32]> {
        self.erc20
            .approve(&self.key, self.network.chain_id(), token, spender, amount)
            .await
    }
}

impl fmt::Debug for CowSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CowSigner")
            .field("address", &self.address)
            .field("network", &self.network.network())
            .field("chain_id", &self.network.chain_id())
            .field("scheme", &self.scheme)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::time::{Duration, Instant};

    use super::*;
    use crate::config::{Network, VAULT_RELAYER};
    use crate::ecdsa::recover_address;
    use crate::error::SignerError;
    use crate::rpc::mock::ScriptedTransport;
    use crate::types::{OrderKind, TokenBalance, DEFAULT_APP_DATA};

    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    fn word(value: u64) -> String {
        format!("0x{:064x}", value)
    }

    fn signer(transport: ScriptedTransport) -> (CowSigner, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let network = NetworkConfig::new(Network::Mainnet, "http://localhost:8545").unwrap();
        let signer = CowSigner::new(PrivateKey::from_hex(TEST_KEY).unwrap(), network, transport.clone())
            .with_poll_config(PollConfig {
                polling_delay: Duration::from_millis(500),
                max_attempts: 5,
            });
        (signer, transport)
    }

    fn order() -> Order {
        Order {
            sell_token: USDC.parse().unwrap(),
            buy_token: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".parse().unwrap(),
            receiver: Address::ZERO,
            sell_amount: BigUint::from(3_000_000_000u64),
            buy_amount: BigUint::from(1_000_000_000_000_000_000u64),
            valid_to: 1_700_000_000,
            app_data: DEFAULT_APP_DATA,
            fee_amount: BigUint::from(0u32),
            kind: OrderKind::Buy,
            partially_fillable: true,
            sell_token_balance: TokenBalance::Erc20,
            buy_token_balance: TokenBalance::Erc20,
        }
    }

    #[test]
    fn test_address_and_domain() {
        let (signer, _) = signer(ScriptedTransport::new());
        assert_eq!(signer.address().to_string(), "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23");
        assert_eq!(signer.domain(), Eip712Domain::gnosis_protocol(1, crate::config::SETTLEMENT_CONTRACT));
        assert_eq!(signer.signing_scheme(), SigningScheme::EthSign);
        assert!(!format!("{:?}", signer).contains("4c0883a6"));
    }

    #[test]
    fn test_ethsign_cancellation_recovers_signer() {
        let (signer, _) = signer(ScriptedTransport::new());
        let uid: OrderUid = format!("0x{}", "ab".repeat(56)).parse().unwrap();

        let signature = signer.sign_cancellations(&[uid]).unwrap();
        let digest = eip712::cancellations_digest(&signer.domain(), &[uid]).unwrap();
        let prefixed = eip712::personal_message_hash(&digest);
        assert_eq!(&recover_address(&prefixed, &signature).unwrap(), signer.address());
        assert_eq!(signature.to_compact_bytes().len(), 65);

        let single = signer.sign_cancellation(&uid).unwrap();
        let single_digest = eip712::cancellation_digest(&signer.domain(), &uid).unwrap();
        assert_eq!(
            &eip712::recover_signer(&single_digest, SigningScheme::EthSign, &single).unwrap(),
            signer.address()
        );
    }

    #[test]
    fn test_order_api_body() {
        let (signer, _) = signer(ScriptedTransport::new());
        let signer = signer.with_signing_scheme(SigningScheme::Eip712);
        let order = order();

        let body = signer.order_api_body(&order).unwrap();
        assert_eq!(body["kind"], "buy");
        assert_eq!(body["sellAmount"], "3000000000");
        assert_eq!(body["signingScheme"], "eip712");
        assert_eq!(body["from"], signer.address().to_string());
        assert_eq!(body["partiallyFillable"], true);

        let signature_hex = body["signature"].as_str().unwrap();
        let signature = Signature::from_compact(&crate::codec::hex_to_bytes(signature_hex).unwrap()).unwrap();
        let digest = eip712::order_digest(&signer.domain(), &order).unwrap();
        assert_eq!(&recover_address(&digest, &signature).unwrap(), signer.address());

        let uid = signer.order_uid(&order).unwrap();
        assert_eq!(uid.digest(), digest);
        assert_eq!(&uid.owner(), signer.address());
    }

    #[tokio::test]
    async fn test_balance_reads_own_address() {
        let (signer, transport) = signer(ScriptedTransport::new().on("eth_call", json!(word(77))));
        assert_eq!(signer.balance_of(&USDC.parse().unwrap()).await.unwrap(), BigUint::from(77u32));
        let data = transport.requests()[0]["params"][0]["data"].as_str().unwrap().to_string();
        assert!(data.ends_with(&signer.address().to_string()[2..]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_vault_allowance_approves_and_waits() {
        let required = 3_000_000_000u64;
        let (signer, transport) = signer(
            ScriptedTransport::new()
                .on("eth_call", json!(word(0)))
                .on("eth_call", json!(word(0)))
                .on("eth_call", json!(word(0)))
                .on("eth_call", json!(word(required)))
                .on("eth_getTransactionCount", json!("0x0"))
                .on("eth_gasPrice", json!("0x3b9aca00"))
                .on("eth_sendRawTransaction", json!(format!("0x{}", "ee".repeat(32)))),
        );

        let start = Instant::now();
        let outcome = signer
            .ensure_vault_allowance(&USDC.parse().unwrap(), &BigUint::from(required))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AllowanceOutcome::Approved {
                tx_hash: [0xee; 32],
                allowance: BigUint::from(required),
                polls: 3,
            }
        );
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));

        assert_eq!(
            transport.methods(),
            vec![
                "eth_call",
                "eth_getTransactionCount",
                "eth_gasPrice",
                "eth_sendRawTransaction",
                "eth_call",
                "eth_call",
                "eth_call",
            ]
        );
        // the allowance is read toward the vault relayer
        let data = transport.requests()[0]["params"][0]["data"].as_str().unwrap().to_string();
        assert!(data.ends_with(&VAULT_RELAYER.to_string()[2..]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_vault_allowance_times_out() {
        let (signer, transport) = signer(
            ScriptedTransport::new()
                .on("eth_call", json!(word(0)))
                .on("eth_getTransactionCount", json!("0x1"))
                .on("eth_gasPrice", json!("0x1"))
                .on("eth_sendRawTransaction", json!(format!("0x{}", "ee".repeat(32)))),
        );

        let err = signer
            .ensure_vault_allowance(&USDC.parse().unwrap(), &BigUint::from(1u32))
            .await
            .unwrap_err();
        assert!(matches!(err, SignerError::AllowanceTimeout { attempts: 5, .. }));
        // initial check plus five polls
        assert_eq!(transport.count("eth_call"), 6);
        assert_eq!(transport.count("eth_sendRawTransaction"), 1);
    }
}
