pub mod allowance;
pub mod codec;
pub mod config;
pub mod ecdsa;
pub mod eip712;
pub mod erc20;
pub mod error;
pub mod rlp;
pub mod rpc;
pub mod signer;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use allowance::{AllowanceOutcome, AllowanceSource, AllowanceState, AllowanceSync, PollConfig};
pub use config::{Network, NetworkConfig, OrderbookEnv, SignerConfig, SETTLEMENT_CONTRACT, VAULT_RELAYER};
pub use ecdsa::{recover_address, PrivateKey, Signature};
pub use eip712::{Eip712Domain, SigningScheme};
pub use erc20::Erc20Client;
pub use error::{Result, SignerError};
pub use rpc::{HttpTransport, RpcClient, RpcTransport};
pub use signer::CowSigner;
pub use transaction::{LegacyTransaction, SignedTransaction};
pub use types::{Address, Order, OrderKind, OrderUid, TokenBalance};

/// Initialize logging for the library
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}
