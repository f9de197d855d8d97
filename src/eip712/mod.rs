//! EIP-712 typed-data hashing and signing for CoW Protocol
//!
//! Covers the pieces the settlement contract checks on-chain:
//!
//! - Domain separator for `EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)`
//! - Struct hashes for `Order`, `OrderCancellations(bytes[] orderUids)` and `OrderCancellation(bytes orderUid)`
//! - The final `0x1901` digest, optionally wrapped with the `eth_sign` prefix
//!
//! Every value is ABI-encoded into a 32-byte word: static values are left-padded,
//! `string`/`bytes` are replaced by their Keccak-256 hash and `bytes[]` by the hash
//! of the concatenated element hashes.

mod domain;
mod hash;
mod signing;


pub use domain::{Eip712Domain, DOMAIN_FIELDS, DOMAIN_NAME, DOMAIN_TYPE_NAME, DOMAIN_VERSION};
pub use hash::{
    cancellation_digest, cancellations_digest, digest, encode_value, hash_domain, hash_struct,
    order_digest, order_struct_hash, order_values, personal_message_hash, type_hash, type_string,
    typed_data_digest, TypedField, TypedValue, CANCELLATIONS_FIELDS, CANCELLATIONS_TYPE_NAME,
    CANCELLATION_FIELDS, CANCELLATION_TYPE_NAME, ORDER_FIELDS, ORDER_TYPE_NAME,
};
pub use signing::{
    recover_signer, sign_cancellation, sign_cancellations, sign_digest, sign_order, SigningScheme,
};
