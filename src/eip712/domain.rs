//! EIP-712 domain separator for the CoW Protocol settlement contract

use crate::error::Result;
use crate::types::Address;

use super::hash::{hash_struct, TypedField, TypedValue};

pub const DOMAIN_TYPE_NAME: &str = "EIP712Domain";
pub const DOMAIN_NAME: &str = "Gnosis Protocol";
pub const DOMAIN_VERSION: &str = "v2";

pub const DOMAIN_FIELDS: [TypedField; 4] = [
    TypedField::new("name", "string"),
    TypedField::new("version", "string"),
    TypedField::new("chainId", "uint256"),
    TypedField::new("verifyingContract", "address"),
];

/// Binds a signature to one contract on one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    pub fn new(name: &str, version: &str, chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            chain_id,
            verifying_contract,
        }
    }

    /// Domain of the GPv2 settlement contract on `chain_id`
    pub fn gnosis_protocol(chain_id: u64, verifying_contract: Address) -> Self {
        Self::new(DOMAIN_NAME, DOMAIN_VERSION, chain_id, verifying_contract)
    }

    pub fn values(&self) -> Vec<TypedValue> {
        vec![
            TypedValue::String(self.name.clone()),
            TypedValue::String(self.version.clone()),
            TypedValue::Uint(self.chain_id.into()),
            TypedValue::Address(self.verifying_contract),
        ]
    }

    pub fn separator(&self) -> Result<[u8; 32]> {
        hash_struct(DOMAIN_TYPE_NAME, &DOMAIN_FIELDS, &self.values())
    }
}
