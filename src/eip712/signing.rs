//! Order and cancellation signing with secp256k1

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::bytes_to_hex;
use crate::ecdsa::{recover_address, PrivateKey, Signature};
use crate::error::{Result, SignerError};
use crate::types::{Address, Order, OrderUid};

use super::domain::Eip712Domain;
use super::hash::{cancellation_digest, cancellations_digest, order_digest, personal_message_hash};

/// How the typed-data digest is turned into the hash that gets signed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningScheme {
    /// Sign the EIP-712 digest directly
    Eip712,
    /// Wrap the digest with the `eth_sign` personal-message prefix first
    #[default]
    EthSign,
}

impl SigningScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningScheme::Eip712 => "eip712",
            SigningScheme::EthSign => "ethsign",
        }
    }

    /// The 32-byte hash handed to ECDSA for `digest`
    pub fn signing_hash(&self, digest: &[u8; 32]) -> [u8; 32] {
        match self {
            SigningScheme::Eip712 => *digest,
            SigningScheme::EthSign => personal_message_hash(digest),
        }
    }
}

impl FromStr for SigningScheme {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "eip712" => Ok(SigningScheme::Eip712),
            "ethsign" => Ok(SigningScheme::EthSign),
            _ => Err(SignerError::TypeMismatch {
                field: "signingScheme".to_string(),
                expected: format!("eip712|ethsign, got {}", s),
            }),
        }
    }
}

impl fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sign an EIP-712 digest under `scheme`
pub fn sign_digest(key: &PrivateKey, digest: &[u8; 32], scheme: SigningScheme) -> Result<Signature> {
    let hash = scheme.signing_hash(digest);
    debug!(
        "Signing digest {} with scheme {} (hash {})",
        bytes_to_hex(digest),
        scheme,
        bytes_to_hex(&hash)
    );
    key.sign(&hash)
}

/// Address that produced `signature` over `digest` under `scheme`
pub fn recover_signer(digest: &[u8; 32], scheme: SigningScheme, signature: &Signature) -> Result<Address> {
    recover_address(&scheme.signing_hash(digest), signature)
}

pub fn sign_order(
    key: &PrivateKey,
    domain: &Eip712Domain,
    order: &Order,
    scheme: SigningScheme,
) -> Result<Signature> {
    let digest = order_digest(domain, order)?;
    sign_digest(key, &digest, scheme)
}

/// Sign a batch cancellation (`OrderCancellations(bytes[] orderUids)`)
pub fn sign_cancellations(
    key: &PrivateKey,
    domain: &Eip712Domain,
    order_uids: &[OrderUid],
    scheme: SigningScheme,
) -> Result<Signature> {
    let digest = cancellations_digest(domain, order_uids)?;
    sign_digest(key, &digest, scheme)
}

/// Sign a single cancellation (`OrderCancellation(bytes orderUid)`)
pub fn sign_cancellation(
    key: &PrivateKey,
    domain: &Eip712Domain,
    order_uid: &OrderUid,
    scheme: SigningScheme,
) -> Result<Signature> {
    let digest = cancellation_digest(domain, order_uid)?;
    sign_digest(key, &digest, scheme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::keccak256;

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("ethsign".parse::<SigningScheme>().unwrap(), SigningScheme::EthSign);
        assert_eq!("EIP712".parse::<SigningScheme>().unwrap(), SigningScheme::Eip712);
        assert!("presign".parse::<SigningScheme>().is_err());
        assert_eq!(SigningScheme::default(), SigningScheme::EthSign);
        assert_eq!(serde_json::to_string(&SigningScheme::Eip712).unwrap(), "\"eip712\"");
    }

    #[test]
    fn test_eip712_scheme_signs_digest_directly() {
        let digest = keccak256(b"digest");
        assert_eq!(SigningScheme::Eip712.signing_hash(&digest), digest);
        assert_ne!(SigningScheme::EthSign.signing_hash(&digest), digest);
    }

    #[test]
    fn test_sign_digest_recovers_under_both_schemes() {
        let key = PrivateKey::from_hex(&format!("0x{}", "11".repeat(32))).unwrap();
        let digest = keccak256(b"typed data");
        for scheme in [SigningScheme::Eip712, SigningScheme::EthSign] {
            let signature = sign_digest(&key, &digest, scheme).unwrap();
            assert_eq!(recover_signer(&digest, scheme, &signature).unwrap(), key.address());
        }
    }
}
