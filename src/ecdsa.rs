//! secp256k1 signing and Ethereum address derivation
//!
//! Digests handed to [`PrivateKey::sign`] are already hashed; nothing here
//! hashes again. Signatures come out in low-s form with the recovery id the
//! curve library reports.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature as CurveSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::codec::{bytes_to_hex, hex_to_bytes, keccak256, strip_0x_prefix};
use crate::error::{Result, SignerError};
use crate::types::Address;

pub const PRIVATE_KEY_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 65;
pub const SIGNATURE_LEN: usize = 65;

/// A secp256k1 secret key. Never printed or logged.
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

impl PrivateKey {
    /// Parse a `0x`-prefixed (or bare) 64-hex-digit key
    pub fn from_hex(value: &str) -> Result<Self> {
        let digits = strip_0x_prefix(value.trim());
        if digits.len() != PRIVATE_KEY_LEN * 2 {
            return Err(SignerError::InvalidPrivateKey(format!(
                "expected {} hex digits, got {}",
                PRIVATE_KEY_LEN * 2,
                digits.len()
            )));
        }
        let bytes = hex_to_bytes(digits)
            .map_err(|_| SignerError::InvalidPrivateKey("not valid hex".to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(SignerError::InvalidLength {
                field: "private key".to_string(),
                expected: PRIVATE_KEY_LEN,
                actual: bytes.len(),
            });
        }
        let key = SigningKey::from_slice(bytes).map_err(|_| {
            SignerError::InvalidPrivateKey("scalar is zero or not below the curve order".to_string())
        })?;
        Ok(Self { key })
    }

    /// Uncompressed SEC1 public key (`0x04 ‖ x ‖ y`)
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        encode_uncompressed(self.key.verifying_key())
    }

    pub fn address(&self) -> Address {
        address_from_uncompressed(&self.public_key())
    }

    /// Sign a 32-byte digest
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| SignerError::Signing(e.to_string()))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(Signature {
            r,
            s,
            recovery: recovery_id.to_byte(),
        })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(<redacted>)")
    }
}

/// ECDSA signature with its recovery id (0 or 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery: u8,
}

impl Signature {
    /// `v` for EIP-712 / personal-sign signatures: 27 or 28
    pub fn compact_v(&self) -> u8 {
        self.recovery + 27
    }

    /// `v` for an EIP-155 transaction on `chain_id`
    pub fn eip155_v(&self, chain_id: u64) -> u64 {
        chain_id * 2 + 35 + self.recovery as u64
    }

    /// 65-byte `r ‖ s ‖ v` with `v ∈ {27, 28}`
    pub fn to_compact_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.compact_v();
        out
    }

    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.to_compact_bytes())
    }

    /// Parse a 65-byte `r ‖ s ‖ v` signature; `v` may be 0/1 or 27/28
    pub fn from_compact(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(SignerError::InvalidLength {
                field: "signature".to_string(),
                expected: SIGNATURE_LEN,
                actual: bytes.len(),
            });
        }
        let recovery = match bytes[64] {
            0 | 1 => bytes[64],
            27 | 28 => bytes[64] - 27,
            other => {
                return Err(SignerError::Signing(format!("invalid recovery byte {}", other)));
            }
        };
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, recovery })
    }
}

/// Sign a digest with a raw 32-byte private key
pub fn sign(digest: &[u8; 32], private_key: &[u8]) -> Result<Signature> {
    PrivateKey::from_bytes(private_key)?.sign(digest)
}

pub fn derive_public_key(private_key: &[u8]) -> Result<[u8; PUBLIC_KEY_LEN]> {
    Ok(PrivateKey::from_bytes(private_key)?.public_key())
}

pub fn derive_address(private_key: &[u8]) -> Result<Address> {
    Ok(PrivateKey::from_bytes(private_key)?.address())
}

/// Recover the signer address of `digest` from `(r, s, recovery)`
pub fn recover_address(digest: &[u8; 32], signature: &Signature) -> Result<Address> {
    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&signature.r);
    rs[32..].copy_from_slice(&signature.s);

    let curve_signature =
        CurveSignature::from_slice(&rs).map_err(|e| SignerError::Signing(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature.recovery).ok_or_else(|| {
        SignerError::Signing(format!("invalid recovery id {}", signature.recovery))
    })?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &curve_signature, recovery_id)
        .map_err(|e| SignerError::Signing(e.to_string()))?;

    Ok(address_from_uncompressed(&encode_uncompressed(&verifying_key)))
}

fn encode_uncompressed(key: &VerifyingKey) -> [u8; PUBLIC_KEY_LEN] {
    let point = key.to_encoded_point(false);
    let mut out = [0u8; PUBLIC_KEY_LEN];
    out.copy_from_slice(point.as_bytes());
    out
}

/// keccak256 of `x ‖ y` (prefix byte dropped), last 20 bytes
fn address_from_uncompressed(public_key: &[u8; PUBLIC_KEY_LEN]) -> Address {
    let hash = keccak256(&public_key[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address(address)
}
