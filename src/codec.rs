//! Hash and hex/byte helpers shared by every other module
//!
//! All hex produced here is lowercase and `0x`-prefixed. Byte-string hex must
//! have an even number of digits; JSON-RPC quantities (`0x1a`) are parsed
//! separately with [`parse_quantity`] since they are minimal-width.

use num_bigint::BigUint;
use num_traits::Zero;
use sha3::{Digest, Keccak256};

use crate::error::{Result, SignerError};

/// Keccak-256 (the pre-standard SHA3 variant Ethereum uses)
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    let result = hasher.finalize();

    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// First four bytes of `keccak256(signature)`
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Remove a leading `0x`/`0X` if present
pub fn strip_0x_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Lowercase and make sure the value carries exactly one `0x` prefix
pub fn add_0x_prefix(value: &str) -> String {
    format!("0x{}", strip_0x_prefix(value.trim()).to_lowercase())
}

/// Decode an even-length hex string, with or without `0x`
pub fn hex_to_bytes(value: &str) -> Result<Vec<u8>> {
    let digits = strip_0x_prefix(value.trim());
    if digits.len() % 2 != 0 {
        return Err(SignerError::InvalidHex {
            value: value.to_string(),
        });
    }
    hex::decode(digits).map_err(|_| SignerError::InvalidHex {
        value: value.to_string(),
    })
}

/// Decode hex into a fixed-size array, rejecting any other length
pub fn hex_to_array<const N: usize>(field: &str, value: &str) -> Result<[u8; N]> {
    let bytes = hex_to_bytes(value)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| SignerError::InvalidLength {
        field: field.to_string(),
        expected: N,
        actual: bytes.len(),
    })
}

/// Encode bytes as lowercase `0x`-prefixed hex
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Left-pad `value` with zero bytes up to `len`.
///
/// Values longer than `len` are rejected rather than truncated.
pub fn pad_left(value: &[u8], len: usize) -> Result<Vec<u8>> {
    if value.len() > len {
        return Err(SignerError::NumberOutOfRange {
            field: format!("{}-byte word", len),
        });
    }
    let mut out = vec![0u8; len - value.len()];
    out.extend_from_slice(value);
    Ok(out)
}

/// Left-pad to a single 32-byte ABI word
pub fn pad32(value: &[u8]) -> Result<[u8; 32]> {
    let padded = pad_left(value, 32)?;
    let mut word = [0u8; 32];
    word.copy_from_slice(&padded);
    Ok(word)
}

pub fn trim_leading_zeros(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| *b != 0).unwrap_or(data.len());
    &data[start..]
}

/// Big-endian 32-byte word for a uint256
pub fn uint_to_word(value: &BigUint) -> Result<[u8; 32]> {
    if value.is_zero() {
        return Ok([0u8; 32]);
    }
    pad32(&value.to_bytes_be()).map_err(|_| SignerError::NumberOutOfRange {
        field: "uint256".to_string(),
    })
}

/// Minimal big-endian bytes of an integer (empty for zero)
pub fn uint_to_minimal_be(value: &BigUint) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_bytes_be()
    }
}

/// Parse a JSON-RPC quantity or `eth_call` word (`0x`, `0x0`, `0x1a`, 32-byte words)
pub fn parse_quantity(value: &str) -> Result<BigUint> {
    let digits = strip_0x_prefix(value.trim());
    if digits.is_empty() {
        return Ok(BigUint::zero());
    }
    BigUint::parse_bytes(digits.as_bytes(), 16).ok_or_else(|| SignerError::InvalidHex {
        value: value.to_string(),
    })
}

/// Minimal `0x` quantity encoding used in JSON-RPC params
pub fn to_quantity(value: &BigUint) -> String {
    format!("0x{}", value.to_str_radix(16))
}

/// Convert a human decimal amount ("1.5") into integer base units using token decimals
pub fn to_base_units(amount: &str, decimals: u8) -> Result<BigUint> {
    let trimmed = amount.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    let out_of_range = || SignerError::NumberOutOfRange {
        field: format!("amount {} with {} decimals", amount, decimals),
    };
    if fraction.len() > decimals as usize {
        return Err(out_of_range());
    }
    if whole.is_empty() && fraction.is_empty() {
        return Err(out_of_range());
    }
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return Err(out_of_range());
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat('0').take(decimals as usize - fraction.len()));
    if digits.is_empty() {
        return Ok(BigUint::zero());
    }
    BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(out_of_range)
}

/// Inverse of [`to_base_units`]; trailing fractional zeros are dropped
pub fn from_base_units(value: &BigUint, decimals: u8) -> String {
    let raw = value.to_str_radix(10);
    let decimals = decimals as usize;
    if decimals == 0 {
        return raw;
    }
    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - raw.len()), raw)
    } else {
        raw
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// EIP-55 mixed-case checksum encoding of a 20-byte address
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
