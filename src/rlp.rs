//! Recursive Length Prefix encoding
//!
//! Only the encoder is needed: legacy transactions are built here and never
//! decoded. Numeric fields go through [`encode_item`] / [`RlpItem::uint`], which
//! strip leading zero bytes so callers never have to pre-normalize. Raw byte
//! strings (`to`, `data`) go through [`encode_bytes`] untouched.

use num_bigint::BigUint;

use crate::codec::{trim_leading_zeros, uint_to_minimal_be};

const STRING_OFFSET: u8 = 0x80;
const LONG_STRING_OFFSET: u8 = 0xb7;
const LIST_OFFSET: u8 = 0xc0;
const LONG_LIST_OFFSET: u8 = 0xf7;
const SHORT_LIMIT: usize = 55;

/// A byte string or a list of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    String(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// Raw byte string, encoded as-is
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        RlpItem::String(data.into())
    }

    /// Big-endian integer; leading zeros are stripped
    pub fn uint(be_bytes: &[u8]) -> Self {
        RlpItem::String(trim_leading_zeros(be_bytes).to_vec())
    }

    pub fn from_u64(value: u64) -> Self {
        Self::uint(&value.to_be_bytes())
    }

    pub fn from_u128(value: u128) -> Self {
        Self::uint(&value.to_be_bytes())
    }

    pub fn from_biguint(value: &BigUint) -> Self {
        RlpItem::String(uint_to_minimal_be(value))
    }

    pub fn list(items: Vec<RlpItem>) -> Self {
        RlpItem::List(items)
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            RlpItem::String(data) => encode_bytes(data),
            RlpItem::List(items) => {
                let encoded: Vec<Vec<u8>> = items.iter().map(RlpItem::encode).collect();
                encode_list(&encoded)
            }
        }
    }
}

/// Encode a numeric field: leading zero bytes are dropped, so zero becomes `0x80`
pub fn encode_item(data: &[u8]) -> Vec<u8> {
    encode_bytes(trim_leading_zeros(data))
}

pub fn encode_uint(value: &BigUint) -> Vec<u8> {
    encode_bytes(&uint_to_minimal_be(value))
}

pub fn encode_u64(value: u64) -> Vec<u8> {
    encode_item(&value.to_be_bytes())
}

/// Encode a byte string exactly as given
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    match data.len() {
        1 if data[0] < STRING_OFFSET => vec![data[0]],
        len => {
            let mut out = encode_header(len, STRING_OFFSET, LONG_STRING_OFFSET);
            out.extend_from_slice(data);
            out
        }
    }
}

/// Wrap already-encoded children into a list
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let total_len: usize = items.iter().map(Vec::len).sum();
    let mut out = encode_header(total_len, LIST_OFFSET, LONG_LIST_OFFSET);
    out.reserve(total_len);
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

fn encode_header(len: usize, short_offset: u8, long_offset: u8) -> Vec<u8> {
    if len <= SHORT_LIMIT {
        return vec![short_offset + len as u8];
    }
    let len_bytes = trim_leading_zeros(&len.to_be_bytes()).to_vec();
    let mut out = Vec::with_capacity(1 + len_bytes.len() + len);
    out.push(long_offset + len_bytes.len() as u8);
    out.extend_from_slice(&len_bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list() {
        assert_eq!(encode_list(&[]), vec![0xc0]);
        assert_eq!(RlpItem::list(vec![]).encode(), vec![0xc0]);
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(encode_item(&[0x00]), vec![0x80]);
        assert_eq!(encode_item(&[]), vec![0x80]);
        assert_eq!(RlpItem::from_u64(0).encode(), vec![0x80]);
        assert_eq!(RlpItem::from_biguint(&BigUint::from(0u32)).encode(), vec![0x80]);
    }

    #[test]
    fn test_dog() {
        assert_eq!(encode_bytes(b"dog"), vec![0x83, 0x64, 0x6f, 0x67]);
        assert_eq!(
            RlpItem::list(vec![RlpItem::bytes(b"cat".to_vec()), RlpItem::bytes(b"dog".to_vec())]).encode(),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
    }

    #[test]
    fn test_single_bytes() {
        assert_eq!(encode_bytes(&[0x0f]), vec![0x0f]);
        assert_eq!(encode_bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
        // a raw zero byte is a one-byte string, only numeric items collapse to 0x80
        assert_eq!(encode_bytes(&[0x00]), vec![0x00]);
    }

    #[test]
    fn test_numbers_are_normalized() {
        assert_eq!(RlpItem::from_u64(1024).encode(), vec![0x82, 0x04, 0x00]);
        assert_eq!(encode_item(&[0x00, 0x00, 0x04, 0x00]), vec![0x82, 0x04, 0x00]);
        assert_eq!(RlpItem::from_u128(15).encode(), vec![0x0f]);
        assert_eq!(encode_u64(0), vec![0x80]);
        assert_eq!(encode_u64(21_000), vec![0x82, 0x52, 0x08]);
        assert_eq!(encode_uint(&BigUint::from(1024u32)), vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn test_long_string() {
        let data = vec![b'a'; 56];
        let encoded = encode_bytes(&data);
        assert_eq!(&encoded[..2], &[0xb8, 56]);
        assert_eq!(encoded.len(), 58);

        let data = vec![0x11; 1024];
        let encoded = encode_bytes(&data);
        assert_eq!(&encoded[..3], &[0xb9, 0x04, 0x00]);
    }

    #[test]
    fn test_long_list() {
        let child = encode_bytes(&vec![b'a'; 60]);
        let encoded = encode_list(&[child.clone()]);
        assert_eq!(&encoded[..2], &[0xf8, 62]);
        assert_eq!(&encoded[2..], child.as_slice());
    }

    #[test]
    fn test_set_theoretic_nesting() {
        // [ [], [[]], [ [], [[]] ] ]
        let empty = RlpItem::list(vec![]);
        let one = RlpItem::list(vec![empty.clone()]);
        let two = RlpItem::list(vec![empty.clone(), one.clone()]);
        let item = RlpItem::list(vec![empty, one, two]);
        assert_eq!(item.encode(), vec![0xc7, 0xc0, 0xc1, 0xc0, 0xc3, 0xc0, 0xc1, 0xc0]);
    }
}
