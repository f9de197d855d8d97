//! Legacy (type 0) Ethereum transactions with EIP-155 replay protection

use num_bigint::BigUint;

use crate::codec::{bytes_to_hex, keccak256};
use crate::ecdsa::{PrivateKey, Signature};
use crate::error::Result;
use crate::rlp::RlpItem;
use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: BigUint,
    pub gas_limit: u64,
    pub to: Address,
    pub value: BigUint,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// Signed RLP bytes ready for `eth_sendRawTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub signature: Signature,
    pub v: u64,
}

impl LegacyTransaction {
    fn payload_fields(&self) -> Vec<RlpItem> {
        vec![
            RlpItem::from_u64(self.nonce),
            RlpItem::from_biguint(&self.gas_price),
            RlpItem::from_u64(self.gas_limit),
            RlpItem::bytes(self.to.as_bytes().to_vec()),
            RlpItem::from_biguint(&self.value),
            RlpItem::bytes(self.data.clone()),
        ]
    }

    /// `rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, "", ""])`
    pub fn unsigned_rlp(&self) -> Vec<u8> {
        let mut fields = self.payload_fields();
        fields.push(RlpItem::from_u64(self.chain_id));
        fields.push(RlpItem::uint(&[]));
        fields.push(RlpItem::uint(&[]));
        RlpItem::list(fields).encode()
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.unsigned_rlp())
    }

    /// Sign and encode as `rlp([nonce, gasPrice, gasLimit, to, value, data, v, r, s])`
    pub fn sign(&self, key: &PrivateKey) -> Result<SignedTransaction> {
        let signature = key.sign(&self.signing_hash())?;
        Ok(self.with_signature(signature))
    }

    pub fn with_signature(&self, signature: Signature) -> SignedTransaction {
        let v = signature.eip155_v(self.chain_id);
        let mut fields = self.payload_fields();
        fields.push(RlpItem::from_u64(v));
        fields.push(RlpItem::uint(&signature.r));
        fields.push(RlpItem::uint(&signature.s));

        SignedTransaction {
            raw: RlpItem::list(fields).encode(),
            signature,
            v,
        }
    }
}

impl SignedTransaction {
    /// keccak256 of the raw bytes, the hash nodes report for the transaction
    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.raw)
    }

    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::hex_to_bytes;
    use crate::ecdsa::recover_address;

    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 9,
            gas_price: BigUint::from(20_000_000_000u64),
            gas_limit: 21_000,
            to: Address([0x35; 20]),
            value: BigUint::from(1_000_000_000_000_000_000u64),
            data: Vec::new(),
            chain_id: 1,
        }
    }

    #[test]
    fn test_eip155_signing_payload() {
        let tx = eip155_example();
        assert_eq!(
            bytes_to_hex(&tx.unsigned_rlp()),
            "0xec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            bytes_to_hex(&tx.signing_hash()),
            "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed_transaction() {
        let key = PrivateKey::from_hex(&format!("0x{}", "46".repeat(32))).unwrap();
        let signed = eip155_example().sign(&key).unwrap();

        assert_eq!(signed.v, 37);
        assert_eq!(
            signed.to_hex(),
            "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
        assert_eq!(
            recover_address(&eip155_example().signing_hash(), &signed.signature).unwrap(),
            key.address()
        );
        assert_eq!(signed.hash(), keccak256(&signed.raw));
    }

    #[test]
    fn test_approve_transaction_payload() {
        let mut data = hex_to_bytes("0x095ea7b3").unwrap();
        let mut word = [0u8; 32];
        word[31] = 1;
        data.extend_from_slice(&word);
        data.extend_from_slice(&word);

        let tx = LegacyTransaction {
            nonce: 5,
            gas_price: BigUint::from(30_000_000_000u64),
            gas_limit: 100_000,
            to: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse().unwrap(),
            value: BigUint::from(0u32),
            data,
            chain_id: 1,
        };
        let expected = format!(
            "0xf86a058506fc23ac00830186a094a0b86991c6218b36c1d19d4a2e9eb0ce3606eb4880b844095ea7b3{}{}018080",
            format!("{}01", "00".repeat(31)),
            format!("{}01", "00".repeat(31)),
        );
        assert_eq!(bytes_to_hex(&tx.unsigned_rlp()), expected);
        assert_eq!(
            bytes_to_hex(&tx.signing_hash()),
            "0x2ab1f08c65fa453de4c772befade2f081f9ab6d2e7c79a99f08ec0205a6be5e6"
        );
    }

    #[test]
    fn test_v_tracks_chain_id() {
        let key = PrivateKey::from_hex(&format!("0x{}", "46".repeat(32))).unwrap();
        let mut tx = eip155_example();
        tx.chain_id = 100;
        let signed = tx.sign(&key).unwrap();
        assert_eq!(signed.v, 235 + signed.signature.recovery as u64);
        assert_eq!(recover_address(&tx.signing_hash(), &signed.signature).unwrap(), key.address());
    }

    #[test]
    fn test_address_with_leading_zero_is_not_stripped() {
        let mut tx = eip155_example();
        tx.to = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let encoded = tx.unsigned_rlp();
        // 0x94 = 20-byte string header
        let needle = [&[0x94u8][..], &[0u8; 19][..], &[0xaa][..]].concat();
        assert!(encoded.windows(needle.len()).any(|w| w == needle.as_slice()));
    }
}
