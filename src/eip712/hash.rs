//! EIP-712 struct hashing for CoW Protocol orders and cancellations

use num_bigint::BigUint;

use crate::codec::{keccak256, uint_to_word};
use crate::error::{Result, SignerError};
use crate::types::{Order, OrderUid};

use super::domain::Eip712Domain;

/// One `(type name)` member of a struct type, in declared order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedField {
    pub name: &'static str,
    pub ty: &'static str,
}

impl TypedField {
    pub const fn new(name: &'static str, ty: &'static str) -> Self {
        Self { name, ty }
    }
}

/// A field value; checked against the declared Solidity type when encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Address(crate::types::Address),
    Uint(BigUint),
    Bool(bool),
    Bytes32([u8; 32]),
    String(String),
    Bytes(Vec<u8>),
    BytesArray(Vec<Vec<u8>>),
}

pub const ORDER_TYPE_NAME: &str = "Order";

/// GPv2 order struct. `kind` and the balance fields are strings, hashed like any
/// other dynamic value.
pub const ORDER_FIELDS: [TypedField; 12] = [
    TypedField::new("sellToken", "address"),
    TypedField::new("buyToken", "address"),
    TypedField::new("receiver", "address"),
    TypedField::new("sellAmount", "uint256"),
    TypedField::new("buyAmount", "uint256"),
    TypedField::new("validTo", "uint32"),
    TypedField::new("appData", "bytes32"),
    TypedField::new("feeAmount", "uint256"),
    TypedField::new("kind", "string"),
    TypedField::new("partiallyFillable", "bool"),
    TypedField::new("sellTokenBalance", "string"),
    TypedField::new("buyTokenBalance", "string"),
];

pub const CANCELLATIONS_TYPE_NAME: &str = "OrderCancellations";
pub const CANCELLATIONS_FIELDS: [TypedField; 1] = [TypedField::new("orderUids", "bytes[]")];

pub const CANCELLATION_TYPE_NAME: &str = "OrderCancellation";
pub const CANCELLATION_FIELDS: [TypedField; 1] = [TypedField::new("orderUid", "bytes")];

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Canonical type string, e.g. `Foo(address a,uint256 b)`
pub fn type_string(type_name: &str, fields: &[TypedField]) -> String {
    let members: Vec<String> = fields
        .iter()
        .map(|field| format!("{} {}", field.ty, field.name))
        .collect();
    format!("{}({})", type_name, members.join(","))
}

pub fn type_hash(type_name: &str, fields: &[TypedField]) -> [u8; 32] {
    keccak256(type_string(type_name, fields).as_bytes())
}

/// Encode one value into its 32-byte slot
pub fn encode_value(field: &TypedField, value: &TypedValue) -> Result<[u8; 32]> {
    let word = match (field.ty, value) {
        ("address", TypedValue::Address(address)) => address.to_word(),
        (ty, TypedValue::Uint(number)) if ty.starts_with("uint") => {
            let bits = uint_bits(field)?;
            if number.bits() > bits {
                return Err(SignerError::NumberOutOfRange {
                    field: format!("{} ({})", field.name, field.ty),
                });
            }
            uint_to_word(number)?
        }
        ("bool", TypedValue::Bool(flag)) => {
            let mut word = [0u8; 32];
            word[31] = u8::from(*flag);
            word
        }
        ("bytes32", TypedValue::Bytes32(bytes)) => *bytes,
        ("string", TypedValue::String(text)) => keccak256(text.as_bytes()),
        ("bytes", TypedValue::Bytes(bytes)) => keccak256(bytes),
        ("bytes[]", TypedValue::BytesArray(items)) => {
            let mut hashes = Vec::with_capacity(items.len() * 32);
            for item in items {
                hashes.extend_from_slice(&keccak256(item));
            }
            keccak256(&hashes)
        }
        _ => {
            return Err(SignerError::TypeMismatch {
                field: field.name.to_string(),
                expected: field.ty.to_string(),
            });
        }
    };
    Ok(word)
}

fn uint_bits(field: &TypedField) -> Result<u64> {
    let suffix = &field.ty["uint".len()..];
    if suffix.is_empty() {
        return Ok(256);
    }
    match suffix.parse::<u64>() {
        Ok(bits) if bits > 0 && bits <= 256 && bits % 8 == 0 => Ok(bits),
        _ => Err(SignerError::TypeMismatch {
            field: field.name.to_string(),
            expected: field.ty.to_string(),
        }),
    }
}

/// `keccak256(typeHash ‖ enc(v1) ‖ enc(v2) ‖ ...)`
pub fn hash_struct(type_name: &str, fields: &[TypedField], values: &[TypedValue]) -> Result<[u8; 32]> {
    if fields.len() != values.len() {
        return Err(SignerError::InvalidLength {
            field: format!("{} values", type_name),
            expected: fields.len(),
            actual: values.len(),
        });
    }

    let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
    encoded.extend_from_slice(&type_hash(type_name, fields));
    for (field, value) in fields.iter().zip(values) {
        encoded.extend_from_slice(&encode_value(field, value)?);
    }
    Ok(keccak256(&encoded))
}

pub fn hash_domain(domain: &Eip712Domain) -> Result<[u8; 32]> {
    domain.separator()
}

/// `keccak256(0x1901 ‖ domainSeparator ‖ structHash)`
pub fn typed_data_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut message = Vec::with_capacity(66);
    message.extend_from_slice(&[0x19, 0x01]);
    message.extend_from_slice(domain_separator);
    message.extend_from_slice(struct_hash);
    keccak256(&message)
}

pub fn digest(
    domain: &Eip712Domain,
    type_name: &str,
    fields: &[TypedField],
    values: &[TypedValue],
) -> Result<[u8; 32]> {
    let domain_separator = hash_domain(domain)?;
    let struct_hash = hash_struct(type_name, fields, values)?;
    Ok(typed_data_digest(&domain_separator, &struct_hash))
}

/// `keccak256("\x19Ethereum Signed Message:\n32" ‖ digest)`
pub fn personal_message_hash(digest: &[u8; 32]) -> [u8; 32] {
    let mut message = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    message.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    message.extend_from_slice(digest);
    keccak256(&message)
}

pub fn order_values(order: &Order) -> Vec<TypedValue> {
    vec![
        TypedValue::Address(order.sell_token),
        TypedValue::Address(order.buy_token),
        TypedValue::Address(order.receiver),
        TypedValue::Uint(order.sell_amount.clone()),
        TypedValue::Uint(order.buy_amount.clone()),
        TypedValue::Uint(order.valid_to.into()),
        TypedValue::Bytes32(order.app_data),
        TypedValue::Uint(order.fee_amount.clone()),
        TypedValue::String(order.kind.as_str().to_string()),
        TypedValue::Bool(order.partially_fillable),
        TypedValue::String(order.sell_token_balance.as_str().to_string()),
        TypedValue::String(order.buy_token_balance.as_str().to_string()),
    ]
}

pub fn order_struct_hash(order: &Order) -> Result<[u8; 32]> {
    hash_struct(ORDER_TYPE_NAME, &ORDER_FIELDS, &order_values(order))
}

pub fn order_digest(domain: &Eip712Domain, order: &Order) -> Result<[u8; 32]> {
    digest(domain, ORDER_TYPE_NAME, &ORDER_FIELDS, &order_values(order))
}

pub fn cancellations_digest(domain: &Eip712Domain, order_uids: &[OrderUid]) -> Result<[u8; 32]> {
    let uids = order_uids.iter().map(|uid| uid.as_bytes().to_vec()).collect();
    digest(
        domain,
        CANCELLATIONS_TYPE_NAME,
        &CANCELLATIONS_FIELDS,
        &[TypedValue::BytesArray(uids)],
    )
}

pub fn cancellation_digest(domain: &Eip712Domain, order_uid: &OrderUid) -> Result<[u8; 32]> {
    digest(
        domain,
        CANCELLATION_TYPE_NAME,
        &CANCELLATION_FIELDS,
        &[TypedValue::Bytes(order_uid.as_bytes().to_vec())],
    )
}
