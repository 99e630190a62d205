//! Embedded contract interfaces and the encode/decode helpers shared by the
//! call gateway and the wallet simulation.

use std::str::FromStr;
use std::sync::OnceLock;

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, B256, U256};

use crate::domain::ContractName;
use crate::error::WalletError;

const COMPLIANCE_REGISTRY_JSON: &str = include_str!("../abi/compliance_registry.json");
const TITLE_NFT_JSON: &str = include_str!("../abi/title_nft.json");
const FRACTIONALIZER_JSON: &str = include_str!("../abi/fractionalizer.json");
const RENT_POOL_MERKLE_JSON: &str = include_str!("../abi/rent_pool_merkle.json");

/// Selector of the standard `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Parsed interface for one of the deployed contracts. Parsing happens once
/// per process; the embedded JSON is part of the build.
pub fn interface(name: ContractName) -> &'static JsonAbi {
    static COMPLIANCE: OnceLock<JsonAbi> = OnceLock::new();
    static TITLE: OnceLock<JsonAbi> = OnceLock::new();
    static FRACTIONALIZER: OnceLock<JsonAbi> = OnceLock::new();
    static RENT_POOL: OnceLock<JsonAbi> = OnceLock::new();

    let (slot, raw) = match name {
        ContractName::ComplianceRegistry => (&COMPLIANCE, COMPLIANCE_REGISTRY_JSON),
        ContractName::TitleNft => (&TITLE, TITLE_NFT_JSON),
        ContractName::Fractionalizer => (&FRACTIONALIZER, FRACTIONALIZER_JSON),
        ContractName::RentPoolMerkle => (&RENT_POOL, RENT_POOL_MERKLE_JSON),
    };
    slot.get_or_init(|| {
        serde_json::from_str(raw).expect("embedded contract interface is valid json abi")
    })
}

/// Look up a method on an interface. None of the deployed interfaces carry
/// overloads, so the first entry is the only entry.
pub fn resolve_function<'a>(
    abi: &'a JsonAbi,
    method: &str,
) -> Result<&'a Function, WalletError> {
    abi.function(method)
        .and_then(|overloads| overloads.first())
        .ok_or_else(|| WalletError::DecodeError(format!("method not on interface: {method}")))
}

/// Decode the human-readable reason out of an `Error(string)` revert
/// payload, accepting the usual `0x`-prefixed hex wire form. The layout is
/// fixed: selector, 32-byte offset, 32-byte length, padded UTF-8 bytes.
pub fn decode_revert_reason(hex_payload: &str) -> Option<String> {
    let stripped = hex_payload.trim_start_matches("0x");
    let bytes = alloy::hex::decode(stripped).ok()?;
    if bytes.len() < 4 + 64 || bytes[0..4] != ERROR_STRING_SELECTOR {
        return None;
    }
    let body = &bytes[4..];
    let offset = usize::try_from(U256::from_be_slice(&body[0..32])).ok()?;
    let len_start = offset.checked_add(32)?;
    if body.len() < len_start {
        return None;
    }
    let len = usize::try_from(U256::from_be_slice(&body[offset..len_start])).ok()?;
    let data = body.get(len_start..len_start.checked_add(len)?)?;
    String::from_utf8(data.to_vec()).ok()
}

/// Build an `Error(string)` revert payload. Used by the wallet simulation to
/// produce wire-faithful rejection data.
pub fn encode_revert_reason(reason: &str) -> String {
    let utf8 = reason.as_bytes();
    let padded_len = utf8.len().div_ceil(32) * 32;
    let mut payload = Vec::with_capacity(4 + 64 + padded_len);
    payload.extend_from_slice(&ERROR_STRING_SELECTOR);
    payload.extend_from_slice(&U256::from(32u64).to_be_bytes::<32>());
    payload.extend_from_slice(&U256::from(utf8.len() as u64).to_be_bytes::<32>());
    payload.extend_from_slice(utf8);
    payload.resize(4 + 64 + padded_len, 0);
    format!("0x{}", alloy::hex::encode(payload))
}

pub(crate) fn as_bool(value: &DynSolValue) -> Result<bool, WalletError> {
    match value {
        DynSolValue::Bool(b) => Ok(*b),
        other => Err(type_mismatch("bool", other)),
    }
}

pub(crate) fn as_u256(value: &DynSolValue) -> Result<U256, WalletError> {
    match value {
        DynSolValue::Uint(v, _) => Ok(*v),
        other => Err(type_mismatch("uint", other)),
    }
}

pub(crate) fn as_u64(value: &DynSolValue) -> Result<u64, WalletError> {
    let wide = as_u256(value)?;
    u64::try_from(wide).map_err(|_| {
        WalletError::DecodeError(format!("chain integer {wide} does not fit in u64"))
    })
}

pub(crate) fn as_address(value: &DynSolValue) -> Result<Address, WalletError> {
    match value {
        DynSolValue::Address(a) => Ok(*a),
        other => Err(type_mismatch("address", other)),
    }
}

pub(crate) fn as_string(value: &DynSolValue) -> Result<String, WalletError> {
    match value {
        DynSolValue::String(s) => Ok(s.clone()),
        other => Err(type_mismatch("string", other)),
    }
}

pub(crate) fn as_b256(value: &DynSolValue) -> Result<B256, WalletError> {
    match value {
        DynSolValue::FixedBytes(word, 32) => Ok(*word),
        other => Err(type_mismatch("bytes32", other)),
    }
}

pub(crate) fn as_tuple(value: &DynSolValue) -> Result<&[DynSolValue], WalletError> {
    match value {
        DynSolValue::Tuple(items) => Ok(items),
        other => Err(type_mismatch("tuple", other)),
    }
}

/// Exactly-one-output extraction for single-return reads.
pub(crate) fn single(values: Vec<DynSolValue>) -> Result<DynSolValue, WalletError> {
    let mut iter = values.into_iter();
    match (iter.next(), iter.next()) {
        (Some(value), None) => Ok(value),
        (first, _) => Err(WalletError::DecodeError(format!(
            "expected a single return value, got {}",
            if first.is_none() { 0 } else { 2 }
        ))),
    }
}

fn type_mismatch(expected: &str, got: &DynSolValue) -> WalletError {
    WalletError::DecodeError(format!("expected {expected}, got {}", value_kind(got)))
}

fn value_kind(value: &DynSolValue) -> &'static str {
    match value {
        DynSolValue::Address(_) => "address",
        DynSolValue::Bool(_) => "bool",
        DynSolValue::Bytes(_) => "bytes",
        DynSolValue::FixedBytes(_, _) => "fixed bytes",
        DynSolValue::Int(_, _) => "int",
        DynSolValue::Uint(_, _) => "uint",
        DynSolValue::String(_) => "string",
        DynSolValue::Array(_) => "array",
        DynSolValue::FixedArray(_) => "fixed array",
        DynSolValue::Tuple(_) => "tuple",
        _ => "unsupported value",
    }
}

/// Parse a hex quantity string (`0x`-prefixed or bare) into a `U256`.
pub(crate) fn parse_quantity(raw: &str) -> Result<U256, WalletError> {
    let stripped = raw.trim_start_matches("0x").trim_start_matches("0X");
    U256::from_str_radix(stripped, 16)
        .map_err(|e| WalletError::DecodeError(format!("invalid hex quantity '{raw}': {e}")))
}

/// Parse a hex chain id as delivered by `eth_chainId` / `chainChanged`.
pub fn parse_chain_id(raw: &str) -> Result<u64, WalletError> {
    if raw.starts_with("0x") || raw.starts_with("0X") {
        u64::from_str_radix(raw.trim_start_matches("0x").trim_start_matches("0X"), 16)
            .map_err(|e| WalletError::DecodeError(format!("invalid hex chain id '{raw}': {e}")))
    } else {
        u64::from_str(raw)
            .map_err(|e| WalletError::DecodeError(format!("invalid chain id '{raw}': {e}")))
    }
}
