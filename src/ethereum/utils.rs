use alloy::primitives::Address;
use std::str::FromStr;

use crate::error::{InvokeError, InvokeResult};

/// Validates and parses a contract address
pub fn validate_address(address: &str) -> InvokeResult<Address> {
    let address = address.trim();
    let invalid = |reason: &str| InvokeError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    if address.is_empty() {
        return Err(invalid("address cannot be empty"));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(invalid("addresses must start with '0x'"));
    }

    if address.len() != 42 {
        return Err(invalid(
            "addresses must be exactly 42 characters (0x + 40 hex characters)",
        ));
    }

    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("contains non-hexadecimal characters"));
    }

    Address::from_str(address).map_err(|e| invalid(&e.to_string()))
}

pub fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Normalises a method argument like `transfer(address, uint256)` for signature comparison.
pub fn normalize_signature(signature: &str) -> String {
    signature.chars().filter(|c| !c.is_whitespace()).collect()
}
