use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{I256, U256};
use num_bigint::{BigInt, Sign};
use num_traits::One;
use std::fmt;
use std::str::FromStr;

use crate::error::{InvokeError, InvokeResult};

/// A raw command-line token after coercion.
///
/// Numbers keep the token they came from so nothing is lost when they are
/// sent as text or as whole integers.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArg {
    Bool(bool),
    Integer { value: BigInt, raw: String },
    Decimal { value: f64, raw: String },
    Str(String),
}

impl TypedArg {
    /// Coerce a raw token: `true`/`false` first, then numbers, then text.
    ///
    /// There is no escape for text that looks like a bool or a number.
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }

        if is_numeric(raw) {
            if raw.contains('.') {
                if let Ok(value) = raw.parse::<f64>() {
                    return Self::Decimal {
                        value,
                        raw: raw.to_string(),
                    };
                }
            } else if let Ok(value) = BigInt::from_str(raw.strip_prefix('+').unwrap_or(raw)) {
                return Self::Integer {
                    value,
                    raw: raw.to_string(),
                };
            }
        }

        Self::Str(raw.to_string())
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer { .. } => "integer",
            Self::Decimal { .. } => "decimal",
            Self::Str(_) => "string",
        }
    }

    /// Convert to an ABI value of the given Solidity type.
    pub fn to_sol_value(&self, ty: &DynSolType) -> InvokeResult<DynSolValue> {
        match (self, ty) {
            (_, DynSolType::String) => Ok(DynSolValue::String(self.to_string())),
            (Self::Bool(b), DynSolType::Bool) => Ok(DynSolValue::Bool(*b)),
            (Self::Integer { value, .. }, DynSolType::Uint(_) | DynSolType::Int(_)) => {
                integer_value(value, ty)
            }
            (Self::Decimal { raw, .. }, DynSolType::Uint(_) | DynSolType::Int(_)) => {
                integer_value(&whole_decimal(raw, ty)?, ty)
            }
            (Self::Str(s), _) => ty.coerce_str(s).map_err(|e| {
                InvokeError::argument(format!("Cannot use '{}' as {}: {}", s, ty, e))
            }),
            (other, _) => Err(InvokeError::argument(format!(
                "Cannot use {} '{}' as {}",
                other.kind(),
                other,
                ty
            ))),
        }
    }
}

/// Shows the token as typed.
impl fmt::Display for TypedArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer { raw, .. } | Self::Decimal { raw, .. } => f.write_str(raw),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Coerce every raw token in order.
pub fn coerce_all(raw: &[String]) -> Vec<TypedArg> {
    raw.iter().map(|token| TypedArg::coerce(token)).collect()
}

/// Exact integer value of a decimal token whose fraction is all zeros.
///
/// Read from the digits, never from the `f64`, which rounds past 2^53.
fn whole_decimal(raw: &str, ty: &DynSolType) -> InvokeResult<BigInt> {
    let (negative, body) = match raw.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));

    if fraction.chars().any(|c| c != '0') {
        return Err(InvokeError::argument(format!(
            "Decimal {} cannot be used as {}: it has a fractional part",
            raw, ty
        )));
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let value = BigInt::from_str(whole)
        .map_err(|e| InvokeError::argument(format!("Invalid decimal {}: {}", raw, e)))?;
    Ok(if negative { -value } else { value })
}

/// Optional sign, then digits with at most one '.'; at least one digit.
fn is_numeric(raw: &str) -> bool {
    let body = raw
        .strip_prefix('-')
        .or_else(|| raw.strip_prefix('+'))
        .unwrap_or(raw);

    let mut digits = 0;
    let mut dots = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

fn integer_value(n: &BigInt, ty: &DynSolType) -> InvokeResult<DynSolValue> {
    let out_of_range = || InvokeError::argument(format!("Integer {} is out of range for {}", n, ty));

    match ty {
        DynSolType::Uint(bits) => {
            if n.sign() == Sign::Minus || n.bits() > *bits as u64 {
                return Err(out_of_range());
            }
            let value = U256::from_str(&n.to_string()).map_err(|_| out_of_range())?;
            Ok(DynSolValue::Uint(value, *bits))
        }
        DynSolType::Int(bits) => {
            let limit = BigInt::one() << (*bits - 1);
            if *n >= limit || *n < -limit {
                return Err(out_of_range());
            }
            let value = I256::from_dec_str(&n.to_string()).map_err(|_| out_of_range())?;
            Ok(DynSolValue::Int(value, *bits))
        }
        _ => Err(InvokeError::argument(format!("{} is not an integer type", ty))),
    }
}
