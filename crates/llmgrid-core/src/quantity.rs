//! Resource quantity parsing.
//!
//! Accepts the Kubernetes-style notation used in workload specs and config:
//!
//! - CPU: `"1000m"` (millicores) or `"2"`, `"0.5"` (cores). Bare integers are millicores.
//! - Memory: `"2Gi"`, `"512Mi"`, `"1G"`, `"1500"` (bytes). Bare integers are bytes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a resource quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("invalid quantity: {0:?}")]
    Invalid(String),

    #[error("quantity must not be negative: {0}")]
    Negative(i64),

    #[error("quantity out of range: {0:?}")]
    Overflow(String),
}

pub type QuantityResult<T> = Result<T, QuantityError>;

/// A quantity as it appears on the wire: a raw integer or a suffixed string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuantityValue {
    Int(i64),
    Text(String),
}

impl QuantityValue {
    /// Resolve as CPU millicores.
    pub fn cpu_millis(&self) -> QuantityResult<u64> {
        match self {
            QuantityValue::Int(n) => non_negative(*n),
            QuantityValue::Text(s) => parse_cpu_millis(s),
        }
    }

    /// Resolve as memory bytes.
    pub fn memory_bytes(&self) -> QuantityResult<u64> {
        match self {
            QuantityValue::Int(n) => non_negative(*n),
            QuantityValue::Text(s) => parse_memory_bytes(s),
        }
    }
}

impl From<&str> for QuantityValue {
    fn from(s: &str) -> Self {
        QuantityValue::Text(s.to_string())
    }
}

impl From<i64> for QuantityValue {
    fn from(n: i64) -> Self {
        QuantityValue::Int(n)
    }
}

fn non_negative(n: i64) -> QuantityResult<u64> {
    u64::try_from(n).map_err(|_| QuantityError::Negative(n))
}

/// Parse a CPU quantity into millicores.
pub fn parse_cpu_millis(input: &str) -> QuantityResult<u64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(QuantityError::Empty);
    }
    if let Some(millis) = s.strip_suffix('m') {
        return parse_scaled(millis, 1, input);
    }
    parse_scaled(s, 1000, input)
}

/// Parse a memory quantity into bytes.
pub fn parse_memory_bytes(input: &str) -> QuantityResult<u64> {
    const SUFFIXES: &[(&str, u64)] = &[
        ("Ki", 1 << 10),
        ("Mi", 1 << 20),
        ("Gi", 1 << 30),
        ("Ti", 1 << 40),
        ("Pi", 1 << 50),
        ("k", 1_000),
        ("K", 1_000),
        ("M", 1_000_000),
        ("G", 1_000_000_000),
        ("T", 1_000_000_000_000),
        ("P", 1_000_000_000_000_000),
    ];

    let s = input.trim();
    if s.is_empty() {
        return Err(QuantityError::Empty);
    }
    for (suffix, multiplier) in SUFFIXES {
        if let Some(number) = s.strip_suffix(suffix) {
            return parse_scaled(number, *multiplier, input);
        }
    }
    parse_scaled(s, 1, input)
}

/// Parse a non-negative decimal number and multiply it by `multiplier`,
/// without going through floating point.
fn parse_scaled(number: &str, multiplier: u64, original: &str) -> QuantityResult<u64> {
    let invalid = || QuantityError::Invalid(original.to_string());
    let overflow = || QuantityError::Overflow(original.to_string());

    if number.starts_with('-') {
        return Err(invalid());
    }

    let (whole, frac) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_value: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let mut total = whole_value.checked_mul(multiplier).ok_or_else(overflow)?;

    if !frac.is_empty() {
        let digits = u32::try_from(frac.len()).map_err(|_| invalid())?;
        let scale = 10u64.checked_pow(digits).ok_or_else(invalid)?;
        let frac_value: u64 = frac.parse().map_err(|_| invalid())?;
        let scaled = frac_value.checked_mul(multiplier).ok_or_else(overflow)?;
        // Sub-unit precision is not representable.
        if scaled % scale != 0 {
            return Err(invalid());
        }
        total = total.checked_add(scaled / scale).ok_or_else(overflow)?;
    }

    Ok(total)
}
