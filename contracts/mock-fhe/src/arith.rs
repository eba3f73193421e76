//! Width-aware plaintext arithmetic behind every mock ciphertext operation.
//!
//! Values are carried as `u64` and truncated to the width of their kind after
//! every operation, so `U8` arithmetic wraps modulo 256 exactly like an 8-bit
//! encrypted integer would. Shift and rotate amounts are taken modulo the
//! width of the shifted value.

use crate::CoprocessorError;

pub const KIND_BOOL: u32 = 0;
pub const KIND_U8: u32 = 1;
pub const KIND_U64: u32 = 2;

/// Bit width of a kind.
pub fn width(kind: u32) -> Result<u32, CoprocessorError> {
    match kind {
        KIND_BOOL => Ok(1),
        KIND_U8 => Ok(8),
        KIND_U64 => Ok(64),
        _ => Err(CoprocessorError::UnknownKind),
    }
}

pub fn truncate(kind: u32, value: u64) -> Result<u64, CoprocessorError> {
    let bits = width(kind)?;
    if bits == 64 {
        Ok(value)
    } else {
        Ok(value & ((1u64 << bits) - 1))
    }
}

fn integer_width(kind: u32) -> Result<u32, CoprocessorError> {
    if kind == KIND_BOOL {
        return Err(CoprocessorError::KindMismatch);
    }
    width(kind)
}

pub fn add(kind: u32, lhs: u64, rhs: u64) -> Result<u64, CoprocessorError> {
    integer_width(kind)?;
    truncate(kind, lhs.wrapping_add(rhs))
}

pub fn sub(kind: u32, lhs: u64, rhs: u64) -> Result<u64, CoprocessorError> {
    integer_width(kind)?;
    truncate(kind, lhs.wrapping_sub(rhs))
}

pub fn and(kind: u32, lhs: u64, rhs: u64) -> Result<u64, CoprocessorError> {
    truncate(kind, lhs & rhs)
}

pub fn or(kind: u32, lhs: u64, rhs: u64) -> Result<u64, CoprocessorError> {
    truncate(kind, lhs | rhs)
}

pub fn not(kind: u32, value: u64) -> Result<u64, CoprocessorError> {
    truncate(kind, !value)
}

pub fn shl(kind: u32, value: u64, amount: u64) -> Result<u64, CoprocessorError> {
    let bits = integer_width(kind)?;
    let shift = (amount % bits as u64) as u32;
    truncate(kind, value << shift)
}

pub fn shr(kind: u32, value: u64, amount: u64) -> Result<u64, CoprocessorError> {
    let bits = integer_width(kind)?;
    let shift = (amount % bits as u64) as u32;
    truncate(kind, value >> shift)
}

pub fn rotr(kind: u32, value: u64, amount: u64) -> Result<u64, CoprocessorError> {
    let bits = integer_width(kind)?;
    let shift = (amount % bits as u64) as u32;
    let value = truncate(kind, value)?;
    if shift == 0 {
        return Ok(value);
    }
    truncate(kind, (value >> shift) | (value << (bits - shift)))
}

pub fn div(kind: u32, value: u64, divisor: u64) -> Result<u64, CoprocessorError> {
    integer_width(kind)?;
    if divisor == 0 {
        return Err(CoprocessorError::DivisionByZero);
    }
    truncate(kind, value / divisor)
}

pub fn rem(kind: u32, value: u64, divisor: u64) -> Result<u64, CoprocessorError> {
    integer_width(kind)?;
    if divisor == 0 {
        return Err(CoprocessorError::DivisionByZero);
    }
    truncate(kind, value % divisor)
}

pub fn eq(lhs: u64, rhs: u64) -> u64 {
    (lhs == rhs) as u64
}

pub fn gt(lhs: u64, rhs: u64) -> u64 {
    (lhs > rhs) as u64
}

pub fn select(cond: u64, if_true: u64, if_false: u64) -> u64 {
    if cond != 0 {
        if_true
    } else {
        if_false
    }
}

/// Validate a `random` upper bound: a power of two no larger than the kind's
/// range (capped at 2^63 for `U64`).
pub fn check_bound(kind: u32, upper_bound: u64) -> Result<u64, CoprocessorError> {
    let bits = width(kind)?;
    let max = if bits >= 64 { 1u64 << 63 } else { 1u64 << bits };
    if !upper_bound.is_power_of_two() || upper_bound > max {
        return Err(CoprocessorError::InvalidBound);
    }
    Ok(upper_bound)
}
