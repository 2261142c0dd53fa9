//! Conversion between Reddit's base-36 ids and integer ordinals.
//!
//! Ids are allocated sequentially site-wide, so turning them into integers
//! makes comparison and next-block arithmetic possible. The id space exceeds
//! 53-bit precision, hence the big-integer representation.

use num_bigint::BigUint;
use num_traits::Zero;
use prospect_core::OrdinalError;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const BASE: u32 = 36;

pub fn to_ordinal(id: &str) -> Result<BigUint, OrdinalError> {
    if id.is_empty() {
        return Err(OrdinalError::Empty);
    }
    let mut value = BigUint::zero();
    for character in id.chars() {
        let digit = match character {
            '0'..='9' => character as u32 - '0' as u32,
            'a'..='z' => character as u32 - 'a' as u32 + 10,
            _ => {
                return Err(OrdinalError::InvalidCharacter {
                    character,
                    input: id.to_string(),
                })
            }
        };
        value = value * BASE + digit;
    }
    Ok(value)
}

/// Canonical rendering: no leading zeros, except the literal value zero.
pub fn from_ordinal(value: &BigUint) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    let base = BigUint::from(BASE);
    let mut remaining = value.clone();
    let mut digits = Vec::new();
    while !remaining.is_zero() {
        let digit = (&remaining % &base).iter_u32_digits().next().unwrap_or(0);
        digits.push(ALPHABET[digit as usize] as char);
        remaining /= &base;
    }
    digits.iter().rev().collect()
}
