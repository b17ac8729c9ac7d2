//! Flag-producing 16-bit arithmetic.
//!
//! These match a ripple-carry adder observed bit by bit: auxiliary carry is
//! the carry (or borrow) across the bit 3/4 boundary and carry is the one
//! leaving bit 15. Native overflowing arithmetic plus nibble masks gives the
//! same outputs without the per-bit loop.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArithResult {
    pub value: u16,
    pub aux_carry: bool,
    pub carry: bool,
    pub overflow: bool,
}

const SIGN: u16 = 0x8000;
const NIBBLE: u16 = 0x000F;

pub fn bit_add(a: u16, b: u16) -> ArithResult {
    let (value, carry) = a.overflowing_add(b);
    ArithResult {
        value,
        aux_carry: (a & NIBBLE) + (b & NIBBLE) > NIBBLE,
        carry,
        // same operand signs, different result sign
        overflow: (a ^ value) & (b ^ value) & SIGN != 0,
    }
}

pub fn bit_sub(a: u16, b: u16) -> ArithResult {
    let (value, carry) = a.overflowing_sub(b);
    ArithResult {
        value,
        aux_carry: (a & NIBBLE) < (b & NIBBLE),
        carry,
        // opposite operand signs, result sign differs from the minuend
        overflow: (a ^ b) & (a ^ value) & SIGN != 0,
    }
}

pub fn twos_complement(v: i16) -> u16 {
    bit_add(!(v as u16), 1).value
}

/// Even number of set bits in the low byte.
pub fn parity_even(v: u16) -> bool {
    (v as u8).count_ones() % 2 == 0
}
