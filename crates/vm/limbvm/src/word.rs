//! 256-bit word helpers over four 64-bit limbs, least significant limb first.
//!
//! The interpreter never materializes big-integer objects on the hot path: the operand stack
//! stores raw limb quadruples and every opcode works on [`Limbs`] directly. Cheap cases (zero,
//! one, powers of two, single-limb operands) are resolved with shifts and masks. The remaining
//! cases go through the wide `U256`/`U512` types, which share the limb layout, so every
//! operation is total.
#![allow(
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::as_conversions,
    reason = "limb indices are bounded by the fixed 4-limb layout and limb math is modular"
)]

use std::cmp::Ordering;

use ethereum_types::{Address, H256, U256, U512};
use lazy_static::lazy_static;

pub type Limbs = [u64; 4];

pub const ZERO: Limbs = [0; 4];
pub const ONE: Limbs = [1, 0, 0, 0];
pub const MAX: Limbs = [u64::MAX; 4];

/// Values below this bound are served from the interned table.
pub const INTERNED_WORDS: usize = 64;

lazy_static! {
    static ref SMALL_WORDS: [U256; INTERNED_WORDS] = {
        let mut table = [U256::zero(); INTERNED_WORDS];
        for (value, word) in table.iter_mut().enumerate() {
            *word = U256::from(value);
        }
        table
    };
}

#[inline(always)]
pub const fn from_limbs(l0: u64, l1: u64, l2: u64, l3: u64) -> Limbs {
    [l0, l1, l2, l3]
}

#[inline(always)]
pub const fn from_u64(value: u64) -> Limbs {
    [value, 0, 0, 0]
}

#[inline(always)]
pub fn from_bool(value: bool) -> Limbs {
    [u64::from(value), 0, 0, 0]
}

/// Builds a `U256` from limbs, returning the shared singleton for small values.
pub fn intern(limbs: Limbs) -> U256 {
    if fits_u64(limbs) && limbs[0] < INTERNED_WORDS as u64 {
        return SMALL_WORDS[limbs[0] as usize];
    }
    U256(limbs)
}

#[inline(always)]
pub fn to_u256(limbs: Limbs) -> U256 {
    U256(limbs)
}

#[inline(always)]
pub fn from_u256(word: U256) -> Limbs {
    word.0
}

/// Limb `index` of `word`, 0 being the least significant.
#[inline(always)]
pub fn limb(word: &U256, index: usize) -> u64 {
    word.0.get(index).copied().unwrap_or_default()
}

#[inline(always)]
pub fn is_zero(a: Limbs) -> bool {
    (a[0] | a[1] | a[2] | a[3]) == 0
}

#[inline(always)]
pub fn fits_u64(a: Limbs) -> bool {
    (a[1] | a[2] | a[3]) == 0
}

/// The low limb, or `u64::MAX` when the value does not fit.
#[inline(always)]
pub fn to_u64_saturating(a: Limbs) -> u64 {
    if fits_u64(a) { a[0] } else { u64::MAX }
}

#[inline(always)]
pub fn is_negative(a: Limbs) -> bool {
    (a[3] >> 63) == 1
}

#[inline(always)]
pub fn is_power_of_two(a: Limbs) -> bool {
    a.iter().map(|l| l.count_ones()).sum::<u32>() == 1
}

/// Index of the lowest set bit; for powers of two this is their base-2 logarithm.
#[inline]
pub fn trailing_zeros(a: Limbs) -> u32 {
    let mut zeros = 0;
    for limb in a {
        if limb != 0 {
            return zeros + limb.trailing_zeros();
        }
        zeros += 64;
    }
    zeros
}

/// Number of significant bits.
#[inline]
pub fn bit_len(a: Limbs) -> u32 {
    for i in (0..4).rev() {
        if a[i] != 0 {
            return (i as u32) * 64 + (64 - a[i].leading_zeros());
        }
    }
    0
}

/// Big-endian byte length of the value, used to price EXP.
#[inline]
pub fn byte_len(a: Limbs) -> u64 {
    u64::from(bit_len(a).div_ceil(8))
}

pub fn to_be_bytes(a: Limbs) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (chunk, limb) in out.chunks_exact_mut(8).zip(a.iter().rev()) {
        chunk.copy_from_slice(&limb.to_be_bytes());
    }
    out
}

pub fn from_be_bytes(bytes: &[u8; 32]) -> Limbs {
    let mut out = ZERO;
    for (limb, chunk) in out.iter_mut().rev().zip(bytes.chunks_exact(8)) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        *limb = u64::from_be_bytes(buf);
    }
    out
}

/// Interprets up to 32 big-endian bytes, right aligned. Longer inputs keep their low 32 bytes.
pub fn from_be_slice(bytes: &[u8]) -> Limbs {
    let len = bytes.len().min(32);
    let mut buf = [0u8; 32];
    buf[32 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    from_be_bytes(&buf)
}

pub fn to_address(a: Limbs) -> Address {
    let bytes = to_be_bytes(a);
    Address::from_slice(&bytes[12..])
}

pub fn from_address(address: &Address) -> Limbs {
    from_be_slice(address.as_bytes())
}

pub fn to_h256(a: Limbs) -> H256 {
    H256(to_be_bytes(a))
}

pub fn from_h256(hash: &H256) -> Limbs {
    from_be_bytes(&hash.0)
}

// Bitwise

#[inline(always)]
pub fn and(a: Limbs, b: Limbs) -> Limbs {
    [a[0] & b[0], a[1] & b[1], a[2] & b[2], a[3] & b[3]]
}

#[inline(always)]
pub fn or(a: Limbs, b: Limbs) -> Limbs {
    [a[0] | b[0], a[1] | b[1], a[2] | b[2], a[3] | b[3]]
}

#[inline(always)]
pub fn xor(a: Limbs, b: Limbs) -> Limbs {
    [a[0] ^ b[0], a[1] ^ b[1], a[2] ^ b[2], a[3] ^ b[3]]
}

#[inline(always)]
pub fn not(a: Limbs) -> Limbs {
    [!a[0], !a[1], !a[2], !a[3]]
}

/// Byte `index` counted from the most significant end; zero when `index >= 32`.
pub fn byte(index: Limbs, a: Limbs) -> Limbs {
    if !fits_u64(index) || index[0] >= 32 {
        return ZERO;
    }
    let i = index[0] as usize;
    let limb = a[3 - i / 8];
    let shift = (7 - i % 8) * 8;
    from_u64((limb >> shift) & 0xff)
}

// Comparison

/// Unsigned comparison from the most significant limb down.
#[inline]
pub fn cmp(a: Limbs, b: Limbs) -> Ordering {
    for i in (0..4).rev() {
        if a[i] != b[i] {
            return a[i].cmp(&b[i]);
        }
    }
    Ordering::Equal
}

/// Signed comparison: the top limb is compared as two's complement.
#[inline]
pub fn scmp(a: Limbs, b: Limbs) -> Ordering {
    if a[3] != b[3] {
        return signed(a[3]).cmp(&signed(b[3]));
    }
    for i in (0..3).rev() {
        if a[i] != b[i] {
            return a[i].cmp(&b[i]);
        }
    }
    Ordering::Equal
}

#[inline(always)]
fn signed(limb: u64) -> i64 {
    i64::from_ne_bytes(limb.to_ne_bytes())
}

#[inline(always)]
pub fn lt(a: Limbs, b: Limbs) -> bool {
    cmp(a, b) == Ordering::Less
}

#[inline(always)]
pub fn gt(a: Limbs, b: Limbs) -> bool {
    cmp(a, b) == Ordering::Greater
}

#[inline(always)]
pub fn slt(a: Limbs, b: Limbs) -> bool {
    scmp(a, b) == Ordering::Less
}

#[inline(always)]
pub fn sgt(a: Limbs, b: Limbs) -> bool {
    scmp(a, b) == Ordering::Greater
}

// Shifts

/// Shift amounts of 256 or more are reported as `None`.
#[inline(always)]
fn shift_amount(shift: Limbs) -> Option<u32> {
    if fits_u64(shift) && shift[0] < 256 {
        Some(shift[0] as u32)
    } else {
        None
    }
}

/// Left shift by `n < 256`: whole-limb moves, then one cross-limb merge.
pub fn shl_by(a: Limbs, n: u32) -> Limbs {
    let limbs = (n / 64) as usize;
    let bits = n % 64;
    let mut out = ZERO;
    for i in (limbs..4).rev() {
        out[i] = a[i - limbs] << bits;
        if bits > 0 && i > limbs {
            out[i] |= a[i - limbs - 1] >> (64 - bits);
        }
    }
    out
}

/// Logical right shift by `n < 256`.
pub fn shr_by(a: Limbs, n: u32) -> Limbs {
    let limbs = (n / 64) as usize;
    let bits = n % 64;
    let mut out = ZERO;
    for i in 0..(4 - limbs) {
        out[i] = a[i + limbs] >> bits;
        if bits > 0 && i + limbs + 1 < 4 {
            out[i] |= a[i + limbs + 1] << (64 - bits);
        }
    }
    out
}

/// Arithmetic right shift by `n < 256`; vacated high bits copy the sign.
pub fn sar_by(a: Limbs, n: u32) -> Limbs {
    let shifted = shr_by(a, n);
    if is_negative(a) && n > 0 {
        or(shifted, not(shr_by(MAX, n)))
    } else {
        shifted
    }
}

pub fn shl(shift: Limbs, a: Limbs) -> Limbs {
    match shift_amount(shift) {
        Some(n) => shl_by(a, n),
        None => ZERO,
    }
}

pub fn shr(shift: Limbs, a: Limbs) -> Limbs {
    match shift_amount(shift) {
        Some(n) => shr_by(a, n),
        None => ZERO,
    }
}

pub fn sar(shift: Limbs, a: Limbs) -> Limbs {
    match shift_amount(shift) {
        Some(n) => sar_by(a, n),
        None if is_negative(a) => MAX,
        None => ZERO,
    }
}

/// Extends the sign of byte `b` (counted from the least significant end) through the word.
pub fn signextend(b: Limbs, a: Limbs) -> Limbs {
    if !fits_u64(b) || b[0] >= 31 {
        return a;
    }
    let shift = ((31 - b[0]) * 8) as u32;
    sar_by(shl_by(a, shift), shift)
}

// Arithmetic

#[inline(always)]
fn carry_out(x: u64, y: u64, sum: u64) -> u64 {
    ((x & y) | ((x ^ y) & !sum)) >> 63
}

/// Addition modulo 2^256.
pub fn add(a: Limbs, b: Limbs) -> Limbs {
    let mut out = ZERO;
    let mut carry = 0u64;
    for i in 0..4 {
        let (x, y) = (a[i], b[i]);
        let sum = x.wrapping_add(y);
        let with_carry = sum.wrapping_add(carry);
        carry = carry_out(x, y, sum) | carry_out(sum, carry, with_carry);
        out[i] = with_carry;
    }
    out
}

/// Subtraction modulo 2^256.
pub fn sub(a: Limbs, b: Limbs) -> Limbs {
    let mut out = ZERO;
    let mut borrow = 0u64;
    for i in 0..4 {
        let (x, y) = (a[i], b[i]);
        let diff = x.wrapping_sub(y);
        let with_borrow = diff.wrapping_sub(borrow);
        borrow = u64::from(x < y) | u64::from(diff < borrow);
        out[i] = with_borrow;
    }
    out
}

#[inline]
pub fn negate(a: Limbs) -> Limbs {
    add(not(a), ONE)
}

#[inline]
pub fn abs(a: Limbs) -> Limbs {
    if is_negative(a) { negate(a) } else { a }
}

/// Widening multiply of `a` by a single limb, truncated to 256 bits.
fn mul_limb(a: Limbs, m: u64) -> Limbs {
    let mut out = ZERO;
    let mut carry = 0u128;
    for i in 0..4 {
        let product = u128::from(a[i]) * u128::from(m) + carry;
        out[i] = product as u64;
        carry = product >> 64;
    }
    out
}

/// Multiplication modulo 2^256.
pub fn mul(a: Limbs, b: Limbs) -> Limbs {
    if is_zero(a) || is_zero(b) {
        return ZERO;
    }
    if a == ONE {
        return b;
    }
    if b == ONE {
        return a;
    }
    if is_power_of_two(a) {
        return shl_by(b, trailing_zeros(a));
    }
    if is_power_of_two(b) {
        return shl_by(a, trailing_zeros(b));
    }
    if fits_u64(b) {
        return mul_limb(a, b[0]);
    }
    if fits_u64(a) {
        return mul_limb(b, a[0]);
    }
    mul_wide(a, b)
}

fn mul_wide(a: Limbs, b: Limbs) -> Limbs {
    U256(a).overflowing_mul(U256(b)).0.0
}

/// Unsigned division; division by zero yields zero.
pub fn div(a: Limbs, b: Limbs) -> Limbs {
    if is_zero(b) || is_zero(a) {
        return ZERO;
    }
    if b == ONE {
        return a;
    }
    match cmp(a, b) {
        Ordering::Equal => return ONE,
        Ordering::Less => return ZERO,
        Ordering::Greater => {}
    }
    if is_power_of_two(b) {
        return shr_by(a, trailing_zeros(b));
    }
    if fits_u64(a) {
        return from_u64(a[0] / b[0]);
    }
    div_wide(a, b)
}

fn div_wide(a: Limbs, b: Limbs) -> Limbs {
    (U256(a) / U256(b)).0
}

/// Unsigned remainder; modulo zero yields zero.
pub fn rem(a: Limbs, b: Limbs) -> Limbs {
    if is_zero(b) || b == ONE {
        return ZERO;
    }
    match cmp(a, b) {
        Ordering::Equal => return ZERO,
        Ordering::Less => return a,
        Ordering::Greater => {}
    }
    if is_power_of_two(b) {
        return and(a, sub(b, ONE));
    }
    if fits_u64(a) {
        return from_u64(a[0] % b[0]);
    }
    rem_wide(a, b)
}

fn rem_wide(a: Limbs, b: Limbs) -> Limbs {
    (U256(a) % U256(b)).0
}

/// Signed division, truncating toward zero. `MIN / -1` wraps to `MIN`.
pub fn sdiv(a: Limbs, b: Limbs) -> Limbs {
    if is_zero(a) || is_zero(b) {
        return ZERO;
    }
    let quotient = div(abs(a), abs(b));
    if is_negative(a) ^ is_negative(b) {
        negate(quotient)
    } else {
        quotient
    }
}

/// Signed remainder; the result takes the sign of the dividend.
pub fn smod(a: Limbs, b: Limbs) -> Limbs {
    if is_zero(a) || is_zero(b) {
        return ZERO;
    }
    let remainder = rem(abs(a), abs(b));
    if is_negative(a) {
        negate(remainder)
    } else {
        remainder
    }
}

#[inline]
fn low_half(wide: U512) -> Limbs {
    [wide.0[0], wide.0[1], wide.0[2], wide.0[3]]
}

/// `(a + b) % m` without intermediate truncation; zero modulus yields zero.
pub fn addmod(a: Limbs, b: Limbs, m: Limbs) -> Limbs {
    if is_zero(m) || m == ONE {
        return ZERO;
    }
    if is_power_of_two(m) {
        return and(add(a, b), sub(m, ONE));
    }
    let sum = U512::from(U256(a)) + U512::from(U256(b));
    low_half(sum % U512::from(U256(m)))
}

/// `(a * b) % m` without intermediate truncation; zero modulus yields zero.
pub fn mulmod(a: Limbs, b: Limbs, m: Limbs) -> Limbs {
    if is_zero(m) || m == ONE || is_zero(a) || is_zero(b) {
        return ZERO;
    }
    if is_power_of_two(m) {
        return and(mul(a, b), sub(m, ONE));
    }
    let product = U256(a).full_mul(U256(b));
    low_half(product % U512::from(U256(m)))
}

/// Exponentiation modulo 2^256.
pub fn exp(base: Limbs, exponent: Limbs) -> Limbs {
    if is_zero(exponent) {
        return ONE;
    }
    if is_zero(base) {
        return ZERO;
    }
    if base == ONE {
        return ONE;
    }
    if exponent == ONE {
        return base;
    }
    if is_power_of_two(base) {
        let log = u64::from(trailing_zeros(base));
        return match to_u64_saturating(exponent).checked_mul(log) {
            Some(bits) if bits < 256 => shl_by(ONE, bits as u32),
            _ => ZERO,
        };
    }
    exp_wide(base, exponent)
}

/// Square-and-multiply over the exponent bits.
fn exp_wide(base: Limbs, exponent: Limbs) -> Limbs {
    let mut result = ONE;
    let mut square = base;
    let bits = bit_len(exponent);
    for bit in 0..bits {
        let limb = exponent[(bit / 64) as usize];
        if (limb >> (bit % 64)) & 1 == 1 {
            result = mul(result, square);
        }
        if bit + 1 < bits {
            square = mul(square, square);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic sample of words: edge values plus xorshift noise.
    fn samples() -> Vec<Limbs> {
        let mut out = vec![
            ZERO,
            ONE,
            MAX,
            from_u64(2),
            from_u64(3),
            from_u64(255),
            from_u64(256),
            from_u64(u64::MAX),
            [0, 1, 0, 0],
            [0, 0, 0, 1 << 63],
            [u64::MAX, u64::MAX, u64::MAX, u64::MAX >> 1],
            [7, 0, 0, 1 << 63],
            [0, 0, 1, 0],
        ];
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        for width in 1..=4 {
            for _ in 0..6 {
                let mut w = ZERO;
                for limb in w.iter_mut().take(width) {
                    *limb = next();
                }
                out.push(w);
            }
        }
        out
    }

    fn u(a: Limbs) -> U256 {
        U256(a)
    }

    #[test]
    fn add_matches_wide_and_is_commutative() {
        for a in samples() {
            assert_eq!(add(a, ZERO), a);
            for b in samples() {
                assert_eq!(add(a, b), add(b, a));
                assert_eq!(add(a, b), u(a).overflowing_add(u(b)).0.0);
                assert_eq!(sub(add(a, b), b), a);
            }
        }
    }

    #[test]
    fn sub_matches_wide() {
        for a in samples() {
            for b in samples() {
                assert_eq!(sub(a, b), u(a).overflowing_sub(u(b)).0.0);
            }
        }
    }

    #[test]
    fn mul_matches_wide() {
        for a in samples() {
            assert_eq!(mul(a, ZERO), ZERO);
            for b in samples() {
                assert_eq!(mul(a, b), mul_wide(a, b), "{a:?} * {b:?}");
            }
        }
    }

    #[test]
    fn div_and_rem_match_wide() {
        for a in samples() {
            assert_eq!(div(a, ZERO), ZERO);
            assert_eq!(rem(a, ZERO), ZERO);
            for b in samples() {
                if is_zero(b) {
                    continue;
                }
                assert_eq!(div(a, b), div_wide(a, b), "{a:?} / {b:?}");
                assert_eq!(rem(a, b), rem_wide(a, b), "{a:?} % {b:?}");
            }
        }
    }

    #[test]
    fn div_power_of_two_fast_path() {
        let a = from_u64(256);
        let b = from_u64(4);
        assert_eq!(div(a, b), from_u64(64));
        assert_eq!(div_wide(a, b), from_u64(64));
    }

    #[test]
    fn signed_division() {
        let minus_one = MAX;
        let min = [0, 0, 0, 1 << 63];
        assert_eq!(sdiv(min, minus_one), min);
        assert_eq!(sdiv(negate(from_u64(10)), from_u64(4)), negate(from_u64(2)));
        assert_eq!(sdiv(negate(from_u64(8)), from_u64(4)), negate(from_u64(2)));
        assert_eq!(smod(negate(from_u64(10)), from_u64(3)), negate(from_u64(1)));
        assert_eq!(smod(from_u64(10), negate(from_u64(3))), from_u64(1));
    }

    #[test]
    fn modular_ops_match_wide() {
        for a in samples() {
            for b in samples() {
                for m in [from_u64(7), from_u64(1 << 20), MAX, [3, 5, 0, 0]] {
                    let expected_add = (U512::from(u(a)) + U512::from(u(b))) % U512::from(u(m));
                    assert_eq!(addmod(a, b, m), low_half(expected_add));
                    let expected_mul = u(a).full_mul(u(b)) % U512::from(u(m));
                    assert_eq!(mulmod(a, b, m), low_half(expected_mul));
                }
                assert_eq!(addmod(a, b, ZERO), ZERO);
                assert_eq!(mulmod(a, b, ZERO), ZERO);
            }
        }
    }

    #[test]
    fn exp_matches_reference() {
        for a in samples() {
            assert_eq!(exp(a, ZERO), ONE);
        }
        assert_eq!(exp(from_u64(2), from_u64(255)), [0, 0, 0, 1 << 63]);
        assert_eq!(exp(from_u64(2), from_u64(256)), ZERO);
        assert_eq!(exp(from_u64(4), from_u64(100)), shl_by(ONE, 200));
        assert_eq!(exp(from_u64(3), from_u64(5)), from_u64(243));
        for base in samples() {
            for e in [from_u64(2), from_u64(3), from_u64(17)] {
                let mut expected = ONE;
                for _ in 0..e[0] {
                    expected = mul_wide(expected, base);
                }
                assert_eq!(exp(base, e), expected);
            }
        }
    }

    #[test]
    fn exp_byte_length() {
        assert_eq!(byte_len(ZERO), 0);
        assert_eq!(byte_len(from_u64(0xff)), 1);
        assert_eq!(byte_len(from_u64(0x100)), 2);
        assert_eq!(byte_len(MAX), 32);
    }

    #[test]
    fn shifts_match_wide() {
        for a in samples() {
            for n in [0u32, 1, 7, 63, 64, 65, 127, 128, 200, 255] {
                assert_eq!(shl_by(a, n), (u(a) << n).0);
                assert_eq!(shr_by(a, n), (u(a) >> n).0);
                // shl(shr(a, n), n) only clears the low n bits.
                let mask = shl_by(MAX, n);
                assert_eq!(shl_by(shr_by(a, n), n), and(a, mask));
            }
            assert_eq!(shl(from_u64(256), a), ZERO);
            assert_eq!(shr(MAX, a), ZERO);
        }
    }

    #[test]
    fn sar_fills_with_sign() {
        let negative = [0, 0, 0, 1 << 63];
        assert_eq!(sar(from_u64(255), negative), MAX);
        assert_eq!(sar(from_u64(300), negative), MAX);
        assert_eq!(sar(from_u64(300), from_u64(5)), ZERO);
        assert_eq!(sar(from_u64(4), negate(from_u64(16))), negate(from_u64(1)));
        assert_eq!(sar(from_u64(1), from_u64(16)), from_u64(8));
    }

    #[test]
    fn signextend_scenarios() {
        assert_eq!(signextend(ZERO, from_u64(0x7f)), from_u64(0x7f));
        assert_eq!(signextend(ZERO, from_u64(0xff)), MAX);
        assert_eq!(signextend(from_u64(1), from_u64(0x80ff)), sub(ZERO, from_u64(0x7f01)));
        assert_eq!(signextend(from_u64(31), from_u64(0xff)), from_u64(0xff));
        assert_eq!(signextend(MAX, from_u64(0xff)), from_u64(0xff));
    }

    #[test]
    fn byte_extraction() {
        let word = from_be_slice(&[0xaa, 0xbb]);
        assert_eq!(byte(from_u64(31), word), from_u64(0xbb));
        assert_eq!(byte(from_u64(30), word), from_u64(0xaa));
        assert_eq!(byte(ZERO, [0, 0, 0, 0x1200_0000_0000_0000]), from_u64(0x12));
        assert_eq!(byte(from_u64(32), MAX), ZERO);
    }

    #[test]
    fn comparisons() {
        let minus_one = MAX;
        assert!(lt(ONE, MAX));
        assert!(gt(MAX, ONE));
        assert!(slt(minus_one, ONE));
        assert!(sgt(ONE, minus_one));
        assert!(!slt(ONE, ONE));
        assert!(slt([0, 0, 0, 1 << 63], minus_one));
    }

    #[test]
    fn byte_conversions() {
        let address = Address::from_low_u64_be(0xdead_beef);
        assert_eq!(to_address(from_address(&address)), address);
        let word = [1, 2, 3, 4];
        assert_eq!(from_be_bytes(&to_be_bytes(word)), word);
        assert_eq!(from_be_slice(&[1, 0]), from_u64(256));
    }

    #[test]
    fn interned_small_words() {
        assert_eq!(intern(from_u64(5)), U256::from(5));
        assert_eq!(intern([64, 0, 0, 0]), U256::from(64));
        assert_eq!(limb(&U256([1, 2, 3, 4]), 2), 3);
    }
}
