//! Scalar float format conversions.
//!
//! Half precision and bfloat16 go through `half`, which rounds to nearest
//! even. Minifloat (FP8-like) bytes use a configurable layout: one sign bit,
//! `exponent_bits` exponent bits and `7 - exponent_bits` mantissa bits, with
//! subnormals when the exponent field is zero. The exponent field is never
//! treated as inf/NaN on decode.

use half::{bf16, f16};

/// Largest exponent bias accepted by the minifloat routines.
pub const MAX_MINIFLOAT_BIAS: i32 = 127;

#[inline(always)]
pub fn f16_to_f32(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

#[inline(always)]
pub fn f32_to_f16(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

#[inline(always)]
pub fn bf16_to_f32(bits: u16) -> f32 {
    bf16::from_bits(bits).to_f32()
}

#[inline(always)]
pub fn f32_to_bf16(value: f32) -> u16 {
    bf16::from_f32(value).to_bits()
}

/// `2^(127 - bias)` as an exact power of two.
#[inline(always)]
fn minifloat_multiplier(exponent_bias: i32) -> f32 {
    f32::from_bits(((254 - exponent_bias) as u32) << 23)
}

/// Exact `2^n` for `n` in `-149..=127`, subnormals included.
#[inline]
fn pow2(n: i32) -> f32 {
    if n >= -126 {
        f32::from_bits(((n + 127) as u32) << 23)
    } else {
        f32::from_bits(1u32 << (n + 149))
    }
}

/// Decode one minifloat byte.
///
/// The 7 magnitude bits are placed so the mantissa lines up with the f32
/// mantissa and the exponent lands in the low bits of the f32 exponent field.
/// The result is then `2^(bias_f32 - bias)` too small for both normals and
/// subnormals, so a single power-of-two multiply restores the value exactly.
///
/// `exponent_bits` must be in `1..=7` and `exponent_bias` in `0..=127`.
#[inline(always)]
pub fn minifloat_to_f32(input: u8, exponent_bits: u32, exponent_bias: i32) -> f32 {
    debug_assert!((1..=7).contains(&exponent_bits));
    debug_assert!((0..=MAX_MINIFLOAT_BIAS).contains(&exponent_bias));
    let sign = ((input & 0x80) as u32) << 24;
    let magnitude = ((input & 0x7f) as u32) << (16 + exponent_bits);
    let value = f32::from_bits(magnitude) * minifloat_multiplier(exponent_bias);
    f32::from_bits(value.to_bits() | sign)
}

/// Largest finite code: top exponent field value reserved, mantissa all ones.
#[inline]
fn minifloat_max_code(exponent_bits: u32) -> u8 {
    let mantissa_bits = 7 - exponent_bits;
    let max_exp_field = (1u32 << exponent_bits).saturating_sub(2);
    ((max_exp_field << mantissa_bits) | ((1u32 << mantissa_bits) - 1)) as u8
}

/// Encode an f32 as a minifloat byte, rounding to nearest even and
/// saturating at the largest finite code. NaN saturates as well.
pub fn f32_to_minifloat(value: f32, exponent_bits: u32, exponent_bias: i32) -> u8 {
    debug_assert!((1..=7).contains(&exponent_bits));
    debug_assert!((0..=MAX_MINIFLOAT_BIAS).contains(&exponent_bias));
    let mantissa_bits = 7 - exponent_bits as i32;
    let sign = if value.is_sign_negative() { 0x80u8 } else { 0 };

    let max_code = minifloat_max_code(exponent_bits);
    let max_pos = minifloat_to_f32(max_code, exponent_bits, exponent_bias);
    let magnitude = value.abs();
    if magnitude.is_nan() || magnitude >= max_pos {
        return sign | max_code;
    }

    // Unbiased exponent of the smallest normal is 1 - bias.
    let min_normal_exp = 1 - exponent_bias;
    let unbiased = ((magnitude.to_bits() >> 23) & 0xff) as i32 - 127;
    let code = if magnitude.to_bits() >> 23 != 0 && unbiased >= min_normal_exp {
        let ulp = pow2(unbiased - mantissa_bits);
        let steps = (magnitude / ulp).round_ties_even() as u32;
        // steps is in [2^m, 2^(m+1)]; the upper end carries into the exponent.
        let exp_field = (unbiased + exponent_bias) as u32;
        (exp_field << mantissa_bits) + (steps - (1u32 << mantissa_bits))
    } else {
        let ulp = pow2(min_normal_exp - mantissa_bits);
        (magnitude / ulp).round_ties_even() as u32
    };
    sign | (code.min(max_code as u32) as u8)
}
