//! Reference row quantizers for building pooling tables.
//!
//! Linear rows use range-based per-row affine quantization: `bias` is the
//! row minimum and `scale` spreads the row range over `2^bits - 1` levels.
//! Codes are `round((x - bias) / scale)` clamped to the level range, packed
//! low-to-high within each byte.

use half::f16;

use crate::error::{PoolError, PoolResult};
use crate::kernel_types::MinifloatFormat;
use crate::scalar_ops::f32_to_minifloat;
use crate::types::{RowLayout, ScaleBiasKind};
use crate::validation::{validate_bit_rate, validate_minifloat_format, validate_min_len};

/// Added to the range of f32-pair rows so a constant row does not divide by zero.
const RANGE_EPSILON: f32 = 1e-8;

#[inline]
fn round_f16(value: f32) -> f32 {
    f16::from_f32(value).to_f32()
}

fn min_max(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// `(scale, bias, inverse_scale)` for a row spread over `levels` steps.
///
/// F16 pairs round the bias and then the scale to f16 before codes are
/// computed, so the stored pair is exactly what quantization used.
fn affine_params(values: &[f32], levels: f32, half_pair: bool) -> (f32, f32, f32) {
    let (min, max) = min_max(values);
    if !half_pair {
        let range = max - min;
        return (range / levels, min, levels / (range + RANGE_EPSILON));
    }

    let bias = round_f16(min);
    let range = max - bias;
    let mut scale = if range > 0.0 { round_f16(range / levels) } else { 1.0 };
    if scale == 0.0 {
        scale = 1.0;
    }
    let mut inverse_scale = 1.0 / scale;
    if inverse_scale.is_infinite() {
        scale = 1.0;
        inverse_scale = 1.0;
    }
    (scale, bias, inverse_scale)
}

#[inline]
fn quantize_code(value: f32, bias: f32, inverse_scale: f32, levels: f32) -> u8 {
    ((value - bias) * inverse_scale)
        .round_ties_even()
        .clamp(0.0, levels) as u8
}

fn quantize_linear_row(values: &[f32], layout: &RowLayout) -> Vec<u8> {
    let bits = layout.bit_rate as usize;
    let levels = ((1u32 << bits) - 1) as f32;
    let (scale, bias, inverse_scale) =
        affine_params(values, levels, layout.scale_bias == ScaleBiasKind::F16);

    let mut row = vec![0u8; layout.row_bytes()];
    let per_byte = layout.elements_per_byte();
    let at = layout.payload_offset();
    for (idx, &v) in values.iter().enumerate() {
        let code = quantize_code(v, bias, inverse_scale, levels);
        let shift = (idx % per_byte) * bits;
        row[at + idx / per_byte] |= code << shift;
    }
    layout.write_scale_bias(&mut row, scale, bias);
    row
}

/// Quantize one row to 8-bit codes.
///
/// `scale_bias_last` stores a trailing f32 pair; otherwise a leading f16 pair.
pub fn quantize_row_8bit(values: &[f32], scale_bias_last: bool) -> Vec<u8> {
    quantize_linear_row(values, &RowLayout::int8(values.len(), scale_bias_last))
}

/// Quantize one row to 2-bit or 4-bit codes with an f16 scale/bias pair.
pub fn quantize_row_nbit(
    values: &[f32],
    bit_rate: u8,
    scale_bias_last: bool,
) -> PoolResult<Vec<u8>> {
    validate_bit_rate(bit_rate, &[2, 4])?;
    Ok(quantize_linear_row(
        values,
        &RowLayout::nbit(bit_rate, values.len(), scale_bias_last),
    ))
}

/// Encode one row element-wise as minifloat bytes.
pub fn quantize_row_minifloat(values: &[f32], format: MinifloatFormat) -> PoolResult<Vec<u8>> {
    validate_minifloat_format(format.exponent_bits, format.exponent_bias)?;
    Ok(values
        .iter()
        .map(|&v| f32_to_minifloat(v, format.exponent_bits, format.exponent_bias))
        .collect())
}

/// Check a row-major matrix is a whole number of `block_size` rows.
fn validate_matrix(len: usize, block_size: usize) -> PoolResult<()> {
    if block_size == 0 {
        return Err(PoolError::InvalidConfig("block_size must be > 0".into()));
    }
    if len % block_size != 0 {
        return Err(PoolError::InvalidConfig(format!(
            "matrix of {} values is not a whole number of {}-element rows",
            len, block_size
        )));
    }
    Ok(())
}

fn matrix_rows(values: &[f32], block_size: usize) -> PoolResult<std::slice::ChunksExact<'_, f32>> {
    validate_matrix(values.len(), block_size)?;
    Ok(values.chunks_exact(block_size))
}

/// Quantize a `rows x block_size` matrix into a contiguous 8-bit table.
pub fn build_table_8bit(
    values: &[f32],
    block_size: usize,
    scale_bias_last: bool,
) -> PoolResult<Vec<u8>> {
    Ok(matrix_rows(values, block_size)?
        .flat_map(|row| quantize_row_8bit(row, scale_bias_last))
        .collect())
}

/// Quantize a `rows x block_size` matrix into a contiguous 2-bit or 4-bit table.
pub fn build_table_nbit(
    values: &[f32],
    block_size: usize,
    bit_rate: u8,
    scale_bias_last: bool,
) -> PoolResult<Vec<u8>> {
    validate_bit_rate(bit_rate, &[2, 4])?;
    let mut table = Vec::new();
    for row in matrix_rows(values, block_size)? {
        table.extend(quantize_row_nbit(row, bit_rate, scale_bias_last)?);
    }
    Ok(table)
}

/// Encode a `rows x block_size` matrix into a contiguous minifloat table.
pub fn build_table_minifloat(
    values: &[f32],
    block_size: usize,
    format: MinifloatFormat,
) -> PoolResult<Vec<u8>> {
    validate_matrix(values.len(), block_size)?;
    quantize_row_minifloat(values, format)
}

/// Unpack the first `block_size` codes of a packed payload.
pub fn unpack_codes(bit_rate: u8, payload: &[u8], block_size: usize) -> PoolResult<Vec<u8>> {
    validate_bit_rate(bit_rate, &[2, 4, 8])?;
    let per_byte = 8 / bit_rate as usize;
    validate_min_len(payload.len(), block_size.div_ceil(per_byte), "payload")?;
    let mask = ((1u16 << bit_rate) - 1) as u8;
    Ok((0..block_size)
        .map(|idx| {
            let shift = (idx % per_byte) * bit_rate as usize;
            (payload[idx / per_byte] >> shift) & mask
        })
        .collect())
}

/// Dequantize one linear row to `block_size` floats.
pub fn dequantize_row(layout: &RowLayout, row: &[u8]) -> PoolResult<Vec<f32>> {
    validate_min_len(row.len(), layout.row_bytes(), "row")?;
    let (scale, bias) = layout.read_scale_bias(row);
    Ok(unpack_codes(layout.bit_rate, layout.payload(row), layout.block_size)?
        .into_iter()
        .map(|code| scale.mul_add(code as f32, bias))
        .collect())
}
