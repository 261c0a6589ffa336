//! Up-front validation of pooling kernel parameters.
//!
//! Every check here runs before the first output row is written, so a
//! validation failure never leaves partial output behind.
//!
//! # Design
//!
//! - All functions return `Result<T, String>`; kernels lift the message into
//!   [`PoolError::InvalidConfig`](crate::PoolError::InvalidConfig)
//! - Buffer extents use `checked_mul`/`checked_add` so huge shapes fail
//!   cleanly instead of wrapping

use crate::kernel_types::Bags;
use crate::scalar_ops::MAX_MINIFLOAT_BIAS;
use crate::types::{IndexValue, OutputEncoding};

/// Validate a bit rate against the set a kernel supports.
#[inline]
pub fn validate_bit_rate(bit_rate: u8, supported: &[u8]) -> Result<(), String> {
    if !supported.contains(&bit_rate) {
        return Err(format!(
            "bit_rate {} not supported, expected one of {:?}",
            bit_rate, supported
        ));
    }
    Ok(())
}

/// Validate a minifloat layout: 1..=7 exponent bits, bias in 0..=127.
#[inline]
pub fn validate_minifloat_format(exponent_bits: u32, exponent_bias: i32) -> Result<(), String> {
    if !(1..=7).contains(&exponent_bits) {
        return Err(format!("exponent_bits {} outside 1..=7", exponent_bits));
    }
    if !(0..=MAX_MINIFLOAT_BIAS).contains(&exponent_bias) {
        return Err(format!(
            "exponent_bias {} outside 0..={}",
            exponent_bias, MAX_MINIFLOAT_BIAS
        ));
    }
    Ok(())
}

/// Resolve an optional stride override against the natural row length.
#[inline]
pub fn resolve_stride(
    requested: Option<usize>,
    natural: usize,
    name: &str,
) -> Result<usize, String> {
    match requested {
        None => Ok(natural),
        Some(stride) if stride >= natural => Ok(stride),
        Some(stride) => {
            log::warn!("{name} {stride} rejected: rows need at least {natural}");
            Err(format!("{} {} < row length {}", name, stride, natural))
        }
    }
}

/// Elements needed to hold `rows` rows of `row_len`, `stride` apart.
#[inline]
pub fn strided_extent(rows: usize, stride: usize, row_len: usize) -> Result<usize, String> {
    if rows == 0 {
        return Ok(0);
    }
    (rows - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_len))
        .ok_or_else(|| "buffer extent overflow".to_string())
}

/// Number of whole rows addressable in a buffer of `len` elements.
///
/// Zero-length rows fit anywhere, so every row id is addressable.
#[inline]
pub fn addressable_rows(len: usize, stride: usize, row_len: usize) -> usize {
    if row_len == 0 {
        return usize::MAX;
    }
    if len < row_len || stride == 0 {
        return 0;
    }
    (len - row_len) / stride + 1
}

/// Validate a buffer holds at least `required` elements.
#[inline]
pub fn validate_min_len(actual: usize, required: usize, name: &str) -> Result<(), String> {
    if actual < required {
        return Err(format!("{} len {} < required {}", name, actual, required));
    }
    Ok(())
}

/// Validate that a table holds `rows` rows of `row_len`, `stride` apart.
#[inline]
pub fn validate_table(
    len: usize,
    rows: usize,
    stride: usize,
    row_len: usize,
) -> Result<(), String> {
    validate_min_len(len, strided_extent(rows, stride, row_len)?, "table")
}

/// Validate the output buffer holds `rows` rows of `row_len`, `stride` apart.
#[inline]
pub fn validate_output(
    len: usize,
    rows: usize,
    stride: usize,
    row_len: usize,
) -> Result<(), String> {
    validate_min_len(len, strided_extent(rows, stride, row_len)?, "output")
}

/// Validate an output encoding; byte passthrough only where allowed.
#[inline]
pub fn validate_output_encoding(
    encoding: OutputEncoding,
    allow_byte: bool,
) -> Result<(), String> {
    if encoding == OutputEncoding::Byte && !allow_byte {
        return Err("byte output is only valid for 8-bit no-bag gathers".into());
    }
    Ok(())
}

/// Validate the index, segmentation and weight buffers of a bag set.
///
/// Positional weights must cover every bag, so the bag lengths are scanned
/// here. Negative lengths are left to the pooling loop, which reports them
/// per bag.
pub fn validate_bags<I: IndexValue, O: IndexValue>(
    bags: &Bags<'_, I, O>,
    use_offsets: bool,
    is_weight_positional: bool,
) -> Result<(), String> {
    validate_min_len(bags.indices.len(), bags.index_size, "indices")?;
    let segments = if use_offsets {
        bags.output_size
            .checked_add(1)
            .ok_or_else(|| "output_size overflow".to_string())?
    } else {
        bags.output_size
    };
    validate_min_len(
        bags.offsets_or_lengths.len(),
        segments,
        if use_offsets { "offsets" } else { "lengths" },
    )?;
    match bags.weights {
        Some(weights) if is_weight_positional => {
            validate_positional_weights(bags, weights.len(), use_offsets)
        }
        Some(weights) => validate_min_len(weights.len(), bags.index_size, "weights"),
        None => Ok(()),
    }
}

fn validate_positional_weights<I: IndexValue, O: IndexValue>(
    bags: &Bags<'_, I, O>,
    weights: usize,
    use_offsets: bool,
) -> Result<(), String> {
    let segments = bags.offsets_or_lengths;
    for m in 0..bags.output_size {
        let len = if use_offsets {
            segments[m + 1].to_i64().saturating_sub(segments[m].to_i64())
        } else {
            segments[m].to_i64()
        };
        if len > 0 && len as u64 > weights as u64 {
            return Err(format!(
                "bag {} of length {} exceeds {} positional weights",
                m, len, weights
            ));
        }
    }
    Ok(())
}
