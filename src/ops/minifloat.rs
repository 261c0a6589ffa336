//! Sum pooling over minifloat (FP8-like) tables.
//!
//! One byte per element, no per-row scale/bias. A byte only has 256 values,
//! so each call decodes the whole code space once into a lookup table and
//! the hot loop is a gather plus fma.

use crate::error::{report, PoolResult};
use crate::kernel_types::{Bags, MinifloatConfig, MinifloatFormat};
use crate::scalar_ops::minifloat_to_f32;
use crate::types::{IndexValue, OutputElement};
use crate::validation::{
    resolve_stride, validate_bags, validate_minifloat_format, validate_output,
    validate_output_encoding, validate_table,
};

use super::accumulate::{checked_row_id, pool_bags, row_slice};
use super::prefetch::prefetch_row;

/// Decoded value of every code of `format`.
pub fn decode_table(format: MinifloatFormat) -> [f32; 256] {
    std::array::from_fn(|code| {
        minifloat_to_f32(code as u8, format.exponent_bits, format.exponent_bias)
    })
}

/// Pool minifloat rows of `block_size` bytes, `input_stride` bytes apart
/// (default: `block_size`).
pub fn try_pool_minifloat<I, O, T>(
    config: &MinifloatConfig,
    data_size: usize,
    table: &[u8],
    bags: &Bags<'_, I, O>,
    out: &mut [T],
) -> PoolResult<()>
where
    I: IndexValue,
    O: IndexValue,
    T: OutputElement,
{
    let format = config.format;
    validate_minifloat_format(format.exponent_bits, format.exponent_bias)?;
    validate_output_encoding(T::ENCODING, false)?;

    let pool = &config.pool;
    let block_size = pool.block_size;
    let input_stride = resolve_stride(pool.input_stride, block_size, "input_stride")?;
    let output_stride = resolve_stride(pool.output_stride, block_size, "output_stride")?;
    validate_table(table.len(), data_size, input_stride, block_size)?;
    validate_output(out.len(), bags.output_size, output_stride, block_size)?;
    validate_bags(bags, pool.use_offsets, pool.is_weight_positional)?;

    let lut = decode_table(format);
    let prefetch = |idx: i64| {
        if let Ok(row) = checked_row_id(idx, 0, data_size) {
            prefetch_row(row_slice(table, row, input_stride, block_size));
        }
    };
    pool_bags(pool, bags, out, output_stride, block_size, prefetch, |pos, idx, w, buf| {
        let row = row_slice(table, checked_row_id(idx, pos, data_size)?, input_stride, block_size);
        for (acc, &code) in buf.iter_mut().zip(row) {
            *acc = w.mul_add(lut[code as usize], *acc);
        }
        Ok(())
    })
}

/// Boolean form of [`try_pool_minifloat`].
pub fn pool_minifloat<I, O, T>(
    config: &MinifloatConfig,
    data_size: usize,
    table: &[u8],
    bags: &Bags<'_, I, O>,
    out: &mut [T],
) -> bool
where
    I: IndexValue,
    O: IndexValue,
    T: OutputElement,
{
    report("pool_minifloat", try_pool_minifloat(config, data_size, table, bags, out))
}
