//! Sum pooling over 8-bit row-wise quantized tables.
//!
//! One code byte per element. With `scale_bias_last` the row ends with an
//! f32 scale/bias pair; otherwise it starts with an f16 pair. No-bag mode
//! turns the kernel into a gather: output row `m` is index `m` alone,
//! dequantized, or copied byte for byte when the output is `u8`.

use crate::error::{report, PoolError, PoolResult};
use crate::kernel_types::{Bags, LinearConfig};
use crate::types::{IndexValue, OutputElement, OutputEncoding, RowLayout};
use crate::validation::{
    resolve_stride, validate_bags, validate_min_len, validate_output,
    validate_output_encoding, validate_table,
};

use super::accumulate::{checked_row_id, pool_bags, row_slice, weight_at};
use super::prefetch::{lookahead, prefetch_row};

/// One code per byte.
#[inline(always)]
pub(crate) fn accumulate_8bit(payload: &[u8], scale: f32, bias: f32, buf: &mut [f32]) {
    for (acc, &code) in buf.iter_mut().zip(payload) {
        *acc = scale.mul_add(code as f32, *acc + bias);
    }
}

/// Pool 8-bit rows, or gather them one per output row in no-bag mode.
///
/// Default strides: `input_stride` is the natural row (codes plus
/// scale/bias); `output_stride` is `block_size`, or `input_stride` for byte
/// output.
pub fn try_pool_int8<I, O, T>(
    config: &LinearConfig,
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
    validate_output_encoding(T::ENCODING, config.no_bag)?;

    let pool = &config.pool;
    let layout = RowLayout::int8(pool.block_size, config.scale_bias_last);
    let row_bytes = layout.row_bytes();
    let input_stride = resolve_stride(pool.input_stride, row_bytes, "input_stride")?;
    validate_table(table.len(), data_size, input_stride, row_bytes)?;

    if config.no_bag {
        return gather_int8(config, &layout, input_stride, data_size, table, bags, out);
    }

    let output_stride = resolve_stride(pool.output_stride, pool.block_size, "output_stride")?;
    validate_output(out.len(), bags.output_size, output_stride, pool.block_size)?;
    validate_bags(bags, pool.use_offsets, pool.is_weight_positional)?;

    let prefetch = |idx: i64| {
        if let Ok(row) = checked_row_id(idx, 0, data_size) {
            prefetch_row(row_slice(table, row, input_stride, row_bytes));
        }
    };
    pool_bags(pool, bags, out, output_stride, pool.block_size, prefetch, |pos, idx, w, buf| {
        let row = row_slice(table, checked_row_id(idx, pos, data_size)?, input_stride, row_bytes);
        let (scale, bias) = layout.read_scale_bias(row);
        accumulate_8bit(layout.payload(row), scale * w, bias * w, buf);
        Ok(())
    })
}

/// No-bag path: one index per output row, no accumulation.
fn gather_int8<I, O, T>(
    config: &LinearConfig,
    layout: &RowLayout,
    input_stride: usize,
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
    let pool = &config.pool;
    let row_bytes = layout.row_bytes();
    let passthrough = T::ENCODING == OutputEncoding::Byte;
    let (row_len, natural_stride) = if passthrough {
        (row_bytes, input_stride)
    } else {
        (pool.block_size, pool.block_size)
    };
    let output_stride = match pool.output_stride {
        Some(stride) => resolve_stride(Some(stride), row_len, "output_stride")?,
        None => natural_stride,
    };
    let output_size = bags.output_size;
    validate_output(out.len(), output_size, output_stride, row_len)?;
    validate_min_len(bags.indices.len(), output_size, "indices")?;
    if let Some(weights) = bags.weights {
        validate_min_len(weights.len(), output_size, "weights")?;
    }

    for m in 0..output_size {
        if pool.prefetch_distance > 0 {
            let ahead = bags.indices[lookahead(m, pool.prefetch_distance, output_size)].to_i64();
            if let Ok(row) = checked_row_id(ahead, 0, data_size) {
                prefetch_row(row_slice(table, row, input_stride, row_bytes));
            }
        }
        let row_id = checked_row_id(bags.indices[m].to_i64(), m, data_size)?;
        let row = row_slice(table, row_id, input_stride, row_bytes);
        let start = m * output_stride;
        let dst = &mut out[start..start + row_len];

        if passthrough {
            for (d, &b) in dst.iter_mut().zip(row) {
                *d = T::from_byte(b);
            }
        } else {
            let weight = weight_at(bags.weights, false, m, m);
            let (scale, bias) = layout.read_scale_bias(row);
            let (scale, bias) = (scale * weight, bias * weight);
            for (d, &code) in dst.iter_mut().zip(layout.payload(row)) {
                *d = T::from_f32(scale.mul_add(code as f32, bias));
            }
        }
    }

    if output_size != bags.index_size {
        return Err(PoolError::CursorMismatch {
            cursor: output_size,
            index_size: bags.index_size,
        });
    }
    Ok(())
}

/// Boolean form of [`try_pool_int8`].
pub fn pool_int8<I, O, T>(
    config: &LinearConfig,
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
    report("pool_int8", try_pool_int8(config, data_size, table, bags, out))
}
