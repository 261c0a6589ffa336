//! Sum pooling over row-wise pruned tables.
//!
//! Pruned tables physically drop unused rows. Each raw index is first
//! checked against the uncompressed row count, then resolved through the
//! compressed-index map; a map entry of `-1` marks a pruned row, which
//! contributes nothing but still consumes its index.

use half::f16;

use crate::error::{report, PoolResult};
use crate::kernel_types::{Bags, PoolConfig};
use crate::types::{IndexValue, OutputElement, RowLayout};
use crate::validation::{
    addressable_rows, resolve_stride, validate_bags, validate_min_len, validate_output,
    validate_output_encoding,
};

use super::accumulate::{checked_row_id, pool_bags, row_slice};
use super::int8::accumulate_8bit;
use super::prefetch::prefetch_row;

/// Map entry of a pruned row.
pub const PRUNED_ROW: i32 = -1;

/// Element type of a row-wise pruned table.
pub trait SparseRow: Copy + Send + Sync + 'static {
    /// Table elements in one natural row.
    fn row_len(block_size: usize) -> usize;

    /// Add `weight * row` into `buf[..block_size]`.
    fn accumulate(row: &[Self], block_size: usize, weight: f32, buf: &mut [f32]);
}

/// 8-bit codes followed by an f32 scale and bias.
impl SparseRow for u8 {
    #[inline(always)]
    fn row_len(block_size: usize) -> usize {
        RowLayout::int8(block_size, true).row_bytes()
    }

    #[inline(always)]
    fn accumulate(row: &[u8], block_size: usize, weight: f32, buf: &mut [f32]) {
        let layout = RowLayout::int8(block_size, true);
        let (scale, bias) = layout.read_scale_bias(row);
        accumulate_8bit(layout.payload(row), scale * weight, bias * weight, buf);
    }
}

impl SparseRow for f32 {
    #[inline(always)]
    fn row_len(block_size: usize) -> usize {
        block_size
    }

    #[inline(always)]
    fn accumulate(row: &[f32], block_size: usize, weight: f32, buf: &mut [f32]) {
        for (acc, &x) in buf[..block_size].iter_mut().zip(row) {
            *acc = weight.mul_add(x, *acc);
        }
    }
}

impl SparseRow for f16 {
    #[inline(always)]
    fn row_len(block_size: usize) -> usize {
        block_size
    }

    #[inline(always)]
    fn accumulate(row: &[f16], block_size: usize, weight: f32, buf: &mut [f32]) {
        for (acc, &x) in buf[..block_size].iter_mut().zip(row) {
            *acc = weight.mul_add(x.to_f32(), *acc);
        }
    }
}

/// Pool rows of a pruned table.
///
/// `compressed_indices_table[i]` is the compacted row id of uncompressed row
/// `i`, or [`PRUNED_ROW`]. `table` rows are `input_stride` elements apart
/// (default: the natural row length of `R`); the number of compacted rows is
/// whatever `table` can address.
pub fn try_pool_rowwise_sparse<R, I, O, T>(
    config: &PoolConfig,
    uncompressed_data_size: usize,
    compressed_indices_table: &[i32],
    table: &[R],
    bags: &Bags<'_, I, O>,
    out: &mut [T],
) -> PoolResult<()>
where
    R: SparseRow,
    I: IndexValue,
    O: IndexValue,
    T: OutputElement,
{
    validate_output_encoding(T::ENCODING, false)?;
    validate_min_len(
        compressed_indices_table.len(),
        uncompressed_data_size,
        "compressed_indices_table",
    )?;

    let block_size = config.block_size;
    let row_len = R::row_len(block_size);
    let input_stride = resolve_stride(config.input_stride, row_len, "input_stride")?;
    let output_stride = resolve_stride(config.output_stride, block_size, "output_stride")?;
    validate_output(out.len(), bags.output_size, output_stride, block_size)?;
    validate_bags(bags, config.use_offsets, config.is_weight_positional)?;
    let compressed_rows = addressable_rows(table.len(), input_stride, row_len);

    let prefetch = |idx: i64| {
        let Ok(uncompressed) = checked_row_id(idx, 0, uncompressed_data_size) else {
            return;
        };
        let mapped = compressed_indices_table[uncompressed] as i64;
        if let Ok(row) = checked_row_id(mapped, 0, compressed_rows) {
            prefetch_row(row_slice(table, row, input_stride, row_len));
        }
    };

    pool_bags(config, bags, out, output_stride, block_size, prefetch, |pos, idx, w, buf| {
        let uncompressed = checked_row_id(idx, pos, uncompressed_data_size)?;
        let mapped = compressed_indices_table[uncompressed];
        if mapped == PRUNED_ROW {
            return Ok(());
        }
        let row = checked_row_id(mapped as i64, pos, compressed_rows)?;
        R::accumulate(row_slice(table, row, input_stride, row_len), block_size, w, buf);
        Ok(())
    })
}

/// Boolean form of [`try_pool_rowwise_sparse`].
pub fn pool_rowwise_sparse<R, I, O, T>(
    config: &PoolConfig,
    uncompressed_data_size: usize,
    compressed_indices_table: &[i32],
    table: &[R],
    bags: &Bags<'_, I, O>,
    out: &mut [T],
) -> bool
where
    R: SparseRow,
    I: IndexValue,
    O: IndexValue,
    T: OutputElement,
{
    let result = try_pool_rowwise_sparse(
        config,
        uncompressed_data_size,
        compressed_indices_table,
        table,
        bags,
        out,
    );
    report("pool_rowwise_sparse", result)
}
