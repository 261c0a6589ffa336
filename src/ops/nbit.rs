//! Sum pooling over 2-bit and 4-bit row-wise quantized tables.
//!
//! Each row packs `block_size` codes low-to-high within each byte, plus an
//! f16 scale/bias pair at the head or tail. Element `j` dequantizes to
//! `code_j * scale + bias`; scale and bias are pre-multiplied by the index
//! weight, and each code is accumulated as `fma(scale, code, acc + bias)`.

use crate::error::{report, PoolError, PoolResult};
use crate::kernel_types::{Bags, LinearConfig};
use crate::types::{IndexValue, OutputElement, RowLayout};
use crate::validation::{
    resolve_stride, validate_bags, validate_bit_rate, validate_output,
    validate_output_encoding, validate_table,
};

use super::accumulate::{checked_row_id, pool_bags, row_slice};
use super::prefetch::prefetch_row;

/// Two codes per byte: low nibble first.
#[inline(always)]
pub(crate) fn accumulate_4bit(payload: &[u8], scale: f32, bias: f32, buf: &mut [f32]) {
    for (pair, &byte) in buf.chunks_exact_mut(2).zip(payload) {
        pair[0] = scale.mul_add((byte & 0x0f) as f32, pair[0] + bias);
        pair[1] = scale.mul_add((byte >> 4) as f32, pair[1] + bias);
    }
}

/// Four codes per byte: bits 0-1, 2-3, 4-5, 6-7.
#[inline(always)]
pub(crate) fn accumulate_2bit(payload: &[u8], scale: f32, bias: f32, buf: &mut [f32]) {
    for (quad, &byte) in buf.chunks_exact_mut(4).zip(payload) {
        quad[0] = scale.mul_add((byte & 0x03) as f32, quad[0] + bias);
        quad[1] = scale.mul_add(((byte & 0x0c) >> 2) as f32, quad[1] + bias);
        quad[2] = scale.mul_add(((byte & 0x30) >> 4) as f32, quad[2] + bias);
        quad[3] = scale.mul_add((byte >> 6) as f32, quad[3] + bias);
    }
}

/// Pool 2-bit or 4-bit rows.
///
/// `table` holds `data_size` rows, `input_stride` bytes apart (default:
/// packed codes plus 4 bytes of scale/bias). `out` receives
/// `bags.output_size` rows of `block_size` elements, `output_stride`
/// elements apart (default: `block_size`).
pub fn try_pool_nbit<I, O, T>(
    bit_rate: u8,
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
    validate_bit_rate(bit_rate, &[2, 4])?;
    if config.no_bag {
        return Err(PoolError::InvalidConfig(
            "no_bag is only supported for 8-bit rows".into(),
        ));
    }
    validate_output_encoding(T::ENCODING, false)?;

    let pool = &config.pool;
    let layout = RowLayout::nbit(bit_rate, pool.block_size, config.scale_bias_last);
    let row_bytes = layout.row_bytes();
    let input_stride = resolve_stride(pool.input_stride, row_bytes, "input_stride")?;
    let output_stride = resolve_stride(pool.output_stride, pool.block_size, "output_stride")?;
    validate_table(table.len(), data_size, input_stride, row_bytes)?;
    validate_output(out.len(), bags.output_size, output_stride, pool.block_size)?;
    validate_bags(bags, pool.use_offsets, pool.is_weight_positional)?;

    let prefetch = |idx: i64| {
        if let Ok(row) = checked_row_id(idx, 0, data_size) {
            prefetch_row(row_slice(table, row, input_stride, row_bytes));
        }
    };
    let buf_len = layout.rounded_block_size();

    match bit_rate {
        4 => pool_bags(pool, bags, out, output_stride, buf_len, prefetch, |pos, idx, w, buf| {
            let id = checked_row_id(idx, pos, data_size)?;
            let row = row_slice(table, id, input_stride, row_bytes);
            let (scale, bias) = layout.read_scale_bias(row);
            accumulate_4bit(layout.payload(row), scale * w, bias * w, buf);
            Ok(())
        }),
        _ => pool_bags(pool, bags, out, output_stride, buf_len, prefetch, |pos, idx, w, buf| {
            let id = checked_row_id(idx, pos, data_size)?;
            let row = row_slice(table, id, input_stride, row_bytes);
            let (scale, bias) = layout.read_scale_bias(row);
            accumulate_2bit(layout.payload(row), scale * w, bias * w, buf);
            Ok(())
        }),
    }
}

/// Boolean form of [`try_pool_nbit`].
pub fn pool_nbit<I, O, T>(
    bit_rate: u8,
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
    report("pool_nbit", try_pool_nbit(bit_rate, config, data_size, table, bags, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_types::PoolConfig;
    use half::f16;

    /// Row with scale 1, bias 0 at the tail so outputs equal raw codes.
    fn unit_row(layout: &RowLayout, payload: &[u8]) -> Vec<u8> {
        let mut row = vec![0u8; layout.row_bytes()];
        row[layout.payload_offset()..layout.payload_offset() + payload.len()]
            .copy_from_slice(payload);
        layout.write_scale_bias(&mut row, 1.0, 0.0);
        row
    }

    #[test]
    fn test_accumulate_4bit_nibble_order() {
        let mut buf = [0.0f32; 2];
        accumulate_4bit(&[0xAB], 1.0, 0.0, &mut buf);
        assert_eq!(buf, [11.0, 10.0]);
    }

    #[test]
    fn test_accumulate_2bit_code_order() {
        let mut buf = [0.0f32; 4];
        accumulate_2bit(&[0b1110_0100], 1.0, 0.0, &mut buf);
        assert_eq!(buf, [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_accumulate_applies_affine_and_sums() {
        let mut buf = [1.0f32; 2];
        accumulate_4bit(&[0x21], 0.5, -1.0, &mut buf);
        // 1 + (1*0.5 - 1), 1 + (2*0.5 - 1)
        assert_eq!(buf, [0.5, 1.0]);
    }

    #[test]
    fn test_pool_4bit_single_bag() {
        let layout = RowLayout::nbit(4, 4, true);
        let mut table = unit_row(&layout, &[0x21, 0x43]);
        table.extend(unit_row(&layout, &[0x65, 0x87]));
        let indices = [0i32, 1];
        let offsets = [0i32, 2];
        let bags = Bags::new(&indices, &offsets, 1);
        let mut out = vec![0.0f32; 4];
        let cfg = LinearConfig::new(PoolConfig::new(4));
        try_pool_nbit(4, &cfg, 2, &table, &bags, &mut out).unwrap();
        assert_eq!(out, vec![6.0, 8.0, 10.0, 12.0]);
    }

    #[test]
    fn test_pool_2bit_scale_bias_first_with_odd_block() {
        let layout = RowLayout::nbit(2, 5, false);
        let mut row = vec![0u8; layout.row_bytes()];
        layout.write_scale_bias(&mut row, 2.0, 1.0);
        // codes 3,2,1,0 then 1 (the remaining 3 slots of byte 2 are padding)
        row[4] = 0b0001_1011;
        row[5] = 0b0000_0001;
        let indices = [0i64];
        let lengths = [1i64];
        let bags = Bags::new(&indices, &lengths, 1);
        let mut out = vec![0.0f32; 5];
        let cfg = LinearConfig::new(PoolConfig::new(5).with_lengths()).with_scale_bias_last(false);
        try_pool_nbit(2, &cfg, 1, &row, &bags, &mut out).unwrap();
        assert_eq!(out, vec![7.0, 5.0, 3.0, 1.0, 3.0]);
    }

    #[test]
    fn test_pool_nbit_f16_output_and_stride() {
        let layout = RowLayout::nbit(4, 2, true);
        let table = unit_row(&layout, &[0x31]);
        let indices = [0i32, 0, 0];
        let offsets = [0i32, 1, 3];
        let bags = Bags::new(&indices, &offsets, 2);
        let mut out = vec![f16::from_f32(-1.0); 6];
        let cfg = LinearConfig::new(PoolConfig::new(2).with_output_stride(3));
        assert!(pool_nbit(4, &cfg, 1, &table, &bags, &mut out));
        let out: Vec<f32> = out.iter().map(|v| v.to_f32()).collect();
        // Padding column of each output row is left untouched.
        assert_eq!(out, vec![1.0, 3.0, -1.0, 2.0, 6.0, -1.0]);
    }

    #[test]
    fn test_pool_nbit_rejects_bad_rows_and_config() {
        let layout = RowLayout::nbit(4, 2, true);
        let table = unit_row(&layout, &[0x11]);
        let offsets = [0i32, 1];
        let cfg = LinearConfig::new(PoolConfig::new(2));
        let mut out = vec![0.0f32; 2];

        for bad in [1i32, -2, -1] {
            let indices = [bad];
            let bags = Bags::new(&indices, &offsets, 1);
            assert!(!pool_nbit(4, &cfg, 1, &table, &bags, &mut out));
        }

        let indices = [0i32];
        let bags = Bags::new(&indices, &offsets, 1);
        assert!(matches!(
            try_pool_nbit(3, &cfg, 1, &table, &bags, &mut out),
            Err(PoolError::InvalidConfig(_))
        ));
        let no_bag = cfg.clone().with_no_bag(true);
        assert!(!pool_nbit(4, &no_bag, 1, &table, &bags, &mut out));
        // Table too short for the claimed data_size.
        assert!(matches!(
            try_pool_nbit(4, &cfg, 2, &table, &bags, &mut out),
            Err(PoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_pool_nbit_prefetch_does_not_change_results() {
        let layout = RowLayout::nbit(2, 8, true);
        let mut table = Vec::new();
        for r in 0..8u8 {
            table.extend(unit_row(&layout, &[r.wrapping_mul(37), r ^ 0x5a]));
        }
        let indices: Vec<i64> = (0..20).map(|i| (i * 5) % 8).collect();
        let offsets = [0i64, 7, 7, 20];
        let bags = Bags::new(&indices, &offsets, 3);

        let mut with = vec![0.0f32; 24];
        let mut without = vec![0.0f32; 24];
        let cfg = LinearConfig::new(PoolConfig::new(8).with_prefetch_distance(3));
        try_pool_nbit(2, &cfg, 8, &table, &bags, &mut with).unwrap();
        let cfg = LinearConfig::new(PoolConfig::new(8).with_prefetch_distance(0));
        try_pool_nbit(2, &cfg, 8, &table, &bags, &mut without).unwrap();
        assert_eq!(with, without);
    }
}
