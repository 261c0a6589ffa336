//! Shared bag-pooling skeleton.
//!
//! Every variant walks the bags the same way: zero a float accumulator,
//! measure the bag, decode-and-accumulate each referenced row, optionally
//! normalize, then encode the accumulator into the output row. Variants only
//! supply the per-row accumulate step and the prefetch target, both as
//! closures so each combination is monomorphized into its own loop.

use crate::error::{PoolError, PoolResult};
use crate::kernel_types::{Bags, PoolConfig};
use crate::types::{IndexValue, OutputElement};

use super::prefetch::lookahead;

/// Signed length of bag `row`.
#[inline(always)]
pub(crate) fn bag_length<O: IndexValue>(
    offsets_or_lengths: &[O],
    row: usize,
    use_offsets: bool,
) -> i64 {
    if use_offsets {
        offsets_or_lengths[row + 1]
            .to_i64()
            .saturating_sub(offsets_or_lengths[row].to_i64())
    } else {
        offsets_or_lengths[row].to_i64()
    }
}

/// Weight of the index at `cursor`, the `position`-th entry of its bag.
#[inline(always)]
pub(crate) fn weight_at(
    weights: Option<&[f32]>,
    positional: bool,
    position: usize,
    cursor: usize,
) -> f32 {
    match weights {
        Some(w) if positional => w[position],
        Some(w) => w[cursor],
        None => 1.0,
    }
}

/// Validate a row id against `[0, bound)`.
#[inline(always)]
pub(crate) fn checked_row_id(index: i64, position: usize, bound: usize) -> PoolResult<usize> {
    if index < 0 || index as u64 >= bound as u64 {
        return Err(PoolError::InvalidIndex {
            position,
            index,
            bound,
        });
    }
    Ok(index as usize)
}

/// Row `row` of a table whose rows are `stride` elements apart.
#[inline(always)]
pub(crate) fn row_slice<R>(table: &[R], row: usize, stride: usize, row_len: usize) -> &[R] {
    let start = row * stride;
    &table[start..start + row_len]
}

/// Scale by the reciprocal of the bag length.
#[inline]
pub(crate) fn normalize(buf: &mut [f32], len: usize) {
    let scale = 1.0 / len as f32;
    for v in buf.iter_mut() {
        *v *= scale;
    }
}

/// Encode an accumulator row into the output encoding.
#[inline]
pub(crate) fn store_row<T: OutputElement>(src: &[f32], dst: &mut [T]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = T::from_f32(s);
    }
}

/// Pool every bag of `bags` into `out`.
///
/// `accumulate(cursor, row_id, weight, buf)` adds one referenced row into
/// `buf`; it validates the row id itself so sentinel ids can be skipped.
/// `prefetch(row_id)` receives the raw id a fixed window ahead and must
/// tolerate invalid ids.
///
/// The caller has already run `validate_bags`, which also bounds every bag
/// by the positional weights, and validated buffer extents. `buf_len` is the
/// accumulator length (at least `block_size`, rounded up for packed codes).
pub(crate) fn pool_bags<I, O, T, P, F>(
    config: &PoolConfig,
    bags: &Bags<'_, I, O>,
    out: &mut [T],
    output_stride: usize,
    buf_len: usize,
    prefetch: P,
    mut accumulate: F,
) -> PoolResult<()>
where
    I: IndexValue,
    O: IndexValue,
    T: OutputElement,
    P: Fn(i64),
    F: FnMut(usize, i64, f32, &mut [f32]) -> PoolResult<()>,
{
    let block_size = config.block_size;
    let index_size = bags.index_size;
    let mut buf = vec![0.0f32; buf_len.max(block_size)];
    let mut current = 0usize;

    for m in 0..bags.output_size {
        buf.fill(0.0);
        let len = bag_length(bags.offsets_or_lengths, m, config.use_offsets);
        if len < 0 {
            return Err(PoolError::NegativeLength { row: m, len });
        }
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if len > index_size - current {
            return Err(PoolError::SegmentOverrun {
                row: m,
                cursor: current,
                len,
                index_size,
            });
        }
        for i in 0..len {
            if config.prefetch_distance > 0 {
                let ahead = lookahead(current, config.prefetch_distance, index_size);
                prefetch(bags.indices[ahead].to_i64());
            }
            let idx = bags.indices[current].to_i64();
            let weight = weight_at(bags.weights, config.is_weight_positional, i, current);
            accumulate(current, idx, weight, &mut buf)?;
            current += 1;
        }

        if config.normalize_by_lengths && len > 0 {
            normalize(&mut buf[..block_size], len);
        }
        let start = m * output_stride;
        store_row(&buf[..block_size], &mut out[start..start + block_size]);
    }

    if current != index_size {
        return Err(PoolError::CursorMismatch {
            cursor: current,
            index_size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rows are `[id, id, ...]` so sums are easy to check.
    fn sum_ids(
        config: &PoolConfig,
        bags: &Bags<'_, i64, i64>,
        out: &mut [f32],
    ) -> PoolResult<()> {
        pool_bags(
            config,
            bags,
            out,
            config.block_size,
            config.block_size,
            |_| {},
            |pos, idx, w, buf| {
                let row = checked_row_id(idx, pos, 10)?;
                for v in buf.iter_mut() {
                    *v = w.mul_add(row as f32, *v);
                }
                Ok(())
            },
        )
    }

    #[test]
    fn test_bag_length_offsets_and_lengths() {
        let offsets = [0i64, 2, 2, 5];
        assert_eq!(bag_length(&offsets, 0, true), 2);
        assert_eq!(bag_length(&offsets, 1, true), 0);
        assert_eq!(bag_length(&offsets, 2, true), 3);
        let lengths = [2i32, 0, 3];
        assert_eq!(bag_length(&lengths, 2, false), 3);
        let decreasing = [3i64, 1];
        assert_eq!(bag_length(&decreasing, 0, true), -2);
    }

    #[test]
    fn test_weight_addressing() {
        let w = [0.5f32, 2.0, 4.0];
        assert_eq!(weight_at(Some(&w), true, 1, 2), 2.0);
        assert_eq!(weight_at(Some(&w), false, 1, 2), 4.0);
        assert_eq!(weight_at(None, false, 1, 2), 1.0);
    }

    #[test]
    fn test_pool_sums_and_normalizes() {
        let indices = [1i64, 2, 3, 4];
        let offsets = [0i64, 3, 3, 4];
        let bags = Bags::new(&indices, &offsets, 3);
        let mut out = vec![-1.0f32; 6];
        sum_ids(&PoolConfig::new(2), &bags, &mut out).unwrap();
        assert_eq!(out, vec![6.0, 6.0, 0.0, 0.0, 4.0, 4.0]);

        let mut out = vec![-1.0f32; 6];
        sum_ids(&PoolConfig::new(2).with_normalize(true), &bags, &mut out).unwrap();
        assert_eq!(out, vec![2.0, 2.0, 0.0, 0.0, 4.0, 4.0]);
    }

    #[test]
    fn test_pool_reports_overrun_without_rollback() {
        let indices = [1i64, 2, 3];
        let lengths = [1i64, 3];
        let bags = Bags::new(&indices, &lengths, 2);
        let mut out = vec![0.0f32; 2];
        let err = sum_ids(&PoolConfig::new(1).with_lengths(), &bags, &mut out).unwrap_err();
        assert_eq!(
            err,
            PoolError::SegmentOverrun {
                row: 1,
                cursor: 1,
                len: 3,
                index_size: 3
            }
        );
        // Row 0 was already written.
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn test_pool_reports_cursor_mismatch() {
        let indices = [1i64, 2, 3];
        let offsets = [0i64, 2];
        let bags = Bags::new(&indices, &offsets, 1);
        let mut out = vec![0.0f32; 1];
        let err = sum_ids(&PoolConfig::new(1), &bags, &mut out).unwrap_err();
        assert_eq!(
            err,
            PoolError::CursorMismatch {
                cursor: 2,
                index_size: 3
            }
        );
        assert_eq!(out[0], 3.0);
    }

    #[test]
    fn test_pool_rejects_negative_length() {
        let indices = [1i64, 2];
        let offsets = [2i64, 0];
        let bags = Bags::new(&indices, &offsets, 1);
        let mut out = vec![0.0f32; 1];
        assert!(matches!(
            sum_ids(&PoolConfig::new(1), &bags, &mut out),
            Err(PoolError::NegativeLength { row: 0, len: -2 })
        ));
    }

    #[test]
    fn test_pool_positional_weights() {
        let indices = [1i64, 2, 3];
        let offsets = [0i64, 2, 3];
        let weights = [10.0f32, 100.0];
        let bags = Bags::new(&indices, &offsets, 2).with_weights(&weights);
        let mut out = vec![0.0f32; 2];
        let cfg = PoolConfig::new(1).with_positional_weights(true);
        sum_ids(&cfg, &bags, &mut out).unwrap();
        // Bag 0: 1*10 + 2*100, bag 1: 3*10.
        assert_eq!(out, vec![210.0, 30.0]);
    }
}
