//! Kernels hold no shared state: disjoint output ranges can be pooled from
//! parallel threads over the same table and must match a single call.

use rayon::prelude::*;

use embedding_bag_kernels::{
    build_table_8bit, build_table_minifloat, pool_linear, pool_minifloat, Bags, LinearConfig,
    MinifloatConfig, MinifloatFormat, PoolConfig,
};

const BLOCK_SIZE: usize = 32;
const ROWS: usize = 256;
const BAGS: usize = 96;
const BAGS_PER_TASK: usize = 8;

fn matrix() -> Vec<f32> {
    (0..ROWS * BLOCK_SIZE)
        .map(|i| ((i * 40503) % 1013) as f32 / 101.3 - 5.0)
        .collect()
}

/// Bag lengths cycling through 0..=9, and indices scattered over the table.
fn bags_layout() -> (Vec<i64>, Vec<i64>) {
    let mut offsets = vec![0i64];
    for b in 0..BAGS {
        offsets.push(offsets[b] + (b % 10) as i64);
    }
    let total = offsets[BAGS] as usize;
    let indices = (0..total).map(|i| ((i * 97 + 13) % ROWS) as i64).collect();
    (indices, offsets)
}

/// Pool `BAGS_PER_TASK` bags per rayon task into its own slice of `out`.
fn pool_parallel<F>(indices: &[i64], offsets: &[i64], out: &mut [f32], pool: F)
where
    F: Fn(&Bags<'_, i64, i64>, &mut [f32]) -> bool + Sync,
{
    out.par_chunks_mut(BAGS_PER_TASK * BLOCK_SIZE)
        .enumerate()
        .for_each(|(task, chunk)| {
            let first = task * BAGS_PER_TASK;
            let n = chunk.len() / BLOCK_SIZE;
            let bag_offsets = &offsets[first..=first + n];
            let start = bag_offsets[0] as usize;
            let end = bag_offsets[n] as usize;
            let bags = Bags::new(&indices[start..end], bag_offsets, n);
            assert!(pool(&bags, chunk), "task {task}");
        });
}

#[test]
fn parallel_linear_pooling_matches_single_call() {
    let table = build_table_8bit(&matrix(), BLOCK_SIZE, true).unwrap();
    let (indices, offsets) = bags_layout();
    let cfg = LinearConfig::new(PoolConfig::new(BLOCK_SIZE).with_normalize(true));

    let mut serial = vec![0.0f32; BAGS * BLOCK_SIZE];
    assert!(pool_linear(8, &cfg, ROWS, &table, &Bags::new(&indices, &offsets, BAGS), &mut serial));

    let mut parallel = vec![0.0f32; BAGS * BLOCK_SIZE];
    pool_parallel(&indices, &offsets, &mut parallel, |bags, out| {
        pool_linear(8, &cfg, ROWS, &table, bags, out)
    });
    assert_eq!(parallel, serial);
}

#[test]
fn parallel_minifloat_pooling_matches_single_call() {
    let format = MinifloatFormat::E5M2;
    let table = build_table_minifloat(&matrix(), BLOCK_SIZE, format).unwrap();
    let (indices, offsets) = bags_layout();
    let cfg = MinifloatConfig::new(PoolConfig::new(BLOCK_SIZE), format);

    let mut serial = vec![0.0f32; BAGS * BLOCK_SIZE];
    assert!(pool_minifloat(&cfg, ROWS, &table, &Bags::new(&indices, &offsets, BAGS), &mut serial));

    let mut parallel = vec![0.0f32; BAGS * BLOCK_SIZE];
    pool_parallel(&indices, &offsets, &mut parallel, |bags, out| {
        pool_minifloat(&cfg, ROWS, &table, bags, out)
    });
    assert_eq!(parallel, serial);
}
