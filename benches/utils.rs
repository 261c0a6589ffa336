#![allow(dead_code)]

use rand::Rng;

/// Bytes/sec as GiB/s
pub fn throughput_gibs(bytes: usize, duration_secs: f64) -> f64 {
    bytes as f64 / duration_secs / (1024.0 * 1024.0 * 1024.0)
}

/// Table bytes read by one pooling call: one row per index.
pub fn gathered_bytes(index_size: usize, row_bytes: usize) -> u64 {
    index_size as u64 * row_bytes as u64
}

/// Random f32 vector in [-1.0, 1.0)
pub fn random_f32_vec(n: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Random row ids in [0, rows)
pub fn random_indices(n: usize, rows: usize) -> Vec<i64> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.gen_range(0..rows as i64)).collect()
}

/// Offsets for `bags` bags of random length in [0, 2 * mean_len].
pub fn random_offsets(bags: usize, mean_len: usize) -> Vec<i64> {
    let mut rng = rand::thread_rng();
    let mut offsets = Vec::with_capacity(bags + 1);
    offsets.push(0i64);
    for _ in 0..bags {
        let len = rng.gen_range(0..=2 * mean_len) as i64;
        offsets.push(offsets[offsets.len() - 1] + len);
    }
    offsets
}

/// Random compressed-index map keeping roughly `keep` of `rows` rows.
/// Returns the map and the number of surviving rows.
pub fn random_prune_map(rows: usize, keep: f64) -> (Vec<i32>, usize) {
    let mut rng = rand::thread_rng();
    let mut kept = 0usize;
    let map = (0..rows)
        .map(|_| {
            if rng.gen_bool(keep) {
                kept += 1;
                (kept - 1) as i32
            } else {
                -1
            }
        })
        .collect();
    (map, kept)
}
