//! embedding-bag-kernels: quantized embedding-bag pooling on the CPU.
//!
//! Gathers encoded rows of an embedding table by index, dequantizes them,
//! applies optional per-index weights, sums each bag into one row and
//! re-encodes the result:
//! - **Linear tables**: 2/4-bit rows with an f16 scale/bias pair, 8-bit rows
//!   with an f32 or f16 pair, plus an 8-bit no-bag gather
//! - **Row-wise pruned tables**: indices resolved through a compressed-index
//!   map, with `-1` marking a pruned row
//! - **Minifloat tables**: one FP8-like byte per element, no scale/bias
//! - **Output**: f32, f16, bf16, or raw bytes for the 8-bit gather
//!
//! Every kernel has a `try_*` form returning [`PoolResult`] and a plain form
//! returning `bool`. Output rows written before a failure are not rolled
//! back; discard the output on any error.
//!
//! # Quick Start
//!
//! ```
//! use embedding_bag_kernels::{build_table_8bit, pool_linear, Bags, LinearConfig, PoolConfig};
//!
//! let rows = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
//! let table = build_table_8bit(&rows, 4, true).unwrap();
//! let indices = [0i64, 1];
//! let offsets = [0i64, 2];
//! let bags = Bags::new(&indices, &offsets, 1);
//!
//! let mut out = [0.0f32; 4];
//! let config = LinearConfig::new(PoolConfig::new(4));
//! assert!(pool_linear(8, &config, 2, &table, &bags, &mut out));
//! ```

pub mod error;
pub mod kernel_types;
pub mod ops;
pub mod quantization;
pub mod scalar_ops;
pub mod types;
pub mod validation;

pub use error::{PoolError, PoolResult};
pub use kernel_types::{
    Bags, LinearConfig, MinifloatConfig, MinifloatFormat, PoolConfig, DEFAULT_PREFETCH_DISTANCE,
};
pub use types::{IndexValue, OutputElement, OutputEncoding, RowLayout, ScaleBiasKind};

// Pooling kernels
pub use ops::{
    decode_table, pool_int8, pool_linear, pool_minifloat, pool_nbit, pool_rowwise_sparse,
    try_pool_int8, try_pool_linear, try_pool_minifloat, try_pool_nbit, try_pool_rowwise_sparse,
    SparseRow, LINEAR_BIT_RATES, PRUNED_ROW,
};

// Scalar decode/encode helpers
pub use scalar_ops::{
    bf16_to_f32, f16_to_f32, f32_to_bf16, f32_to_f16, f32_to_minifloat, minifloat_to_f32,
};

// Table builders
pub use quantization::{
    build_table_8bit, build_table_minifloat, build_table_nbit, dequantize_row,
    quantize_row_8bit, quantize_row_minifloat, quantize_row_nbit, unpack_codes,
};
