pub mod accumulate;
pub mod int8;
pub mod linear;
pub mod minifloat;
pub mod nbit;
pub mod prefetch;
pub mod rowwise_sparse;

pub use int8::{pool_int8, try_pool_int8};
pub use linear::{pool_linear, try_pool_linear, LINEAR_BIT_RATES};
pub use minifloat::{decode_table, pool_minifloat, try_pool_minifloat};
pub use nbit::{pool_nbit, try_pool_nbit};
pub use rowwise_sparse::{pool_rowwise_sparse, try_pool_rowwise_sparse, SparseRow, PRUNED_ROW};
