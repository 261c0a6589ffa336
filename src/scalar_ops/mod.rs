//! Scalar format conversions shared by every kernel.
//!
//! These serve as:
//! 1. Golden reference for correctness testing.
//! 2. The decode/encode step of each pooling kernel, so that all variants
//!    produce identical bits for identical logical values.

pub mod convert;

pub use convert::{
    bf16_to_f32, f16_to_f32, f32_to_bf16, f32_to_f16, f32_to_minifloat, minifloat_to_f32,
    MAX_MINIFLOAT_BIAS,
};
