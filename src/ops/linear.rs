//! Single entry point for linearly quantized tables of any supported width.

use crate::error::{report, PoolResult};
use crate::kernel_types::{Bags, LinearConfig};
use crate::types::{IndexValue, OutputElement};
use crate::validation::validate_bit_rate;

use super::int8::try_pool_int8;
use super::nbit::try_pool_nbit;

/// Bit rates accepted by [`try_pool_linear`].
pub const LINEAR_BIT_RATES: [u8; 3] = [2, 4, 8];

/// Pool a 2-, 4- or 8-bit table, routing to the matching kernel.
pub fn try_pool_linear<I, O, T>(
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
    validate_bit_rate(bit_rate, &LINEAR_BIT_RATES)?;
    if bit_rate == 8 {
        try_pool_int8(config, data_size, table, bags, out)
    } else {
        try_pool_nbit(bit_rate, config, data_size, table, bags, out)
    }
}

/// Boolean form of [`try_pool_linear`].
pub fn pool_linear<I, O, T>(
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
    report("pool_linear", try_pool_linear(bit_rate, config, data_size, table, bags, out))
}
