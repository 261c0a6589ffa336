//! Kernel configuration and call inputs shared by every pooling variant.

use crate::types::IndexValue;

/// Default lookahead, in indices, for software prefetch of table rows.
pub const DEFAULT_PREFETCH_DISTANCE: usize = 16;

/// Settings common to every pooling kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Logical elements per row.
    pub block_size: usize,
    /// Divide each pooled row by its bag length (empty bags stay zero).
    pub normalize_by_lengths: bool,
    /// Weights are addressed by position inside the bag instead of by
    /// absolute position in the index sequence.
    pub is_weight_positional: bool,
    /// Segmentation is `offsets` (`output_size + 1` entries) rather than
    /// `lengths` (`output_size` entries).
    pub use_offsets: bool,
    /// Output row stride in output elements; `None` derives it.
    pub output_stride: Option<usize>,
    /// Table row stride in table elements; `None` derives it.
    pub input_stride: Option<usize>,
    /// Prefetch the row `prefetch_distance` indices ahead; 0 disables it.
    pub prefetch_distance: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: 64,
            normalize_by_lengths: false,
            is_weight_positional: false,
            use_offsets: true,
            output_stride: None,
            input_stride: None,
            prefetch_distance: DEFAULT_PREFETCH_DISTANCE,
        }
    }
}

impl PoolConfig {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            ..Default::default()
        }
    }

    pub fn with_normalize(mut self, normalize_by_lengths: bool) -> Self {
        self.normalize_by_lengths = normalize_by_lengths;
        self
    }

    pub fn with_positional_weights(mut self, is_weight_positional: bool) -> Self {
        self.is_weight_positional = is_weight_positional;
        self
    }

    pub fn with_lengths(mut self) -> Self {
        self.use_offsets = false;
        self
    }

    pub fn with_output_stride(mut self, stride: usize) -> Self {
        self.output_stride = Some(stride);
        self
    }

    pub fn with_input_stride(mut self, stride: usize) -> Self {
        self.input_stride = Some(stride);
        self
    }

    pub fn with_prefetch_distance(mut self, distance: usize) -> Self {
        self.prefetch_distance = distance;
        self
    }
}

/// Configuration for linearly quantized (2/4/8-bit) tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearConfig {
    pub pool: PoolConfig,
    /// Scale/bias follow the packed codes instead of preceding them.
    pub scale_bias_last: bool,
    /// One output row per index, no pooling. 8-bit tables only.
    pub no_bag: bool,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            scale_bias_last: true,
            no_bag: false,
        }
    }
}

impl LinearConfig {
    pub fn new(pool: PoolConfig) -> Self {
        Self {
            pool,
            ..Default::default()
        }
    }

    pub fn with_scale_bias_last(mut self, scale_bias_last: bool) -> Self {
        self.scale_bias_last = scale_bias_last;
        self
    }

    pub fn with_no_bag(mut self, no_bag: bool) -> Self {
        self.no_bag = no_bag;
        self
    }
}

/// Minifloat byte layout: sign, `exponent_bits` exponent, rest mantissa.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinifloatFormat {
    pub exponent_bits: u32,
    pub exponent_bias: i32,
}

impl MinifloatFormat {
    /// 4 exponent bits, 3 mantissa bits, bias 7.
    pub const E4M3: Self = Self {
        exponent_bits: 4,
        exponent_bias: 7,
    };
    /// 5 exponent bits, 2 mantissa bits, bias 15.
    pub const E5M2: Self = Self {
        exponent_bits: 5,
        exponent_bias: 15,
    };

    pub const fn mantissa_bits(&self) -> u32 {
        7 - self.exponent_bits
    }
}

impl Default for MinifloatFormat {
    fn default() -> Self {
        Self::E4M3
    }
}

/// Configuration for minifloat tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MinifloatConfig {
    pub pool: PoolConfig,
    pub format: MinifloatFormat,
}

impl MinifloatConfig {
    pub fn new(pool: PoolConfig, format: MinifloatFormat) -> Self {
        Self { pool, format }
    }
}

/// Index sequence, its bag segmentation and optional per-index weights.
#[derive(Clone, Copy, Debug)]
pub struct Bags<'a, I, O> {
    pub indices: &'a [I],
    /// Offsets or lengths, selected by [`PoolConfig::use_offsets`].
    pub offsets_or_lengths: &'a [O],
    pub weights: Option<&'a [f32]>,
    pub output_size: usize,
    pub index_size: usize,
}

impl<'a, I: IndexValue, O: IndexValue> Bags<'a, I, O> {
    /// Bags over the whole of `indices`.
    pub fn new(indices: &'a [I], offsets_or_lengths: &'a [O], output_size: usize) -> Self {
        Self {
            indices,
            offsets_or_lengths,
            weights: None,
            output_size,
            index_size: indices.len(),
        }
    }

    pub fn with_weights(mut self, weights: &'a [f32]) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_index_size(mut self, index_size: usize) -> Self {
        self.index_size = index_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let cfg = PoolConfig::new(8)
            .with_normalize(true)
            .with_lengths()
            .with_output_stride(10)
            .with_prefetch_distance(0);
        assert_eq!(cfg.block_size, 8);
        assert!(cfg.normalize_by_lengths);
        assert!(!cfg.use_offsets);
        assert_eq!(cfg.output_stride, Some(10));
        assert_eq!(cfg.input_stride, None);
        assert_eq!(cfg.prefetch_distance, 0);

        let linear = LinearConfig::new(cfg).with_scale_bias_last(false);
        assert!(!linear.scale_bias_last);
        assert!(!linear.no_bag);
    }

    #[test]
    fn test_bags_defaults_to_full_index_sequence() {
        let indices = [0i64, 1, 2];
        let offsets = [0i32, 1, 3];
        let bags = Bags::new(&indices, &offsets, 2);
        assert_eq!(bags.index_size, 3);
        assert!(bags.weights.is_none());
        let weights = [1.0f32; 3];
        let bags = bags.with_weights(&weights).with_index_size(2);
        assert_eq!(bags.index_size, 2);
        assert!(bags.weights.is_some());
    }

    #[test]
    fn test_minifloat_formats() {
        assert_eq!(MinifloatFormat::default(), MinifloatFormat::E4M3);
        assert_eq!(MinifloatFormat::E4M3.mantissa_bits(), 3);
        assert_eq!(MinifloatFormat::E5M2.mantissa_bits(), 2);
    }
}
