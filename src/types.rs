//! Element types and row geometry for embedding-bag pooling.

use half::{bf16, f16};

/// Integer type usable for indices, offsets and lengths.
pub trait IndexValue: Copy + Send + Sync + 'static {
    fn to_i64(self) -> i64;
}

impl IndexValue for i32 {
    #[inline(always)]
    fn to_i64(self) -> i64 {
        self as i64
    }
}

impl IndexValue for i64 {
    #[inline(always)]
    fn to_i64(self) -> i64 {
        self
    }
}

/// Encoding of an output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    F32,
    F16,
    BF16,
    /// Raw encoded row copy. Only valid for 8-bit no-bag gathers.
    Byte,
}

/// Output element: knows its encoding and how to encode an accumulated f32.
pub trait OutputElement: Copy + Default + Send + Sync + 'static {
    const ENCODING: OutputEncoding;
    fn from_f32(value: f32) -> Self;

    /// Encode one stored table byte. Only byte output copies it unchanged.
    #[inline(always)]
    fn from_byte(byte: u8) -> Self {
        Self::from_f32(byte as f32)
    }
}

impl OutputElement for f32 {
    const ENCODING: OutputEncoding = OutputEncoding::F32;

    #[inline(always)]
    fn from_f32(value: f32) -> Self {
        value
    }
}

impl OutputElement for f16 {
    const ENCODING: OutputEncoding = OutputEncoding::F16;

    #[inline(always)]
    fn from_f32(value: f32) -> Self {
        f16::from_f32(value)
    }
}

impl OutputElement for bf16 {
    const ENCODING: OutputEncoding = OutputEncoding::BF16;

    #[inline(always)]
    fn from_f32(value: f32) -> Self {
        bf16::from_f32(value)
    }
}

/// Byte passthrough: rows are copied as stored.
impl OutputElement for u8 {
    const ENCODING: OutputEncoding = OutputEncoding::Byte;

    #[inline(always)]
    fn from_f32(value: f32) -> Self {
        value as u8
    }

    #[inline(always)]
    fn from_byte(byte: u8) -> Self {
        byte
    }
}

/// Storage of the per-row scale/bias pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleBiasKind {
    F16,
    F32,
}

impl ScaleBiasKind {
    /// Bytes occupied by the scale and bias together.
    pub const fn pair_bytes(self) -> usize {
        match self {
            Self::F16 => 4,
            Self::F32 => 8,
        }
    }
}

/// Geometry of a linearly quantized row: packed codes plus a scale/bias pair
/// stored at the head or tail of the row.
///
/// ```text
/// scale_bias_last = true:   [ codes ............ | scale | bias ]
/// scale_bias_last = false:  [ scale | bias | codes ............ ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    pub bit_rate: u8,
    pub block_size: usize,
    pub scale_bias: ScaleBiasKind,
    pub scale_bias_last: bool,
}

impl RowLayout {
    /// 2-bit or 4-bit rows always carry an f16 scale/bias pair.
    pub const fn nbit(bit_rate: u8, block_size: usize, scale_bias_last: bool) -> Self {
        Self {
            bit_rate,
            block_size,
            scale_bias: ScaleBiasKind::F16,
            scale_bias_last,
        }
    }

    /// 8-bit rows carry a trailing f32 pair, or a leading f16 pair when the
    /// scale/bias comes first.
    pub const fn int8(block_size: usize, scale_bias_last: bool) -> Self {
        Self {
            bit_rate: 8,
            block_size,
            scale_bias: if scale_bias_last {
                ScaleBiasKind::F32
            } else {
                ScaleBiasKind::F16
            },
            scale_bias_last,
        }
    }

    pub const fn elements_per_byte(&self) -> usize {
        8 / self.bit_rate as usize
    }

    /// Bytes of packed codes.
    pub const fn payload_bytes(&self) -> usize {
        self.block_size.div_ceil(self.elements_per_byte())
    }

    /// Natural row stride: payload plus scale/bias.
    pub const fn row_bytes(&self) -> usize {
        self.payload_bytes() + self.scale_bias.pair_bytes()
    }

    pub const fn payload_offset(&self) -> usize {
        if self.scale_bias_last {
            0
        } else {
            self.scale_bias.pair_bytes()
        }
    }

    pub const fn scale_bias_offset(&self) -> usize {
        if self.scale_bias_last {
            self.payload_bytes()
        } else {
            0
        }
    }

    /// Accumulator length: block size rounded up to whole bytes of codes.
    pub const fn rounded_block_size(&self) -> usize {
        self.payload_bytes() * self.elements_per_byte()
    }

    /// Packed codes of `row`, which must be at least `row_bytes()` long.
    #[inline(always)]
    pub fn payload<'a>(&self, row: &'a [u8]) -> &'a [u8] {
        let start = self.payload_offset();
        &row[start..start + self.payload_bytes()]
    }

    /// Decode the (scale, bias) pair of `row`.
    #[inline(always)]
    pub fn read_scale_bias(&self, row: &[u8]) -> (f32, f32) {
        let at = self.scale_bias_offset();
        match self.scale_bias {
            ScaleBiasKind::F16 => (
                f16::from_le_bytes([row[at], row[at + 1]]).to_f32(),
                f16::from_le_bytes([row[at + 2], row[at + 3]]).to_f32(),
            ),
            ScaleBiasKind::F32 => (
                f32::from_le_bytes([row[at], row[at + 1], row[at + 2], row[at + 3]]),
                f32::from_le_bytes([row[at + 4], row[at + 5], row[at + 6], row[at + 7]]),
            ),
        }
    }

    /// Encode the (scale, bias) pair into `row`. F16 pairs are rounded.
    pub fn write_scale_bias(&self, row: &mut [u8], scale: f32, bias: f32) {
        let at = self.scale_bias_offset();
        match self.scale_bias {
            ScaleBiasKind::F16 => {
                row[at..at + 2].copy_from_slice(&f16::from_f32(scale).to_le_bytes());
                row[at + 2..at + 4].copy_from_slice(&f16::from_f32(bias).to_le_bytes());
            }
            ScaleBiasKind::F32 => {
                row[at..at + 4].copy_from_slice(&scale.to_le_bytes());
                row[at + 4..at + 8].copy_from_slice(&bias.to_le_bytes());
            }
        }
    }
}
