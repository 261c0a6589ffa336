//! Software prefetch for random row gathers.
//!
//! Purely advisory: a prefetch never faults and never changes results, so
//! every kernel produces identical output with prefetch disabled.

/// Cache line size assumed when touching every line of a row.
pub const CACHE_LINE_BYTES: usize = 64;

/// Hint the CPU to pull the line holding `ptr` into L1.
///
/// No-op on targets without a stable prefetch instruction.
#[inline(always)]
pub fn prefetch_read<T>(ptr: *const T) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        std::arch::x86_64::_mm_prefetch(ptr as *const i8, std::arch::x86_64::_MM_HINT_T0);
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        std::arch::asm!(
            "prfm pldl1keep, [{0}]",
            in(reg) ptr,
            options(nostack, preserves_flags)
        );
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        let _ = ptr;
    }
}

/// Touch every cache line `row` spans.
#[inline(always)]
pub fn prefetch_row<T>(row: &[T]) {
    let base = row.as_ptr() as *const u8;
    let bytes = std::mem::size_of_val(row);
    let mut offset = 0;
    while offset < bytes {
        prefetch_read(base.wrapping_add(offset));
        offset += CACHE_LINE_BYTES;
    }
}

/// Position of the index to prefetch while processing `current`: a fixed
/// window ahead, clamped to the last index.
#[inline(always)]
pub fn lookahead(current: usize, distance: usize, index_size: usize) -> usize {
    current.saturating_add(distance).min(index_size.saturating_sub(1))
}
