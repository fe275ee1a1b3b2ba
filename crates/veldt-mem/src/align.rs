//! Alignment arithmetic for the arena allocator.

/// Returns `true` if `x` is a power of two.
///
/// Zero is not a power of two; an alignment of zero would make the rounding
/// arithmetic in [`align_forward`] meaningless.
#[inline]
#[must_use]
pub const fn is_power_of_two(x: usize) -> bool {
    x != 0 && x & (x - 1) == 0
}

/// Rounds `addr` up to the next multiple of `align`.
///
/// Returns the smallest address `>= addr` that is a multiple of `align`.
/// `align` must be a power of two; violating this is a programmer error and
/// fails fast in debug builds.
#[inline]
#[must_use]
pub fn align_forward(addr: usize, align: usize) -> usize {
    debug_assert!(
        is_power_of_two(align),
        "alignment must be a power of two, got {align}"
    );
    addr.wrapping_add(align - 1) & !(align - 1)
}
