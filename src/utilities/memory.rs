//! Utilities to manipulate generic memory
#![macro_use]

#[macro_export]
macro_rules! kb {
    ($val:expr) => {
        $val * 1024
    };
}

/// Rounds `value` down to the closest multiple of `alignment`.
pub const fn align_down(value: usize, alignment: usize) -> usize { value - (value % alignment) }

/// Rounds `value` up to the closest multiple of `alignment`.
pub const fn align_up(value: usize, alignment: usize) -> usize {
    match value % alignment {
        0 => value,
        remainder => value + (alignment - remainder),
    }
}

/// Range of erase blocks (as a start offset and a length, both block aligned)
/// that fully covers `size` bytes starting at `offset`.
pub fn covering_blocks(offset: usize, size: usize, block_size: usize) -> (usize, usize) {
    let start = align_down(offset, block_size);
    let end = align_up(offset + size, block_size);
    (start, end - start)
}

/// Whether the `[offset, offset + size)` range fits in a memory of `length` bytes.
pub fn fits(offset: usize, size: usize, length: usize) -> bool {
    offset.checked_add(size).map_or(false, |end| end <= length)
}
