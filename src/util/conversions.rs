use crate::util::constants::*;
use crate::util::Address;

/* Alignment */

pub fn is_address_aligned(addr: Address) -> bool {
    addr.is_aligned_to(BYTES_IN_ADDRESS)
}

pub const fn raw_align_up(val: usize, align: usize) -> usize {
    // See https://github.com/rust-lang/rust/blob/e620d0f337d0643c757bab791fc7d88d63217704/src/libcore/alloc.rs#L192
    val.wrapping_add(align).wrapping_sub(1) & !align.wrapping_sub(1)
}

pub const fn raw_align_down(val: usize, align: usize) -> usize {
    val & !align.wrapping_sub(1)
}

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & align.wrapping_sub(1) == 0
}

/* Conversion */

/// Number of bytes of bitmap needed to hold one bit per `granule` bytes of `bytes`.
pub const fn bitmap_bytes_for(bytes: usize, granule: usize) -> usize {
    raw_align_up(bytes / granule, BITS_IN_BYTE) / BITS_IN_BYTE
}

/// `part` as a percentage of `total`. Zero when `total` is zero.
pub fn percent_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Format a byte count with the largest unit that keeps it at or above one, like `12M` or `768K`.
pub fn bytes_to_formatted_string(bytes: usize) -> String {
    const UNITS: [(&str, usize); 3] = [
        ("G", BYTES_IN_GBYTE),
        ("M", BYTES_IN_MBYTE),
        ("K", BYTES_IN_KBYTE),
    ];
    for (suffix, unit) in UNITS {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{}{}", bytes / unit, suffix);
        }
    }
    for (suffix, unit) in UNITS {
        if bytes >= unit {
            return format!("{:.1}{}", bytes as f64 / unit as f64, suffix);
        }
    }
    format!("{}B", bytes)
}
