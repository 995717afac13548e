//! Memory policies that can be used for spaces.

/// A single bump-pointer space over one contiguous address range.
pub mod contiguousspace;

pub use self::contiguousspace::ContiguousSpace;
