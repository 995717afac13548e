//! Side metadata about heap objects.

pub mod mark_bitmap;

pub use self::mark_bitmap::MarkBitmap;
