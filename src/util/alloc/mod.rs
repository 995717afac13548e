//! Allocation support: thread-local allocation buffers and their sizing policy.

pub mod tlab;
pub mod tlab_sizing;

pub use self::tlab::ThreadLocalAllocBuffer;
pub use self::tlab_sizing::{TlabErgonomics, TlabSize, TlabSizingPolicy};

/// The reason an allocation failed, passed to [`crate::vm::Collection::out_of_memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    /// The heap is full and a collection, if one was allowed, did not free enough space.
    HeapOutOfMemory,
    /// The heap was not full, but the OS refused to commit more memory.
    MmapOutOfMemory,
}
