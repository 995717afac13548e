use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, VMBinding};

/// A thread-local allocation buffer: a private range `[start, limit)` of the shared space that a
/// mutator bump-allocates from without synchronization.
///
/// An empty buffer has all three addresses at zero, so every allocation from it fails and goes
/// to the slow path.
#[derive(Debug)]
pub struct ThreadLocalAllocBuffer {
    start: Address,
    cursor: Address,
    limit: Address,
}

impl Default for ThreadLocalAllocBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadLocalAllocBuffer {
    pub const fn new() -> Self {
        ThreadLocalAllocBuffer {
            start: Address::ZERO,
            cursor: Address::ZERO,
            limit: Address::ZERO,
        }
    }

    /// Start allocating from `[start, start + size)`.
    pub fn fill(&mut self, start: Address, size: usize) {
        debug_assert!(self.is_empty(), "retire the TLAB before refilling it");
        self.start = start;
        self.cursor = start;
        self.limit = start + size;
    }

    /// Bump allocate `size` bytes, or `None` if they do not fit.
    #[inline(always)]
    pub fn alloc(&mut self, size: usize) -> Option<Address> {
        let result = self.cursor;
        let new_cursor = result + size;
        if new_cursor > self.limit {
            None
        } else {
            self.cursor = new_cursor;
            trace!(
                "TLAB allocation size: {}, result: {}, new_cursor: {}, limit: {}",
                size,
                result,
                self.cursor,
                self.limit
            );
            Some(result)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.limit.is_zero()
    }

    /// Bytes left to allocate.
    pub fn free(&self) -> usize {
        self.limit - self.cursor
    }

    /// Total size of the buffer.
    pub fn size(&self) -> usize {
        self.limit - self.start
    }

    /// Give up the rest of the buffer. The unused tail is turned into a dummy object so that the
    /// space below `top` can be walked object by object.
    pub fn retire<VM: VMBinding>(&mut self) {
        if self.is_empty() {
            return;
        }
        let remaining = self.free();
        if remaining > 0 {
            trace!("Retiring TLAB, filling [{}, {})", self.cursor, self.limit);
            VM::VMObjectModel::fill_with_dummy_object(self.cursor, remaining);
            debug_assert!(VM::VMObjectModel::is_dummy_object(unsafe {
                ObjectReference::from_raw_address_unchecked(self.cursor)
            }));
        }
        *self = Self::new();
    }
}
