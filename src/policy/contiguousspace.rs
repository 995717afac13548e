use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, VMBinding};
use atomic::{Atomic, Ordering};

/// A single bump-pointer space `[bottom, end)` in which `[bottom, top)` is allocated.
///
/// Allocation claims memory with a CAS on `top` and never takes a lock. `end` only moves under the
/// heap lock, when the heap grows or shrinks. `top` only moves down at the end of a sliding cycle.
///
/// Between allocations `[bottom, top)` is parsable: it is a sequence of objects and dummy objects
/// with no gaps, as long as the mutators' TLABs have been retired.
pub struct ContiguousSpace {
    bottom: Address,
    top: Atomic<Address>,
    end: Atomic<Address>,
}

impl ContiguousSpace {
    pub fn new(bottom: Address, end: Address) -> Self {
        ContiguousSpace {
            bottom,
            top: Atomic::new(bottom),
            end: Atomic::new(end),
        }
    }

    pub fn bottom(&self) -> Address {
        self.bottom
    }

    pub fn top(&self) -> Address {
        self.top.load(Ordering::Acquire)
    }

    pub fn end(&self) -> Address {
        self.end.load(Ordering::Acquire)
    }

    /// Move the end of the space. Only called with the heap lock held.
    pub fn set_end(&self, end: Address) {
        debug_assert!(end >= self.top());
        self.end.store(end, Ordering::Release);
    }

    /// Retract or advance `top`. Only called while the mutators are stopped.
    pub fn set_top(&self, top: Address) {
        debug_assert!(top >= self.bottom && top <= self.end());
        self.top.store(top, Ordering::Release);
    }

    pub fn used(&self) -> usize {
        self.top() - self.bottom
    }

    pub fn capacity(&self) -> usize {
        self.end() - self.bottom
    }

    pub fn free(&self) -> usize {
        self.end() - self.top()
    }

    /// Is `addr` in the allocated part of the space?
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.bottom && addr < self.top()
    }

    /// Claim `size` bytes from the shared cursor. Lock-free; concurrent callers get disjoint
    /// ranges. Returns `None` if the space up to `end` cannot hold them.
    pub fn par_allocate(&self, size: usize) -> Option<Address> {
        let mut top = self.top.load(Ordering::Relaxed);
        loop {
            let end = self.end.load(Ordering::Acquire);
            let new_top = top.as_usize().checked_add(size)?;
            if new_top > end.as_usize() {
                return None;
            }
            let new_top = unsafe { Address::from_usize(new_top) };
            match self
                .top
                .compare_exchange_weak(top, new_top, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Some(top),
                Err(current) => top = current,
            }
        }
    }

    /// Walk `[bottom, top)` object by object, skipping dummy objects. The space must be parsable.
    pub fn object_iterate<VM: VMBinding, F: FnMut(ObjectReference)>(&self, mut f: F) {
        let top = self.top();
        let mut cursor = self.bottom;
        while cursor < top {
            let object = unsafe { ObjectReference::from_raw_address_unchecked(cursor) };
            let size = VM::VMObjectModel::get_current_size(object);
            debug_assert!(size > 0, "zero-sized object at {}", cursor);
            if !VM::VMObjectModel::is_dummy_object(object) {
                f(object);
            }
            cursor += size;
        }
    }
}
