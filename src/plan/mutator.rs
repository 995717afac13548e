use crate::plan::Epsilon;
use crate::util::alloc::{AllocationError, ThreadLocalAllocBuffer, TlabErgonomics};
use crate::util::constants::{MIN_TLAB_SIZE, TLAB_DESIRED_SIZE, TLAB_REFILL_WASTE_FRACTION};
use crate::util::conversions::raw_align_up;
use crate::util::{Address, VMMutatorThread};
use crate::vm::VMBinding;
use atomic_refcell::AtomicRefCell;
use std::sync::Arc;

/// A mutator's allocation context: its TLAB and the TLAB sizing state.
///
/// The binding creates one per mutator thread with [`crate::memory_manager::bind_mutator`] and
/// only uses it from that thread. The plan keeps a weak handle on the TLAB so that a collection
/// can retire it.
pub struct Mutator<VM: VMBinding> {
    pub mutator_tls: VMMutatorThread,
    pub(crate) plan: &'static Epsilon<VM>,
    pub(crate) ergo: TlabErgonomics,
    tlab: Arc<AtomicRefCell<ThreadLocalAllocBuffer>>,
}

impl<VM: VMBinding> Mutator<VM> {
    pub(crate) fn new(plan: &'static Epsilon<VM>, mutator_tls: VMMutatorThread) -> Self {
        let tlab = Arc::new(AtomicRefCell::new(ThreadLocalAllocBuffer::new()));
        plan.register_tlab(&tlab);
        Mutator {
            mutator_tls,
            plan,
            ergo: TlabErgonomics::default(),
            tlab,
        }
    }

    /// Allocate `size` bytes, rounded up to `MIN_ALIGNMENT`. Tries the TLAB first.
    #[inline(always)]
    pub fn alloc(&mut self, size: usize) -> Result<Address, AllocationError> {
        let size = raw_align_up(size, VM::MIN_ALIGNMENT);
        if let Some(res) = self.tlab.borrow_mut().alloc(size) {
            return Ok(res);
        }
        self.alloc_slow(size)
    }

    /// The TLAB is exhausted. Either refill it, or allocate this object from the shared space if
    /// it is too large for a TLAB or the rest of the TLAB is too large to throw away.
    #[inline(never)]
    fn alloc_slow(&mut self, size: usize) -> Result<Address, AllocationError> {
        let min_size = size.max(MIN_TLAB_SIZE);
        let keep_tlab = {
            let tlab = self.tlab.borrow();
            tlab.free() > tlab.size() / TLAB_REFILL_WASTE_FRACTION
        };
        if min_size > self.plan.tlab_policy().max_tlab_size() || keep_tlab {
            return self.plan.allocate_or_collect_work(self.mutator_tls.0, size);
        }

        let actual_size = match self.refill_tlab(min_size, size + TLAB_DESIRED_SIZE) {
            Ok((_, actual_size)) => actual_size,
            // The heap cannot hold a whole TLAB any more, but it may still hold this object. Any
            // collection has been tried already.
            Err(_) => return self.plan.allocate_work(self.mutator_tls.0, size),
        };
        let res = self.tlab.borrow_mut().alloc(size);
        debug_assert!(res.is_some(), "a fresh TLAB of {} bytes cannot hold {}", actual_size, size);
        res.ok_or(AllocationError::HeapOutOfMemory)
    }

    /// Retire the TLAB and refill it with at least `min_size` bytes, sized by the TLAB policy.
    /// Returns the start and size of the new TLAB. On failure the TLAB stays empty.
    pub(crate) fn refill_tlab(
        &mut self,
        min_size: usize,
        requested_size: usize,
    ) -> Result<(Address, usize), AllocationError> {
        self.tlab.borrow_mut().retire::<VM>();
        // No borrow is held here: a collection triggered by the refill retires every TLAB.
        let (start, size) = self.plan.allocate_new_tlab(
            self.mutator_tls.0,
            &mut self.ergo,
            min_size,
            requested_size,
        )?;
        self.tlab.borrow_mut().fill(start, size);
        Ok((start, size))
    }

    /// Give up the rest of the TLAB, leaving the space parsable.
    pub fn flush(&mut self) {
        self.tlab.borrow_mut().retire::<VM>();
    }

    /// The TLAB sizing state.
    pub fn tlab_ergonomics(&self) -> TlabErgonomics {
        self.ergo
    }

    /// The size of the current TLAB, 0 if there is none.
    pub fn tlab_size(&self) -> usize {
        self.tlab.borrow().size()
    }
}

impl<VM: VMBinding> Drop for Mutator<VM> {
    fn drop(&mut self) {
        self.flush();
    }
}
