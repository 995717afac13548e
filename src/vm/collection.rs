use crate::util::alloc::AllocationError;
use crate::util::VMThread;
use crate::vm::VMBinding;

/// VM-specific methods for collections: the stop-the-world capability, and the hooks the
/// collector calls for concerns it does not own.
pub trait Collection<VM: VMBinding> {
    /// Stop every mutator thread other than `tls`, and return once they are all stopped.
    ///
    /// The collector runs the whole cycle on the calling thread between this call and
    /// [`Collection::resume_mutators`]. It relies on stopped threads not touching the heap, not
    /// using their [`crate::plan::Mutator`], and not entering or leaving pinned regions. Each
    /// stopped thread must have its reference-holding state (stack slots, handles) visible to
    /// [`crate::vm::Scanning::scan_roots`].
    ///
    /// The calling thread holds the heap lock during the whole pause. Other mutators may be
    /// waiting for that lock inside an allocation or a collection request, where they cannot
    /// reach a safepoint. Such a thread is bracketed by [`Collection::enter_heap_lock_wait`] and
    /// [`Collection::leave_heap_lock_wait`], and must count as stopped in between.
    fn stop_all_mutators(tls: VMThread);

    /// Resume the threads stopped by [`Collection::stop_all_mutators`].
    fn resume_mutators(tls: VMThread);

    /// The mutator `tls` is about to block on the heap lock, which a collecting thread holds
    /// across [`Collection::stop_all_mutators`]. A VM with cooperative safepoints marks the
    /// thread as stopped here. The thread does not touch the heap until
    /// [`Collection::leave_heap_lock_wait`].
    fn enter_heap_lock_wait(_tls: VMThread) {}

    /// The mutator `tls` acquired the heap lock. Any pause that counted it as stopped has ended.
    fn leave_heap_lock_wait(_tls: VMThread) {}

    /// An allocation could not be satisfied, even after collecting if collecting was allowed. The
    /// allocation call returns [`crate::util::Address::ZERO`] after this returns, so a VM that
    /// raises an exception here must be able to unwind past the allocation site.
    fn out_of_memory(_tls: VMThread, err_kind: AllocationError) {
        panic!("Out of memory with {:?}!", err_kind);
    }

    /// The runtime asked for a metadata-threshold collection. The collector has nothing to do for
    /// metadata, so it only hands the request back for the runtime to resize its metadata area.
    fn resize_metadata(_tls: VMThread) {}

    /// Refresh the runtime's monitoring counters. Called periodically while allocating, and
    /// after each collection.
    fn update_counters(_used: usize, _committed: usize, _max: usize) {}
}
