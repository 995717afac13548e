//! VM-to-MMTk interface: safe Rust APIs.
//!
//! This module provides a safe Rust API for the collector.
//! We expect the VM binding to inherit and extend this API by:
//! 1. adding their VM-specific functions
//! 2. exposing the functions to native if necessary. And the VM binding needs to manage the unsafety
//!    for exposing this safe API to FFI.
//!
//! For example, for mutators, this API provides a `Box<Mutator>`, and requires a `&mut Mutator` for allocation.
//! A VM binding can borrow a mutable reference directly from `Box<Mutator>`, and call `alloc()`. Alternatively,
//! it can turn the `Box` pointer to a native pointer (`*mut Mutator`), and forge a mut reference from the native
//! pointer. Either way, the VM binding code needs to guarantee the safety.

use crate::mmtk::MMTKBuilder;
use crate::mmtk::MMTK;
use crate::plan::{CollectionOutcome, CollectionStats, GCCause, Mutator};
use crate::util::conversions::raw_align_up;
use crate::util::heap::inspection;
use crate::util::opaque_pointer::*;
use crate::util::{Address, ObjectReference};
use crate::vm::{Collection, VMBinding};

/// Initialize an MMTk instance: reserve the heap and its mark bitmap, and commit the initial
/// heap size.
///
/// We expect a binding to initialize MMTk in the following steps:
///
/// 1. Create an [MMTKBuilder](../mmtk/struct.MMTKBuilder.html) instance. It reads options from
///    `EPSILON_*` environment variables.
/// 2. Override options with [`MMTKBuilder::set_option`].
/// 3. Call this function. Usually a binding stores the instance for the rest of the process, e.g.
///    with `Box::leak()`, since mutators keep a `'static` reference to it.
///
/// Note that this method will attempt to initialize a logger. If the VM would like to use its own
/// logger, it should initialize the logger before calling this method.
///
/// Panics if the heap cannot be reserved or committed. Use [`MMTKBuilder::try_build`] to handle
/// that case instead.
///
/// Arguments:
/// * `builder`: The reference to a MMTk builder.
pub fn mmtk_init<VM: VMBinding>(builder: &MMTKBuilder) -> Box<MMTK<VM>> {
    match crate::util::logger::try_init() {
        Ok(_) => debug!("MMTk initialized the logger."),
        Err(_) => debug!(
            "MMTk failed to initialize the logger. Possibly a logger has been initialized by user."
        ),
    }
    let mmtk = builder.build();
    info!("Initialized MMTk with {:?}", mmtk.options);
    Box::new(mmtk)
}

/// Request MMTk to create a mutator for the given thread. For performance reasons, A VM should
/// store the returned mutator in a thread local storage that can be accessed efficiently.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread that will be associated with the mutator.
pub fn bind_mutator<VM: VMBinding>(
    mmtk: &'static MMTK<VM>,
    tls: VMMutatorThread,
) -> Box<Mutator<VM>> {
    Box::new(Mutator::new(&mmtk.plan, tls))
}

/// Reclaim a mutator that is no longer needed. Its TLAB is retired.
///
/// Arguments:
/// * `mutator`: A reference to the mutator to be destroyed.
pub fn destroy_mutator<VM: VMBinding>(mutator: Box<Mutator<VM>>) {
    drop(mutator);
}

/// Flush the mutator's local states: the rest of its TLAB is given up and filled with a dummy
/// object, so that the heap can be walked.
///
/// Arguments:
/// * `mutator`: A reference to the mutator.
pub fn flush_mutator<VM: VMBinding>(mutator: &mut Mutator<VM>) {
    mutator.flush()
}

/// Allocate memory for an object. The size is rounded up to `VM::MIN_ALIGNMENT`, and so is the
/// returned address. The memory is not zeroed if the heap ran a collection before: the caller
/// must initialize the whole object before the next collection.
///
/// If the allocation fails, even after a collection when implicit collections are enabled,
/// [`Collection::out_of_memory`] is called and `Address::ZERO` is returned.
///
/// Arguments:
/// * `mutator`: The mutator to perform this allocation request.
/// * `size`: The number of bytes required for the object.
pub fn alloc<VM: VMBinding>(mutator: &mut Mutator<VM>, size: usize) -> Address {
    match mutator.alloc(size) {
        Ok(addr) => addr,
        Err(e) => {
            VM::VMCollection::out_of_memory(mutator.mutator_tls.0, e);
            Address::ZERO
        }
    }
}

/// Allocate `size` bytes from the shared space, bypassing TLABs. Collects and retries once if the
/// heap is full and implicit collections are enabled. Returns `None` on failure and leaves it to
/// the caller to report it.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread that allocates.
/// * `size`: The number of bytes required. Rounded up to `VM::MIN_ALIGNMENT`.
pub fn allocate_shared<VM: VMBinding>(
    mmtk: &MMTK<VM>,
    tls: VMThread,
    size: usize,
) -> Option<Address> {
    mmtk.plan
        .allocate_or_collect_work(tls, raw_align_up(size, VM::MIN_ALIGNMENT))
        .ok()
}

/// Refill the mutator's TLAB now, sized with the mutator's TLAB ergonomics. Returns the start
/// and the actual size of the new TLAB, which is between `min_size` and the maximum TLAB size.
///
/// The previous TLAB is retired first. The new range is the mutator's TLAB: [`alloc`] serves
/// objects from it, and the next collection retires it like any other TLAB, so the binding
/// must not write objects into it other than through [`alloc`].
///
/// Arguments:
/// * `mutator`: The mutator whose TLAB is refilled.
/// * `min_size`: The smallest acceptable TLAB. At most the maximum TLAB size.
/// * `requested_size`: The size the binding would like.
pub fn allocate_tlab<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    min_size: usize,
    requested_size: usize,
) -> Option<(Address, usize)> {
    let min_size = raw_align_up(min_size, VM::MIN_ALIGNMENT);
    if min_size > mutator.plan.tlab_policy().max_tlab_size() {
        return None;
    }
    mutator.refill_tlab(min_size, requested_size).ok()
}

/// Trigger a garbage collection as requested by the user.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread that triggers this collection request.
pub fn handle_user_collection_request<VM: VMBinding>(mmtk: &MMTK<VM>, tls: VMMutatorThread) {
    mmtk.plan.collect(tls.0, GCCause::ExplicitGC);
}

/// Request a collection for the given cause and report what came of it.
///
/// Metadata causes are handed back through [`Collection::resize_metadata`]. The other causes run
/// a sliding cycle if `sliding_gc` is enabled, and are ignored otherwise. A request is coalesced
/// if another thread collected while it waited, and skipped if any thread is pinned.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread that triggers this collection request.
/// * `cause`: Why the collection is requested.
pub fn request_collection<VM: VMBinding>(
    mmtk: &MMTK<VM>,
    tls: VMThread,
    cause: GCCause,
) -> CollectionOutcome {
    mmtk.plan.collect(tls, cause)
}

/// Enter a region in which thread `tls` holds the raw address of `object`, e.g. in native code.
/// No object moves until every thread has left its pinned regions. Regions nest per thread.
///
/// Pinning is coarse: it holds the whole heap in place, not only `object`. It does nothing if
/// `sliding_gc` is disabled, as nothing ever moves then.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread entering the pinned region.
/// * `object`: The object whose address escapes.
pub fn pin_object<VM: VMBinding>(mmtk: &MMTK<VM>, tls: VMThread, object: ObjectReference) {
    if mmtk.options.sliding_gc {
        trace!("Pinning {} for {:?}", object, tls);
        mmtk.plan.pins().pin(tls);
    }
}

/// Leave a region entered with [`pin_object`]. Panics if `tls` is not in a pinned region.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread leaving the pinned region.
/// * `object`: The object passed to the matching [`pin_object`].
pub fn unpin_object<VM: VMBinding>(mmtk: &MMTK<VM>, tls: VMThread, object: ObjectReference) {
    if mmtk.options.sliding_gc {
        trace!("Unpinning {} for {:?}", object, tls);
        mmtk.plan.pins().unpin(tls);
    }
}

/// Is any thread in a pinned region?
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn is_pinning_active<VM: VMBinding>(mmtk: &MMTK<VM>) -> bool {
    mmtk.plan.pins().is_active()
}

/// Return used memory in bytes. This includes the unused parts of TLABs.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn used_bytes<VM: VMBinding>(mmtk: &MMTK<VM>) -> usize {
    mmtk.plan.used()
}

/// Return committed memory in bytes.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn committed_bytes<VM: VMBinding>(mmtk: &MMTK<VM>) -> usize {
    mmtk.plan.capacity()
}

/// Return the total memory in bytes: the size of the reserved heap.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn total_bytes<VM: VMBinding>(mmtk: &MMTK<VM>) -> usize {
    mmtk.plan.max_capacity()
}

/// Return free memory in bytes, committed or not.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn free_bytes<VM: VMBinding>(mmtk: &MMTK<VM>) -> usize {
    mmtk.plan.max_capacity() - mmtk.plan.used()
}

/// Is `object` in the allocated part of the heap?
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `object`: The object reference to query.
pub fn is_in_heap<VM: VMBinding>(mmtk: &MMTK<VM>, object: ObjectReference) -> bool {
    mmtk.plan.is_in(object)
}

/// The number of sliding cycles that have started.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn collection_count<VM: VMBinding>(mmtk: &MMTK<VM>) -> usize {
    mmtk.state.collection_count()
}

/// Statistics of the last completed sliding cycle.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn last_collection_stats<VM: VMBinding>(mmtk: &MMTK<VM>) -> Option<CollectionStats> {
    mmtk.state.last_collection_stats()
}

/// Visit every object in the heap, in address order. Dummy objects are skipped. Dead objects are
/// visited too if no cycle has run since they died.
///
/// This retires every mutator's TLAB. The mutators must not be allocating, or a collection be
/// running, during the call.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `f`: The callback.
pub fn enumerate_objects<VM: VMBinding, F: FnMut(ObjectReference)>(mmtk: &MMTK<VM>, f: F) {
    mmtk.plan.object_iterate(f)
}

/// The size of `object` in bytes.
pub fn size_of<VM: VMBinding>(object: ObjectReference) -> usize {
    inspection::size_of::<VM>(object)
}

/// The current address of `object`. It changes whenever a sliding cycle moves the object.
pub fn address_of(object: ObjectReference) -> Address {
    inspection::address_of(object)
}

/// The non-null references held by `object`, in field order.
pub fn referenced_objects<VM: VMBinding>(object: ObjectReference) -> Vec<ObjectReference> {
    inspection::referenced_objects::<VM>(object)
}

/// The size of `object` and everything reachable from it. See [`deep_size_of_with`].
pub fn deep_size_of<VM: VMBinding>(object: ObjectReference) -> usize {
    inspection::deep_size_of::<VM>(object)
}

/// The size of the subgraph reachable from `object`, with `include_check` deciding what each
/// object contributes. It returns a combination of
/// [`DEEP_SIZE_OF_SHALLOW`](crate::util::heap::inspection::DEEP_SIZE_OF_SHALLOW) (count the
/// object) and [`DEEP_SIZE_OF_TRAVERSE`](crate::util::heap::inspection::DEEP_SIZE_OF_TRAVERSE)
/// (follow its references), or a negative size to count instead of the object, without following
/// its references.
///
/// The heap must not change during the call.
pub fn deep_size_of_with<VM: VMBinding>(
    object: ObjectReference,
    include_check: impl FnMut(ObjectReference) -> i64,
) -> usize {
    inspection::deep_size_of_with::<VM>(object, include_check)
}
