use super::gc_work::{self, MarkCounts, MarkingClosure};
use crate::global_state::GlobalState;
use crate::plan::gc_requester::GCRequester;
use crate::policy::contiguousspace::ContiguousSpace;
use crate::util::alloc::{AllocationError, ThreadLocalAllocBuffer, TlabErgonomics, TlabSizingPolicy};
use crate::util::conversions::{bytes_to_formatted_string, percent_of, raw_align_up, raw_is_aligned};
use crate::util::heap::reporting::print_heap_info;
use crate::util::heap::{HeapReporter, VirtualSpace};
use crate::util::memory;
use crate::util::metadata::MarkBitmap;
use crate::util::object_forwarding::PreservedMarks;
use crate::util::options::Options;
use crate::util::pin_state::PinCoordinator;
use crate::util::statistics::PhaseTimer;
use crate::util::{Address, ObjectReference, VMThread};
use crate::vm::{Collection, VMBinding};
use atomic_refcell::AtomicRefCell;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

/// Why a collection was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString)]
pub enum GCCause {
    /// The runtime or the application asked for a collection.
    #[strum(to_string = "System.gc()", serialize = "explicit_gc")]
    ExplicitGC,
    /// An allocation could not be satisfied.
    #[strum(to_string = "Allocation Failure", serialize = "allocation_failure")]
    AllocationFailure,
    /// The runtime's metadata area reached its threshold.
    #[strum(to_string = "Metadata GC Threshold", serialize = "metadata_gc_threshold")]
    MetadataGCThreshold,
    /// The runtime's metadata area is full, and it asks for soft references to be cleared.
    #[strum(
        to_string = "Metadata GC Clear Soft References",
        serialize = "metadata_gc_clear_soft_refs"
    )]
    MetadataGCClearSoftRefs,
}

/// What came of a collection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// A sliding cycle ran.
    Completed(CollectionStats),
    /// Another thread collected while this request was waiting. Nothing was done.
    Coalesced,
    /// A thread was inside a pinned region, so nothing could be moved. Nothing was done.
    SkippedPinned,
    /// Sliding is disabled. Nothing was done.
    Ignored,
    /// The mark bitmap could not be committed. The cycle was abandoned before marking and the heap
    /// is unchanged.
    BitmapCommitFailed,
    /// A metadata request, handed back to the runtime through
    /// [`crate::vm::Collection::resize_metadata`].
    MetadataResized,
}

impl CollectionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CollectionOutcome::Completed(_))
    }
}

/// Statistics of a sliding cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub gc_id: usize,
    pub cause: GCCause,
    /// Objects marked directly from the roots.
    pub reachable_roots: usize,
    /// All live objects.
    pub reachable_heap: usize,
    /// Objects that changed address.
    pub moved: usize,
    /// Mark words saved and restored around the move.
    pub preserved_marks: usize,
    pub used_before: usize,
    pub used_after: usize,
    pub pause: Duration,
}

impl CollectionStats {
    pub fn reclaimed(&self) -> usize {
        self.used_before - self.used_after
    }
}

/// Memory the heap lock guards. Holding the lock also serializes collections.
pub(crate) struct HeapResources {
    virtual_space: VirtualSpace,
    /// Only reserved when sliding is enabled.
    mark_bitmap: Option<MarkBitmap>,
}

/// A collector that only allocates until it is asked to collect, and then runs a single-threaded
/// Lisp2 sliding mark-compact over its one contiguous space.
///
/// Allocation bumps a shared cursor with a CAS, or bumps a per-mutator TLAB carved out of the
/// shared space. The committed part of the heap grows on demand up to `max_heap_size`.
pub struct Epsilon<VM: VMBinding> {
    options: Arc<Options>,
    state: Arc<GlobalState>,
    space: ContiguousSpace,
    heap: Mutex<HeapResources>,
    max_capacity: usize,
    gc_requester: GCRequester,
    pins: PinCoordinator,
    reporter: HeapReporter,
    tlab_policy: TlabSizingPolicy,
    /// TLABs of live mutators, retired at the start of each cycle.
    tlabs: Mutex<Vec<Weak<AtomicRefCell<ThreadLocalAllocBuffer>>>>,
    _p: PhantomData<VM>,
}

impl<VM: VMBinding> Epsilon<VM> {
    /// Reserve the heap and its mark bitmap, and commit `initial_heap_size` of the heap.
    pub fn new(options: Arc<Options>, state: Arc<GlobalState>) -> std::io::Result<Self> {
        assert!(
            VM::MIN_ALIGNMENT.is_power_of_two() && VM::MIN_ALIGNMENT >= ObjectReference::ALIGNMENT,
            "MIN_ALIGNMENT must be a power of two and at least a word, got {}",
            VM::MIN_ALIGNMENT
        );
        let page = memory::page_size();
        let max_heap_size = raw_align_up(options.max_heap_size, page);
        let initial_heap_size = raw_align_up(options.initial_heap_size.min(max_heap_size), page);

        let virtual_space = VirtualSpace::new("heap", max_heap_size, initial_heap_size)?;
        let mark_bitmap = if options.sliding_gc {
            Some(MarkBitmap::new(
                virtual_space.low(),
                virtual_space.reserved_size(),
                VM::MIN_ALIGNMENT,
            )?)
        } else {
            None
        };
        let space = ContiguousSpace::new(virtual_space.low(), virtual_space.high());
        let max_capacity = virtual_space.reserved_size();

        let plan = Epsilon {
            space,
            max_capacity,
            gc_requester: GCRequester::new(),
            pins: PinCoordinator::new(),
            reporter: HeapReporter::new(&options),
            tlab_policy: TlabSizingPolicy::new(&options, VM::MIN_ALIGNMENT),
            tlabs: Mutex::new(vec![]),
            heap: Mutex::new(HeapResources {
                virtual_space,
                mark_bitmap,
            }),
            options,
            state,
            _p: PhantomData,
        };
        plan.print_configuration();
        Ok(plan)
    }

    fn print_configuration(&self) {
        let heap = self.heap.lock().unwrap();
        info!(
            "Heap [{}, {}): {} reserved, {} committed, expanding by at least {}",
            heap.virtual_space.low(),
            heap.virtual_space.reserved_end(),
            bytes_to_formatted_string(self.max_capacity),
            bytes_to_formatted_string(heap.virtual_space.committed_size()),
            bytes_to_formatted_string(self.options.min_heap_expand)
        );
        info!(
            "Using TLAB allocation; max: {}",
            bytes_to_formatted_string(self.tlab_policy.max_tlab_size())
        );
        if self.options.elastic_tlab {
            info!("Elastic TLABs enabled; elasticity: {:.2}x", self.options.tlab_elasticity);
        }
        if self.options.elastic_tlab && self.options.elastic_tlab_decay {
            info!("Elastic TLABs decay enabled; decay time: {}ms", self.options.tlab_decay_time);
        }
        match heap.mark_bitmap.as_ref() {
            Some(bitmap) => info!(
                "Sliding GC enabled (implicit: {}, verify: {}, uncommit: {}); mark bitmap: {}",
                self.options.implicit_gc,
                self.options.verify,
                self.options.uncommit,
                bytes_to_formatted_string(bitmap.reserved_bytes())
            ),
            None => info!("Sliding GC disabled; collection requests are ignored"),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn space(&self) -> &ContiguousSpace {
        &self.space
    }

    pub fn pins(&self) -> &PinCoordinator {
        &self.pins
    }

    pub fn tlab_policy(&self) -> &TlabSizingPolicy {
        &self.tlab_policy
    }

    /// Bytes allocated: everything below `top`, including the unused parts of TLABs.
    pub fn used(&self) -> usize {
        self.space.used()
    }

    /// Bytes of heap backed by memory.
    pub fn capacity(&self) -> usize {
        self.space.capacity()
    }

    /// Bytes reserved for the heap.
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn is_in(&self, object: ObjectReference) -> bool {
        self.space.contains(object.to_raw_address())
    }

    pub(crate) fn register_tlab(&self, tlab: &Arc<AtomicRefCell<ThreadLocalAllocBuffer>>) {
        let mut tlabs = self.tlabs.lock().unwrap();
        tlabs.retain(|t| t.strong_count() > 0);
        tlabs.push(Arc::downgrade(tlab));
    }

    /// Retire the TLAB of every mutator so the space can be parsed. The mutators must not be
    /// allocating.
    pub(crate) fn retire_all_tlabs(&self) {
        let tlabs = self.tlabs.lock().unwrap();
        for tlab in tlabs.iter().filter_map(Weak::upgrade) {
            tlab.borrow_mut().retire::<VM>();
        }
    }

    /// Take the heap lock on behalf of mutator `tls`. A collecting thread holds the lock while the
    /// world is stopped, so a wait for it is bracketed by the binding's lock-wait hooks.
    fn lock_heap(&self, tls: VMThread) -> MutexGuard<'_, HeapResources> {
        if let Ok(heap) = self.heap.try_lock() {
            return heap;
        }
        VM::VMCollection::enter_heap_lock_wait(tls);
        let heap = self.heap.lock().unwrap();
        VM::VMCollection::leave_heap_lock_wait(tls);
        heap
    }

    /// Claim `size` bytes from the shared space, growing the committed heap if needed. Never
    /// collects.
    pub fn allocate_work(&self, tls: VMThread, size: usize) -> Result<Address, AllocationError> {
        debug_assert!(
            raw_is_aligned(size, VM::MIN_ALIGNMENT),
            "unaligned allocation size {}",
            size
        );
        let res = loop {
            if let Some(res) = self.space.par_allocate(size) {
                break res;
            }

            let mut heap = self.lock_heap(tls);
            // Another thread may have grown the heap while we waited for the lock.
            if let Some(res) = self.space.par_allocate(size) {
                break res;
            }

            let virtual_space = &mut heap.virtual_space;
            let uncommitted = virtual_space.uncommitted_size();
            let unused = self.max_capacity - self.space.used();
            let want = size.max(self.options.min_heap_expand);
            debug_assert!(unused >= uncommitted);

            let expand = if want < uncommitted {
                want
            } else if size <= unused {
                // Not enough left to grow in bulk, but this allocation may still fit: take it all.
                uncommitted
            } else {
                trace!("No space left for {} bytes", size);
                return Err(AllocationError::HeapOutOfMemory);
            };
            if expand == 0 {
                return Err(AllocationError::HeapOutOfMemory);
            }
            if let Err(e) = virtual_space.expand_by(expand) {
                warn!("Could not expand the heap by {} bytes: {}", expand, e);
                return Err(AllocationError::MmapOutOfMemory);
            }
            debug!(
                "Expanded heap by {} to {}",
                bytes_to_formatted_string(expand),
                bytes_to_formatted_string(virtual_space.committed_size())
            );
            self.space.set_end(virtual_space.high());
        };

        self.reporter
            .after_allocation::<VM>(self.space.used(), self.space.capacity(), self.max_capacity);
        debug_assert!(res.is_aligned_to(VM::MIN_ALIGNMENT));
        Ok(res)
    }

    /// Like [`Epsilon::allocate_work`], but collect and retry once if the heap is full and
    /// implicit collections are enabled. The retry runs with new pinned regions held off, so
    /// the memory the cycle freed is not lost to a thread that pins in between.
    pub fn allocate_or_collect_work(
        &self,
        tls: VMThread,
        size: usize,
    ) -> Result<Address, AllocationError> {
        match self.allocate_work(tls, size) {
            Err(AllocationError::HeapOutOfMemory)
                if self.options.sliding_gc && self.options.implicit_gc =>
            {
                self.collect(tls, GCCause::AllocationFailure);
                let _blocked = self.pins.block();
                self.allocate_work(tls, size)
            }
            res => res,
        }
    }

    /// Allocate a TLAB of at least `min_size` bytes, sized by the TLAB policy from
    /// `requested_size` and the mutator's ergonomics. Returns the start and the actual size.
    pub fn allocate_new_tlab(
        &self,
        tls: VMThread,
        ergo: &mut TlabErgonomics,
        min_size: usize,
        requested_size: usize,
    ) -> Result<(Address, usize), AllocationError> {
        let now = Instant::now();
        let chosen = self
            .tlab_policy
            .next_tlab_size(ergo, min_size, requested_size, now);
        trace!(
            "TLAB size for {:?} (requested: {}, min: {}, max: {}, ergo: {}) -> {}",
            tls,
            requested_size,
            min_size,
            self.tlab_policy.max_tlab_size(),
            ergo.size,
            chosen.size
        );

        match self.allocate_or_collect_work(tls, chosen.size) {
            Ok(start) => {
                self.tlab_policy.on_refilled(ergo, chosen, now);
                Ok((start, chosen.size))
            }
            Err(e) => {
                self.tlab_policy.on_refill_failed(ergo);
                Err(e)
            }
        }
    }

    /// Handle a collection request.
    pub fn collect(&self, tls: VMThread, cause: GCCause) -> CollectionOutcome {
        let outcome = match cause {
            GCCause::MetadataGCThreshold | GCCause::MetadataGCClearSoftRefs => {
                // Nothing to collect, but the runtime has to resize its metadata area, or it will
                // come back with the same request right away.
                info!("GC request for \"{}\" is handled", cause);
                VM::VMCollection::resize_metadata(tls);
                CollectionOutcome::MetadataResized
            }
            _ if self.options.sliding_gc => self.vmentry_collect(tls, cause),
            _ => {
                info!("GC request for \"{}\" is ignored", cause);
                CollectionOutcome::Ignored
            }
        };
        VM::VMCollection::update_counters(self.used(), self.capacity(), self.max_capacity);
        outcome
    }

    /// Serialize the request against other requests and against heap growth, stop the world, and
    /// run the cycle.
    fn vmentry_collect(&self, tls: VMThread, cause: GCCause) -> CollectionOutcome {
        self.gc_requester
            .request(|| self.lock_heap(tls), |heap| {
                if self.pins.is_active() {
                    info!(
                        "GC request for \"{}\" is skipped: {} thread(s) pinned",
                        cause,
                        self.pins.active_count()
                    );
                    return CollectionOutcome::SkippedPinned;
                }
                VM::VMCollection::stop_all_mutators(tls);
                let outcome = self.entry_collect(heap, cause);
                VM::VMCollection::resume_mutators(tls);
                outcome
            })
            .unwrap_or_else(|| {
                debug!("GC request for \"{}\" is coalesced", cause);
                CollectionOutcome::Coalesced
            })
    }

    /// The sliding cycle. Runs with the heap lock held and the mutators stopped.
    fn entry_collect(&self, heap: &mut HeapResources, cause: GCCause) -> CollectionOutcome {
        // A thread may have pinned between admission and the world stopping.
        if self.pins.is_active() {
            info!("GC request for \"{}\" is skipped: pinned", cause);
            return CollectionOutcome::SkippedPinned;
        }

        // Reserved whenever sliding is enabled, and only sliding collects.
        let Some(mark_bitmap) = heap.mark_bitmap.as_mut() else {
            return CollectionOutcome::Ignored;
        };

        let gc_id = self.state.next_gc_id();
        let start = Instant::now();
        let used_before = self.space.used();
        info!("GC({}) Pause Full ({}) Lisp2-style Mark-Compact", gc_id, cause);

        {
            let _timer = PhaseTimer::start(gc_id, "Step 0: Prologue");
            // Committing the bitmap per cycle takes no memory between cycles, and it reads as
            // clear without being zeroed.
            if let Err(e) = mark_bitmap.commit() {
                warn!(
                    "GC({}) Could not commit native memory for marking bitmap, GC failed: {}",
                    gc_id, e
                );
                return CollectionOutcome::BitmapCommitFailed;
            }
            self.retire_all_tlabs();
        }

        let marked = {
            let _timer = PhaseTimer::start(gc_id, "Step 1: Mark");
            MarkingClosure::<VM>::new(&*mark_bitmap, &self.space).mark()
        };

        // Mark words overwritten by forwarding pointers that have to be put back.
        let mut preserved_marks = PreservedMarks::new();

        let new_top = {
            let _timer = PhaseTimer::start(gc_id, "Step 2: Calculate new locations");
            // `top` stays put until the objects have moved: the walks below are bounded by it.
            gc_work::calculate_new_locations::<VM>(
                &*mark_bitmap,
                &self.space,
                &mut preserved_marks,
            )
        };
        let stat_preserved_marks = preserved_marks.len();

        {
            let _timer = PhaseTimer::start(gc_id, "Step 3: Adjust pointers");
            gc_work::adjust_pointers::<VM>(&*mark_bitmap, &self.space, &mut preserved_marks);
        }

        let moved = {
            let _timer = PhaseTimer::start(gc_id, "Step 4: Move objects");
            let moved = gc_work::move_objects::<VM>(&*mark_bitmap, &self.space);
            self.space.set_top(new_top);
            moved
        };

        {
            let _timer = PhaseTimer::start(gc_id, "Step 5: Epilogue");
            preserved_marks.restore::<VM>();

            if self.options.verify {
                self.verify(mark_bitmap, marked);
            }

            if let Err(e) = mark_bitmap.uncommit() {
                warn!("GC({}) Could not uncommit native memory for marking bitmap: {}", gc_id, e);
            }

            if self.options.uncommit {
                let virtual_space = &mut heap.virtual_space;
                let before = virtual_space.committed_size();
                match virtual_space.shrink_by(self.space.end() - new_top) {
                    Ok(()) => debug!(
                        "GC({}) Uncommitted {}",
                        gc_id,
                        bytes_to_formatted_string(before - virtual_space.committed_size())
                    ),
                    Err(e) => warn!("GC({}) Could not uncommit heap memory: {}", gc_id, e),
                }
                self.space.set_end(virtual_space.high());
            }
        }

        let stats = CollectionStats {
            gc_id,
            cause,
            reachable_roots: marked.roots,
            reachable_heap: marked.heap,
            moved,
            preserved_marks: stat_preserved_marks,
            used_before,
            used_after: self.space.used(),
            pause: start.elapsed(),
        };
        self.report(&stats);
        self.reporter.reset(stats.used_after);
        self.state.record_collection(stats.clone());
        CollectionOutcome::Completed(stats)
    }

    /// Re-mark the compacted heap from scratch and check it has the same shape as before the
    /// move. A mismatch means the heap is corrupt, so this panics.
    fn verify(&self, bitmap: &MarkBitmap, expected: MarkCounts) {
        bitmap.clear();
        let verified = MarkingClosure::<VM>::verifying(bitmap, &self.space).mark();
        assert_eq!(
            verified.roots, expected.roots,
            "Verification discovered {} roots out of {}",
            verified.roots, expected.roots
        );
        assert_eq!(
            verified.heap, expected.heap,
            "Verification discovered {} heap objects out of {}",
            verified.heap, expected.heap
        );
    }

    fn report(&self, stats: &CollectionStats) {
        let reachable = stats.reachable_roots + stats.reachable_heap;
        info!(
            "GC({}) GC Stats: {} ({:.2}%) reachable from roots, {} ({:.2}%) reachable from heap, \
             {} ({:.2}%) moved, {} ({:.2}%) markwords preserved",
            stats.gc_id,
            stats.reachable_roots,
            percent_of(stats.reachable_roots, reachable),
            stats.reachable_heap,
            percent_of(stats.reachable_heap, reachable),
            stats.moved,
            percent_of(stats.moved, reachable),
            stats.preserved_marks,
            percent_of(stats.preserved_marks, reachable)
        );
        info!(
            "GC({}) Pause Full ({}) {}->{} {:.3}ms",
            stats.gc_id,
            stats.cause,
            bytes_to_formatted_string(stats.used_before),
            bytes_to_formatted_string(stats.used_after),
            stats.pause.as_secs_f64() * 1000.0
        );
        print_heap_info(self.used(), self.capacity(), self.max_capacity);
    }

    /// Visit every object in the space. Retires all TLABs first, so the mutators must not be
    /// allocating.
    pub fn object_iterate<F: FnMut(ObjectReference)>(&self, f: F) {
        self.retire_all_tlabs();
        self.space.object_iterate::<VM, F>(f);
    }
}
