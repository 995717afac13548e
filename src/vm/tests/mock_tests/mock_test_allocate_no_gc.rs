use super::mock_test_prelude::*;

use crate::util::alloc::AllocationError;

/// With sliding disabled, the heap only grows. Allocating past the maximum heap size reports an
/// out-of-memory error and returns zero, and never stops the mutators.
#[test]
pub fn allocate_no_gc() {
    with_mockvm(
        || MockVM {
            out_of_memory: MockMethod::new_default(),
            ..MockVM::default()
        },
        || {
            let mut fixture = MutatorFixture::create_with_builder(|builder| {
                builder.options.max_heap_size = MB;
                builder.options.initial_heap_size = 64 * KB;
                builder.options.min_heap_expand = 64 * KB;
            });
            assert_eq!(memory_manager::total_bytes(fixture.mmtk()), MB);
            assert_eq!(memory_manager::committed_bytes(fixture.mmtk()), 64 * KB);

            // Each object takes 1KB, so the heap is full after 1024 objects at most.
            assert_eq!(object_size(0, 126), KB);
            let mut last_result = Address::MAX;
            for _ in 0..1100 {
                last_result = memory_manager::alloc(fixture.mutator(), KB);
                if last_result.is_zero() {
                    break;
                }
            }
            assert!(last_result.is_zero());

            let mmtk = fixture.mmtk();
            assert_eq!(memory_manager::committed_bytes(mmtk), MB);
            assert!(memory_manager::used_bytes(mmtk) <= MB);
            assert!(memory_manager::used_bytes(mmtk) > MB - 4 * KB);
            read_mockvm(|mock| {
                assert_eq!(mock.out_of_memory.call_count(), 1);
                assert_eq!(
                    mock.out_of_memory.last_call().map(|(_, err)| *err),
                    Some(AllocationError::HeapOutOfMemory)
                );
                assert!(!mock.stop_all_mutators.is_called());
                assert!(mock.update_counters.is_called());
            });

            // Explicit requests are ignored too.
            let outcome =
                memory_manager::request_collection(mmtk, VMThread::UNINITIALIZED, GCCause::ExplicitGC);
            assert_eq!(outcome, CollectionOutcome::Ignored);
            assert_eq!(memory_manager::collection_count(mmtk), 0);
            assert!(memory_manager::last_collection_stats(mmtk).is_none());
        },
        no_cleanup,
    )
}

/// A request for exactly the bytes the heap has left commits the rest of the reservation.
#[test]
pub fn allocate_exactly_the_rest() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create_with_builder(|builder| {
                builder.options.max_heap_size = MB;
                builder.options.initial_heap_size = 64 * KB;
                // Larger than the reservation, so growing in bulk is never possible.
                builder.options.min_heap_expand = 4 * MB;
            });
            let mmtk = fixture.mmtk();
            let tls = fixture.mutator_tls().0;

            // The whole heap in one request, while most of it is still uncommitted.
            let all = memory_manager::allocate_shared(mmtk, tls, MB);
            assert!(all.is_some());
            assert_eq!(memory_manager::used_bytes(mmtk), MB);
            assert_eq!(memory_manager::committed_bytes(mmtk), MB);

            assert!(memory_manager::allocate_shared(mmtk, tls, 16).is_none());
        },
        no_cleanup,
    )
}
