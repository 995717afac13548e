use super::mock_test_prelude::*;

use crate::util::alloc::AllocationError;

/// While a thread is in a pinned region, collection requests are refused and nothing moves.
#[test]
pub fn pinned_objects() {
    with_mockvm(
        || MockVM {
            out_of_memory: MockMethod::new_default(),
            ..MockVM::default()
        },
        || {
            let mut fixture = MutatorFixture::create_with_heapsize(MB);
            let mmtk = fixture.mmtk();
            let tls = fixture.mutator_tls().0;

            alloc_object(fixture.mutator(), 0, 30);
            let object = alloc_object(fixture.mutator(), 0, 2);
            set_payload(object, 1, 42);
            let root = add_root(Some(object));
            let address = memory_manager::address_of(object);

            memory_manager::pin_object(mmtk, tls, object);
            // Nested regions of the same thread count once.
            memory_manager::pin_object(mmtk, tls, object);
            assert!(memory_manager::is_pinning_active(mmtk));

            let outcome = memory_manager::request_collection(mmtk, tls, GCCause::ExplicitGC);
            assert_eq!(outcome, CollectionOutcome::SkippedPinned);
            assert_eq!(memory_manager::collection_count(mmtk), 0);
            assert_eq!(get_root(root), Some(object));
            assert_eq!(memory_manager::address_of(object), address);
            assert_eq!(get_payload(object, 1), 42);
            read_mockvm(|mock| {
                assert!(!mock.stop_all_mutators.is_called());
                assert!(mock.root_scans.is_empty());
            });

            // An allocation that needs a collection fails instead of waiting for the pin.
            let mut failed = false;
            for _ in 0..MB / KB {
                if try_alloc_object(fixture.mutator(), 0, 126).is_none() {
                    failed = true;
                    break;
                }
            }
            assert!(failed);
            read_mockvm(|mock| {
                assert_eq!(
                    mock.out_of_memory.last_call().map(|(_, err)| *err),
                    Some(AllocationError::HeapOutOfMemory)
                );
            });
            assert_eq!(memory_manager::address_of(object), address);

            memory_manager::unpin_object(mmtk, tls, object);
            assert!(memory_manager::is_pinning_active(mmtk));
            memory_manager::unpin_object(mmtk, tls, object);
            assert!(!memory_manager::is_pinning_active(mmtk));

            let outcome = memory_manager::request_collection(mmtk, tls, GCCause::ExplicitGC);
            let CollectionOutcome::Completed(stats) = outcome else {
                panic!("Unexpected outcome {:?}", outcome);
            };
            assert_eq!(stats.reachable_roots, 1);
            assert_eq!(stats.moved, 1);
            let moved = get_root(root).unwrap();
            assert!(memory_manager::address_of(moved) < address);
            assert_eq!(get_payload(moved, 1), 42);
        },
        no_cleanup,
    )
}
