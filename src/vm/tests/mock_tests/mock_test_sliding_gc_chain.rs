use super::mock_test_prelude::*;

const CHAIN_LENGTH: usize = 100;

/// A linked list interleaved with garbage. The cycle slides the list down to the bottom of the
/// heap, keeps its order and contents, and updates the root.
#[test]
pub fn sliding_gc_chain() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_heapsize(4 * MB);
            let bottom = fixture.mmtk().get_plan().space().bottom();

            let mut head: Option<ObjectReference> = None;
            for i in 0..CHAIN_LENGTH {
                // Garbage first, so that every list node has to move.
                alloc_object(fixture.mutator(), 2, 3);
                let node = alloc_object(fixture.mutator(), 1, 1);
                set_field(node, 0, head);
                set_payload(node, 0, i);
                head = Some(node);
            }
            let root = add_root(head);
            let used_before = memory_manager::used_bytes(fixture.mmtk());

            let outcome = memory_manager::request_collection(
                fixture.mmtk(),
                fixture.mutator_tls().0,
                GCCause::ExplicitGC,
            );
            let CollectionOutcome::Completed(stats) = outcome else {
                panic!("Unexpected outcome {:?}", outcome);
            };

            let node_size = object_size(1, 1);
            assert_eq!(stats.gc_id, 1);
            assert_eq!(stats.cause, GCCause::ExplicitGC);
            assert_eq!(stats.reachable_roots, 1);
            assert_eq!(stats.reachable_heap, CHAIN_LENGTH);
            assert_eq!(stats.moved, CHAIN_LENGTH);
            assert_eq!(stats.preserved_marks, 0);
            assert_eq!(stats.used_before, used_before);
            assert_eq!(stats.used_after, CHAIN_LENGTH * node_size);
            assert_eq!(
                memory_manager::used_bytes(fixture.mmtk()),
                CHAIN_LENGTH * node_size
            );
            assert_eq!(
                memory_manager::last_collection_stats(fixture.mmtk()),
                Some(stats)
            );
            assert_eq!(memory_manager::collection_count(fixture.mmtk()), 1);

            // Nodes keep their address order: the last allocated node, the head, is now on top.
            let mut node = get_root(root);
            let mut expected = CHAIN_LENGTH;
            while let Some(n) = node {
                expected -= 1;
                assert_eq!(get_payload(n, 0), expected);
                assert_eq!(
                    memory_manager::address_of(n),
                    bottom + expected * node_size
                );
                assert_eq!(MockVM::load_mark_word(n), PROTOTYPE);
                assert!(memory_manager::is_in_heap(fixture.mmtk(), n));
                node = get_field(n, 0);
            }
            assert_eq!(expected, 0);

            read_mockvm(|mock| {
                assert_eq!(mock.stop_all_mutators.call_count(), 1);
                assert_eq!(mock.resume_mutators.call_count(), 1);
                assert_eq!(mock.root_scans, vec![false, true]);
                // Once from the periodic reports at most, and once after the cycle.
                let last = mock.update_counters.last_call().copied();
                assert_eq!(
                    last,
                    Some((CHAIN_LENGTH * node_size, 4 * MB, 4 * MB))
                );
            });

            // The space above the list can be allocated again.
            let next = alloc_object(fixture.mutator(), 0, 0);
            assert!(memory_manager::address_of(next) >= bottom + CHAIN_LENGTH * node_size);
        },
        no_cleanup,
    )
}
