use super::mock_test_prelude::*;

/// A cycle right after a cycle finds a compacted heap. Nothing moves and nothing is reclaimed.
#[test]
pub fn sliding_gc_idempotent() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_heapsize(4 * MB);
            let tls = fixture.mutator_tls().0;

            let mut live = vec![];
            for i in 0..64 {
                let object = alloc_object(fixture.mutator(), 1, i % 5);
                if i % 3 == 0 {
                    live.push(add_root(Some(object)));
                }
            }

            let first = memory_manager::request_collection(fixture.mmtk(), tls, GCCause::ExplicitGC);
            let CollectionOutcome::Completed(first) = first else {
                panic!("Unexpected outcome {:?}", first);
            };
            assert_eq!(first.reachable_roots, live.len());
            let addresses: Vec<_> = live.iter().map(|r| get_root(*r)).collect();

            let second = memory_manager::request_collection(fixture.mmtk(), tls, GCCause::ExplicitGC);
            let CollectionOutcome::Completed(second) = second else {
                panic!("Unexpected outcome {:?}", second);
            };
            assert_eq!(second.gc_id, first.gc_id + 1);
            assert_eq!(second.reachable_roots, first.reachable_roots);
            assert_eq!(second.reachable_heap, first.reachable_heap);
            assert_eq!(second.moved, 0);
            assert_eq!(second.used_before, first.used_after);
            assert_eq!(second.used_after, first.used_after);
            assert_eq!(second.reclaimed(), 0);

            let after: Vec<_> = live.iter().map(|r| get_root(*r)).collect();
            assert_eq!(addresses, after);
        },
        no_cleanup,
    )
}
