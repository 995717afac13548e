use super::mock_test_prelude::*;

use crate::util::conversions::raw_align_up;
use crate::util::memory;

/// With uncommit on, a cycle gives back the pages above the new top, and the heap grows again on
/// demand.
#[test]
pub fn uncommit() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_builder(|builder| {
                builder.options.max_heap_size = 4 * MB;
                builder.options.initial_heap_size = 4 * MB;
                builder.options.min_heap_expand = MB;
                builder.options.sliding_gc = true;
                builder.options.uncommit = true;
            });
            let mmtk = fixture.mmtk();
            let page = memory::page_size();

            let mut kept = vec![];
            for i in 0..3 * MB / KB {
                let object = alloc_object(fixture.mutator(), 0, 126);
                if i % 100 == 0 {
                    kept.push(add_root(Some(object)));
                }
            }
            assert_eq!(memory_manager::committed_bytes(mmtk), 4 * MB);

            let outcome =
                memory_manager::request_collection(mmtk, fixture.mutator_tls().0, GCCause::ExplicitGC);
            let CollectionOutcome::Completed(stats) = outcome else {
                panic!("Unexpected outcome {:?}", outcome);
            };
            assert_eq!(stats.used_after, kept.len() * KB);
            assert_eq!(
                memory_manager::committed_bytes(mmtk),
                raw_align_up(stats.used_after, page)
            );
            read_mockvm(|mock| {
                assert_eq!(
                    mock.update_counters.last_call().copied(),
                    Some((stats.used_after, raw_align_up(stats.used_after, page), 4 * MB))
                );
            });

            // Grow again.
            for _ in 0..MB / KB {
                alloc_object(fixture.mutator(), 0, 126);
            }
            assert!(memory_manager::committed_bytes(mmtk) > MB);
            assert!(memory_manager::committed_bytes(mmtk) <= 4 * MB);
            for root in kept {
                assert!(memory_manager::is_in_heap(mmtk, get_root(root).unwrap()));
            }
        },
        no_cleanup,
    )
}
