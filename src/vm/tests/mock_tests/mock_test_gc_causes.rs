use super::mock_test_prelude::*;

use std::str::FromStr;

/// Metadata requests are handed back to the runtime whether or not sliding is enabled. The other
/// causes collect or are ignored depending on `sliding_gc`.
#[test]
pub fn gc_causes_with_sliding() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create_with_heapsize(MB);
            let mmtk = fixture.mmtk();
            let tls = fixture.mutator_tls().0;

            for cause in [GCCause::MetadataGCThreshold, GCCause::MetadataGCClearSoftRefs] {
                let outcome = memory_manager::request_collection(mmtk, tls, cause);
                assert_eq!(outcome, CollectionOutcome::MetadataResized);
            }
            assert_eq!(memory_manager::collection_count(mmtk), 0);
            read_mockvm(|mock| {
                assert_eq!(mock.resize_metadata.call_count(), 2);
                assert!(!mock.stop_all_mutators.is_called());
                assert_eq!(mock.update_counters.call_count(), 2);
            });

            memory_manager::handle_user_collection_request(mmtk, fixture.mutator_tls());
            let outcome = memory_manager::request_collection(mmtk, tls, GCCause::AllocationFailure);
            assert!(outcome.is_completed());
            assert_eq!(memory_manager::collection_count(mmtk), 2);
            let stats = memory_manager::last_collection_stats(mmtk).unwrap();
            assert_eq!(stats.cause, GCCause::AllocationFailure);
        },
        no_cleanup,
    )
}

#[test]
pub fn gc_causes_without_sliding() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create_with_builder(|_| {});
            let mmtk = fixture.mmtk();
            let tls = fixture.mutator_tls().0;

            assert_eq!(
                memory_manager::request_collection(mmtk, tls, GCCause::MetadataGCThreshold),
                CollectionOutcome::MetadataResized
            );
            for cause in [GCCause::ExplicitGC, GCCause::AllocationFailure] {
                assert_eq!(
                    memory_manager::request_collection(mmtk, tls, cause),
                    CollectionOutcome::Ignored
                );
            }
            read_mockvm(|mock| {
                assert_eq!(mock.resize_metadata.call_count(), 1);
                assert!(!mock.stop_all_mutators.is_called());
                assert_eq!(mock.update_counters.call_count(), 3);
            });
        },
        no_cleanup,
    )
}

#[test]
pub fn gc_cause_names() {
    assert_eq!(GCCause::ExplicitGC.to_string(), "System.gc()");
    assert_eq!(GCCause::AllocationFailure.to_string(), "Allocation Failure");
    assert_eq!(
        GCCause::MetadataGCClearSoftRefs.to_string(),
        "Metadata GC Clear Soft References"
    );
    assert_eq!(
        GCCause::from_str("metadata_gc_threshold"),
        Ok(GCCause::MetadataGCThreshold)
    );
    assert!(GCCause::from_str("concurrent").is_err());
}
