use super::mock_test_prelude::*;

/// Objects with an identity hash in their mark word keep it across a move. Only moving objects
/// need their mark word saved: the ones already in place keep theirs untouched.
#[test]
pub fn preserved_marks() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_heapsize(4 * MB);
            let tls = fixture.mutator_tls().0;

            let in_place = alloc_object(fixture.mutator(), 0, 1);
            set_hash(in_place, 0x1234);
            alloc_object(fixture.mutator(), 0, 8);
            let hashed = alloc_object(fixture.mutator(), 1, 1);
            set_hash(hashed, 0xbeef);
            let plain = alloc_object(fixture.mutator(), 0, 1);
            alloc_object(fixture.mutator(), 3, 0);
            let hashed_too = alloc_object(fixture.mutator(), 0, 1);
            set_hash(hashed_too, 7);
            set_field(hashed, 0, Some(hashed_too));

            let roots: Vec<usize> = [in_place, hashed, plain]
                .into_iter()
                .map(|o| add_root(Some(o)))
                .collect();

            let outcome = memory_manager::request_collection(fixture.mmtk(), tls, GCCause::ExplicitGC);
            let CollectionOutcome::Completed(stats) = outcome else {
                panic!("Unexpected outcome {:?}", outcome);
            };
            assert_eq!(stats.reachable_roots, 3);
            assert_eq!(stats.reachable_heap, 4);
            assert_eq!(stats.moved, 3);
            assert_eq!(stats.preserved_marks, 2);

            assert_eq!(get_root(roots[0]), Some(in_place));
            assert_eq!(get_hash(in_place), Some(0x1234));

            let hashed = get_root(roots[1]).unwrap();
            assert_eq!(get_hash(hashed), Some(0xbeef));
            let plain = get_root(roots[2]).unwrap();
            assert_eq!(get_hash(plain), None);
            let hashed_too = get_field(hashed, 0).unwrap();
            assert_eq!(get_hash(hashed_too), Some(7));
            assert!(hashed < plain && plain < hashed_too);
        },
        no_cleanup,
    )
}
