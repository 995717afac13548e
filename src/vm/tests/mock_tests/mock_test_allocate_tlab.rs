use super::mock_test_prelude::*;

use crate::util::constants::MIN_TLAB_SIZE;

/// TLABs refilled on the binding's request grow with the elasticity, stay within the bounds, and
/// come out of the heap. Each one replaces the mutator's TLAB.
#[test]
pub fn allocate_tlab() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_builder(|builder| {
                builder.options.max_tlab_size = 64 * KB;
                builder.options.tlab_elasticity = 2.0;
            });
            let mmtk = fixture.mmtk();

            let (first, first_size) =
                memory_manager::allocate_tlab(fixture.mutator(), 4 * KB, 32 * KB).unwrap();
            assert_eq!(first_size, 4 * KB);
            assert_eq!(memory_manager::used_bytes(mmtk), 4 * KB);
            assert_eq!(fixture.mutator.tlab_size(), first_size);

            let (second, second_size) =
                memory_manager::allocate_tlab(fixture.mutator(), 4 * KB, 32 * KB).unwrap();
            assert_eq!(second, first + first_size);
            assert_eq!(second_size, 8 * KB);
            assert_eq!(fixture.mutator.tlab_ergonomics().size, 8 * KB);

            // Growth stops at the maximum.
            let mut size = second_size;
            for _ in 0..8 {
                let (_, s) = memory_manager::allocate_tlab(fixture.mutator(), 4 * KB, MB).unwrap();
                assert!(s >= size && s <= 64 * KB);
                size = s;
            }
            assert_eq!(size, 64 * KB);

            // Larger than any TLAB.
            assert!(memory_manager::allocate_tlab(fixture.mutator(), 128 * KB, 128 * KB).is_none());

            // The retired TLABs are all dummy objects.
            let mut objects = 0;
            memory_manager::enumerate_objects(mmtk, |_| objects += 1);
            assert_eq!(objects, 0);
        },
        no_cleanup,
    )
}

/// A TLAB refilled on the binding's request is retired by the next cycle, so allocations after the
/// cycle never land on the objects slid into its old range.
#[test]
pub fn allocate_tlab_retired_by_collection() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_heapsize(MB);
            let mmtk = fixture.mmtk();
            alloc_object(fixture.mutator(), 0, 30);

            let (start, _) =
                memory_manager::allocate_tlab(fixture.mutator(), 4 * KB, 4 * KB).unwrap();
            let live = alloc_object(fixture.mutator(), 0, 2);
            assert_eq!(live.to_raw_address(), start);
            set_payload(live, 0, 7);
            let root = add_root(Some(live));

            let outcome = memory_manager::request_collection(
                mmtk,
                VMThread::UNINITIALIZED,
                GCCause::ExplicitGC,
            );
            assert!(outcome.is_completed());
            assert_eq!(fixture.mutator.tlab_size(), 0);
            let moved = get_root(root).unwrap();
            assert!(moved.to_raw_address() < start);
            assert_eq!(memory_manager::used_bytes(mmtk), object_size(0, 2));

            let next = alloc_object(fixture.mutator(), 0, 2);
            let shared = memory_manager::allocate_shared(mmtk, fixture.mutator_tls().0, 64).unwrap();
            let shared = init_object(shared, 0, 6);
            assert_eq!(object_size(0, 6), 64);
            assert_eq!(
                next.to_raw_address(),
                moved.to_raw_address() + object_size(0, 2)
            );
            assert!(shared.to_raw_address() >= next.to_raw_address() + object_size(0, 2));
            assert_eq!(get_payload(moved, 0), 7);

            let mut objects = vec![];
            memory_manager::enumerate_objects(mmtk, |o| objects.push(o));
            assert_eq!(objects, vec![moved, next, shared]);
        },
        no_cleanup,
    )
}

/// The mutator's own TLAB starts at the minimum size and grows as it is refilled.
#[test]
pub fn mutator_tlab_growth() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_builder(|_| {});
            assert_eq!(fixture.mutator.tlab_size(), 0);

            alloc_object(fixture.mutator(), 0, 2);
            assert_eq!(fixture.mutator.tlab_size(), MIN_TLAB_SIZE);

            let mut refills = 0;
            let mut last_size = MIN_TLAB_SIZE;
            for _ in 0..4000 {
                alloc_object(fixture.mutator(), 0, 6);
                let size = fixture.mutator.tlab_size();
                if size != last_size {
                    assert!(size > last_size, "TLAB shrank from {} to {}", last_size, size);
                    last_size = size;
                    refills += 1;
                }
            }
            assert!(refills > 1);
            assert!(last_size > MIN_TLAB_SIZE);
            assert_eq!(fixture.mutator.tlab_ergonomics().size, last_size);
        },
        no_cleanup,
    )
}

/// Without elasticity every refill asks for the desired size on top of the object.
#[test]
pub fn mutator_tlab_inelastic() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_builder(|builder| {
                builder.options.elastic_tlab = false;
            });
            alloc_object(fixture.mutator(), 0, 2);
            assert_eq!(
                fixture.mutator.tlab_size(),
                object_size(0, 2) + crate::util::constants::TLAB_DESIRED_SIZE
            );
            assert_eq!(fixture.mutator.tlab_ergonomics().size, 0);
        },
        no_cleanup,
    )
}
