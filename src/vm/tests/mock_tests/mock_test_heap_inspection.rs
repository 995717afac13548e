use super::mock_test_prelude::*;

use crate::util::heap::inspection::{DEEP_SIZE_OF_SHALLOW, DEEP_SIZE_OF_TRAVERSE};

#[test]
pub fn heap_inspection() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_builder(|_| {});

            let r = alloc_object(fixture.mutator(), 3, 0);
            let a = alloc_object(fixture.mutator(), 2, 1);
            let b = alloc_object(fixture.mutator(), 1, 5);
            let c = alloc_object(fixture.mutator(), 0, 2);
            set_field(r, 0, Some(a));
            set_field(r, 2, Some(b));
            set_field(a, 0, Some(c));
            set_field(b, 0, Some(c));

            let size = memory_manager::size_of::<MockVM>;
            assert_eq!(size(r), object_size(3, 0));
            assert_eq!(size(b), object_size(1, 5));
            assert_eq!(memory_manager::address_of(r).as_usize(), r.value());

            assert_eq!(memory_manager::referenced_objects::<MockVM>(r), vec![a, b]);
            assert_eq!(memory_manager::referenced_objects::<MockVM>(a), vec![c]);
            assert!(memory_manager::referenced_objects::<MockVM>(c).is_empty());

            // The shared leaf is counted once.
            assert_eq!(
                memory_manager::deep_size_of::<MockVM>(r),
                size(r) + size(a) + size(b) + size(c)
            );
            assert_eq!(memory_manager::deep_size_of::<MockVM>(a), size(a) + size(c));

            let both = DEEP_SIZE_OF_SHALLOW | DEEP_SIZE_OF_TRAVERSE;
            // Not traversing `a` still reaches the leaf through `b`.
            let deep = memory_manager::deep_size_of_with::<MockVM>(r, |o| {
                if o == a {
                    DEEP_SIZE_OF_SHALLOW
                } else {
                    both
                }
            });
            assert_eq!(deep, size(r) + size(a) + size(b) + size(c));

            // Excluding `b` cuts the second path too.
            let deep = memory_manager::deep_size_of_with::<MockVM>(r, |o| {
                if o == a {
                    DEEP_SIZE_OF_SHALLOW
                } else if o == b {
                    0
                } else {
                    both
                }
            });
            assert_eq!(deep, size(r) + size(a));

            // A negative value replaces the size of the object.
            let deep = memory_manager::deep_size_of_with::<MockVM>(r, |o| if o == c { -100 } else { both });
            assert_eq!(deep, size(r) + size(a) + size(b) + 100);

            // Traversing without counting the root.
            let mut seen = vec![];
            let deep = memory_manager::deep_size_of_with::<MockVM>(r, |o| {
                seen.push(o);
                if o == r {
                    DEEP_SIZE_OF_TRAVERSE
                } else {
                    both
                }
            });
            assert_eq!(deep, size(a) + size(b) + size(c));
            assert_eq!(seen.len(), 4);
        },
        no_cleanup,
    )
}
