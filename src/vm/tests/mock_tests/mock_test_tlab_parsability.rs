use super::mock_test_prelude::*;

use rand::{Rng, SeedableRng};

/// Objects from TLABs and from the shared space interleave, and the unused tails of retired TLABs
/// are dummy objects. A linear walk of the heap finds exactly the objects that were allocated.
#[test]
pub fn tlab_parsability() {
    with_mockvm(
        default_setup,
        || {
            let mut fixture = MutatorFixture::create_with_builder(|builder| {
                builder.options.max_tlab_size = 8 * KB;
            });
            let mut rng = rand::rngs::StdRng::seed_from_u64(0xda7a);

            let mut allocated = vec![];
            for i in 0..2000 {
                // Some objects are too large for any TLAB, and some too large for the rest of
                // the current one.
                let payload = match rng.random_range(0..100) {
                    0..=1 => 2048,
                    2..=9 => rng.random_range(100..400),
                    _ => rng.random_range(1..16),
                };
                let object = alloc_object(fixture.mutator(), 0, payload);
                set_payload(object, 0, i);
                allocated.push(object);
                if i == 1000 {
                    memory_manager::flush_mutator(fixture.mutator());
                }
            }

            let mut found = vec![];
            memory_manager::enumerate_objects(fixture.mmtk(), |o| found.push(o));
            assert!(found.windows(2).all(|w| w[0] < w[1]));

            let mut expected = allocated.clone();
            expected.sort();
            assert_eq!(found, expected);
            for (i, object) in allocated.into_iter().enumerate() {
                assert_eq!(get_payload(object, 0), i);
            }
        },
        no_cleanup,
    )
}
