use super::mock_test_prelude::*;

use crate::util::{OpaquePointer, VMMutatorThread};
use std::thread;

const THREADS: usize = 8;
const OBJECTS_PER_THREAD: usize = 2000;

fn thread_tls(i: usize) -> VMMutatorThread {
    VMMutatorThread(VMThread(OpaquePointer::from_address(unsafe {
        Address::from_usize((i + 1) * 16)
    })))
}

/// Mutators on several threads allocate from their TLABs and from the shared space at once. No
/// two objects overlap, and the heap walk finds every object once.
#[test]
pub fn concurrent_allocation() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create_with_builder(|builder| {
                builder.options.max_heap_size = 16 * MB;
                builder.options.initial_heap_size = MB;
                builder.options.min_heap_expand = MB;
            });
            let mmtk = fixture.mmtk();

            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    thread::spawn(move || {
                        let mut mutator = memory_manager::bind_mutator(mmtk, thread_tls(t));
                        let mut objects = vec![];
                        for i in 0..OBJECTS_PER_THREAD {
                            let object = if i % 10 == 0 {
                                let addr = memory_manager::allocate_shared(
                                    mmtk,
                                    mutator.mutator_tls.0,
                                    object_size(0, 4),
                                )
                                .unwrap();
                                init_object(addr, 0, 4)
                            } else {
                                alloc_object(&mut mutator, 0, 1 + i % 7)
                            };
                            set_payload(object, 0, t * OBJECTS_PER_THREAD + i);
                            objects.push(object);
                        }
                        memory_manager::destroy_mutator(mutator);
                        objects
                    })
                })
                .collect();

            let mut all: Vec<ObjectReference> = handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect();
            assert_eq!(all.len(), THREADS * OBJECTS_PER_THREAD);
            all.sort();
            for pair in all.windows(2) {
                let end = memory_manager::address_of(pair[0])
                    + memory_manager::size_of::<MockVM>(pair[0]);
                assert!(end <= memory_manager::address_of(pair[1]));
            }

            let mut found = vec![];
            memory_manager::enumerate_objects(mmtk, |o| found.push(o));
            assert_eq!(found, all);

            let mut ids: Vec<usize> = all.iter().map(|o| get_payload(*o, 0)).collect();
            ids.sort();
            assert!(ids.into_iter().eq(0..THREADS * OBJECTS_PER_THREAD));
        },
        no_cleanup,
    )
}
