use criterion::Criterion;

use mmtk_epsilon::memory_manager;
use mmtk_epsilon::util::test_util::fixtures::*;
use mmtk_epsilon::util::test_util::mock_vm::*;
use mmtk_epsilon::GCCause;

const LIVE_OBJECTS: usize = 10_000;

pub fn bench(c: &mut Criterion) {
    write_mockvm(|mock| *mock = MockVM::default());
    let mut fixture = MutatorFixture::create_with_builder(|builder| {
        builder.options.max_heap_size = 64 << 20;
        builder.options.sliding_gc = true;
        builder.options.implicit_gc = false;
    });

    // A list with a dead object after every node. After the first cycle the list is compacted
    // and the following cycles measure marking and walking a dense heap.
    let mut head = None;
    for _ in 0..LIVE_OBJECTS {
        let node = alloc_object(fixture.mutator(), 1, 2);
        set_field(node, 0, head);
        head = Some(node);
        alloc_object(fixture.mutator(), 0, 6);
    }
    add_root(head);

    c.bench_function("sliding_gc", |b| {
        b.iter(|| {
            let outcome = memory_manager::request_collection(
                fixture.mmtk(),
                fixture.mutator_tls().0,
                GCCause::ExplicitGC,
            );
            assert!(outcome.is_completed());
        })
    });
}
