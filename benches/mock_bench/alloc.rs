use criterion::Criterion;

use mmtk_epsilon::memory_manager;
use mmtk_epsilon::util::test_util::fixtures::*;
use mmtk_epsilon::util::test_util::mock_vm::*;

pub fn bench(c: &mut Criterion) {
    write_mockvm(|mock| *mock = MockVM::default());
    // Nothing is rooted, so implicit cycles keep recycling the heap.
    let mut fixture = MutatorFixture::create_with_builder(|builder| {
        builder.options.max_heap_size = 64 << 20;
        builder.options.sliding_gc = true;
    });

    c.bench_function("alloc", |b| {
        b.iter(|| {
            let _addr = memory_manager::alloc(fixture.mutator(), 32);
        })
    });
    c.bench_function("alloc_shared", |b| {
        b.iter(|| {
            let _addr =
                memory_manager::allocate_shared(fixture.mmtk(), fixture.mutator_tls().0, 32);
        })
    });
}
