use criterion::Criterion;

pub mod alloc;
pub mod sliding_gc;

pub fn bench(c: &mut Criterion) {
    // If MMTK_BENCH is set, run that single benchmark.
    match std::env::var("MMTK_BENCH").as_deref() {
        Ok("alloc") => alloc::bench(c),
        Ok("sliding_gc") => sliding_gc::bench(c),
        Ok(other) => panic!("Unknown benchmark {:?}", other),
        Err(_) => {
            alloc::bench(c);
            sliding_gc::bench(c);
        }
    }
}
