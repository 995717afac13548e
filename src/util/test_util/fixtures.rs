// Some helpers are only used by a few tests. We simply allow dead code in this module.
#![allow(dead_code)]

use crate::memory_manager;
use crate::plan::Mutator;
use crate::util::constants::BYTES_IN_MBYTE;
use crate::util::test_util::mock_vm::MockVM;
use crate::util::{VMMutatorThread, VMThread};
use crate::MMTKBuilder;
use crate::MMTK;

/// An MMTk instance that lives until the fixture is dropped. Mutators hold a `'static`
/// reference to it, so they must be dropped first.
pub struct MMTKFixture {
    pub mmtk: &'static MMTK<MockVM>,
}

impl MMTKFixture {
    pub fn create_with_builder<F>(with_builder: F) -> Self
    where
        F: FnOnce(&mut MMTKBuilder),
    {
        let mut builder = MMTKBuilder::new_no_env_vars();
        with_builder(&mut builder);

        let mmtk = memory_manager::mmtk_init(&builder);
        let mmtk_ptr = Box::into_raw(mmtk);
        let mmtk_static: &'static MMTK<MockVM> = unsafe { &*mmtk_ptr };

        MMTKFixture { mmtk: mmtk_static }
    }
}

impl Drop for MMTKFixture {
    fn drop(&mut self) {
        let mmtk_ptr: *const MMTK<MockVM> = self.mmtk as _;
        let _ = unsafe { Box::from_raw(mmtk_ptr as *mut MMTK<MockVM>) };
    }
}

pub fn mutator_tls() -> VMMutatorThread {
    VMMutatorThread(VMThread::UNINITIALIZED)
}

/// A heap with one mutator. The mutator is declared first so it is dropped before the heap.
pub struct MutatorFixture {
    pub mutator: Box<Mutator<MockVM>>,
    mmtk: MMTKFixture,
}

impl MutatorFixture {
    /// A heap of `size` bytes, committed upfront, with sliding collections enabled.
    pub fn create_with_heapsize(size: usize) -> Self {
        Self::create_with_builder(|builder| {
            builder.options.max_heap_size = size;
            builder.options.initial_heap_size = size;
            builder.options.sliding_gc = true;
        })
    }

    pub fn create_with_builder<F>(with_builder: F) -> Self
    where
        F: FnOnce(&mut MMTKBuilder),
    {
        let mmtk = MMTKFixture::create_with_builder(|builder| {
            builder.options.max_heap_size = 4 * BYTES_IN_MBYTE;
            builder.options.min_heap_expand = BYTES_IN_MBYTE;
            with_builder(builder)
        });
        let mutator = memory_manager::bind_mutator(mmtk.mmtk, mutator_tls());
        Self { mutator, mmtk }
    }

    pub fn mmtk(&self) -> &'static MMTK<MockVM> {
        self.mmtk.mmtk
    }

    pub fn mutator(&mut self) -> &mut Mutator<MockVM> {
        &mut self.mutator
    }

    pub fn mutator_tls(&self) -> VMMutatorThread {
        self.mutator.mutator_tls
    }

    /// Bind another mutator to the same heap.
    pub fn bind_mutator(&self, tls: VMMutatorThread) -> Box<Mutator<MockVM>> {
        memory_manager::bind_mutator(self.mmtk.mmtk, tls)
    }
}
