// All the tests with prefix 'mock_test_' use MockVM.
// Each test builds its own MMTk instance inside `with_mockvm`, which also serializes the tests,
// as they share the mock VM state (roots and recorded hook calls).

// Common includes for mock tests.
pub(crate) mod mock_test_prelude {
    pub use crate::memory_manager;
    pub use crate::plan::{CollectionOutcome, GCCause};
    pub use crate::util::test_util::fixtures::*;
    pub use crate::util::test_util::mock_method::*;
    pub use crate::util::test_util::mock_vm::*;
    pub use crate::util::{Address, ObjectReference, VMThread};
    pub use crate::vm::*;

    pub const KB: usize = 1024;
    pub const MB: usize = 1024 * KB;
}

mod mock_test_allocate_no_gc;
mod mock_test_allocate_tlab;
mod mock_test_concurrent_allocation;
mod mock_test_gc_causes;
mod mock_test_heap_inspection;
mod mock_test_pinned_objects;
mod mock_test_preserved_marks;
mod mock_test_sliding_gc_chain;
mod mock_test_sliding_gc_idempotent;
mod mock_test_tlab_parsability;
mod mock_test_uncommit;
