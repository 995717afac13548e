//! A minimal collector in the style of MMTk: one contiguous heap, bump-pointer allocation with
//! elastic thread-local allocation buffers, and an optional single-threaded Lisp2 sliding
//! mark-compact cycle.
//!
//! Without sliding, the heap only grows until its maximum size and allocations then fail. With
//! sliding, a collection request stops the world, marks everything reachable from the roots with
//! a side bitmap, slides the live objects down to the bottom of the heap in address order, and
//! resumes. Allocation failures can trigger the cycle implicitly.
//!
//! A runtime uses the collector by implementing [`vm::VMBinding`] and calling the functions in
//! [`memory_manager`]:
//!
//! * [`memory_manager::mmtk_init`] builds the heap from an [`MMTKBuilder`];
//! * [`memory_manager::bind_mutator`] creates the per-thread allocation context;
//! * [`memory_manager::alloc`] allocates;
//! * [`memory_manager::request_collection`] asks for a cycle;
//! * [`memory_manager::pin_object`] holds the heap in place while raw addresses escape.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate static_assertions;

mod global_state;

mod mmtk;
pub use mmtk::MMTKBuilder;
pub use mmtk::MMTK;

pub mod memory_manager;
pub mod plan;
pub mod policy;
pub mod util;
pub mod vm;

pub use crate::plan::{CollectionOutcome, CollectionStats, Epsilon, GCCause, Mutator};
