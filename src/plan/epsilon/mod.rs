//! A collector that allocates without ever collecting, unless configured to run a Lisp2 sliding
//! mark-compact cycle when asked to or when the heap is full.

pub(super) mod gc_work;
pub(super) mod global;

pub use self::global::CollectionOutcome;
pub use self::global::CollectionStats;
pub use self::global::Epsilon;
pub use self::global::GCCause;
