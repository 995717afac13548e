//! The collector: the allocation paths, the mutator context, and the sliding cycle.

mod epsilon;
pub(crate) mod gc_requester;
mod mutator;

pub use self::epsilon::CollectionOutcome;
pub use self::epsilon::CollectionStats;
pub use self::epsilon::Epsilon;
pub use self::epsilon::GCCause;
pub use self::mutator::Mutator;
