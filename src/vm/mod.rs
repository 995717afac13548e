//! The binding interface. A runtime that wants to use this collector implements [`VMBinding`]
//! and the traits it names. The collector calls into the runtime only through these traits.
//!
//! * [`ObjectModel`]: object sizes, the mark word, copying, dummy objects.
//! * [`Scanning`]: reference fields of an object, and the root set.
//! * [`Collection`]: stopping and resuming mutators, out-of-memory reporting, and the hooks the
//!   collector calls for work outside its own scope (metadata resizing, monitoring counters).

mod collection;
mod object_model;
mod scanning;
pub mod slot;

pub use self::collection::Collection;
pub use self::object_model::ObjectModel;
pub use self::scanning::Scanning;
pub use self::scanning::SlotVisitor;
pub use self::slot::SimpleSlot;
pub use self::slot::Slot;

/// Default min alignment 8 bytes
const DEFAULT_LOG_MIN_ALIGNMENT: usize = crate::util::constants::LOG_BYTES_IN_WORD as usize;

/// The `VMBinding` trait associates with each trait, and provides VM-specific constants.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync + Default,
{
    type VMObjectModel: ObjectModel<Self>;
    type VMScanning: Scanning<Self>;
    type VMCollection: Collection<Self>;

    /// The type of slots (reference fields and root locations) in this VM.
    type VMSlot: slot::Slot;

    /// Allocation granularity. Every object starts at a multiple of it and every object size is
    /// rounded up to it. The mark bitmap keeps one bit per `MIN_ALIGNMENT` bytes of heap, so a
    /// larger value makes the bitmap smaller. It must be a power of two, at least a word, and no
    /// smaller than the smallest dummy object the binding can write.
    const MIN_ALIGNMENT: usize = 1 << DEFAULT_LOG_MIN_ALIGNMENT;
}

#[cfg(test)]
mod tests;
