use crate::util::Address;
use libc::c_void;

/// A pointer the runtime hands to us and gets back through the binding traits. We store and
/// compare it, but never dereference it.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct OpaquePointer(*mut c_void);

// Never dereferenced on our side.
unsafe impl Sync for OpaquePointer {}
unsafe impl Send for OpaquePointer {}

impl Default for OpaquePointer {
    fn default() -> Self {
        Self::UNINITIALIZED
    }
}

impl OpaquePointer {
    /// The null opaque pointer.
    pub const UNINITIALIZED: Self = Self(std::ptr::null_mut());

    /// Cast an [`Address`] to an opaque pointer.
    pub fn from_address(addr: Address) -> Self {
        OpaquePointer(addr.to_mut_ptr::<c_void>())
    }

    /// Cast back to an [`Address`].
    pub fn to_address(self) -> Address {
        Address::from_mut_ptr(self.0)
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// Identifies a runtime thread. A binding may use thread pointers or thread ids; we only require
/// that distinct live threads compare unequal. Pin nesting is tracked per `VMThread`.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VMThread(pub OpaquePointer);

impl VMThread {
    pub const UNINITIALIZED: Self = Self(OpaquePointer::UNINITIALIZED);
}

/// A [`VMThread`] that owns a [`crate::plan::Mutator`], i.e. a thread that allocates.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VMMutatorThread(pub VMThread);
