//! Slots: locations that may hold a reference to an object.

use std::fmt::Debug;
use std::hash::Hash;

use atomic::Atomic;

use crate::util::{Address, ObjectReference};

/// A `Slot` points to a location that may hold an object reference: a field of an object, a
/// local variable on a thread stack, a global handle. The collector reads the reference through
/// [`Slot::load`] while marking, and writes the relocated reference back through
/// [`Slot::store`] when adjusting pointers.
///
/// A VM whose slots are plain words holding the object address (0 for null) can use
/// [`SimpleSlot`]. VMs with compressed or tagged references implement their own slot type, which
/// decodes on `load` and re-encodes on `store`.
pub trait Slot: Copy + Send + Debug + PartialEq + Eq + Hash {
    /// Load the object reference in the slot, or `None` if the slot does not hold one (null, or a
    /// non-reference value).
    fn load(&self) -> Option<ObjectReference>;

    /// Store `object` into the slot. Tag bits, if the VM has any, must be preserved.
    fn store(&self, object: ObjectReference);
}

/// A word-sized slot that holds the raw address of an object, or 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SimpleSlot {
    slot_addr: *mut Atomic<Address>,
}

impl SimpleSlot {
    /// Create a simple slot from the address of the word that holds the reference.
    pub fn from_address(address: Address) -> Self {
        Self {
            slot_addr: address.to_mut_ptr(),
        }
    }

    /// The address of the word that holds the reference.
    pub fn as_address(&self) -> Address {
        Address::from_mut_ptr(self.slot_addr)
    }
}

unsafe impl Send for SimpleSlot {}

impl Slot for SimpleSlot {
    fn load(&self) -> Option<ObjectReference> {
        let addr = unsafe { (*self.slot_addr).load(atomic::Ordering::Relaxed) };
        ObjectReference::from_raw_address(addr)
    }

    fn store(&self, object: ObjectReference) {
        unsafe { (*self.slot_addr).store(object.to_raw_address(), atomic::Ordering::Relaxed) }
    }
}
