//! Forwarding through the mark word.
//!
//! While a sliding cycle computes new locations, the mark word of every object that will move is
//! replaced by its new address with the two low bits set to [`FORWARDED`]. New addresses are
//! aligned to at least a word, so the tag never clobbers address bits. Mark words that carry state
//! are saved in [`PreservedMarks`] first and written back after the objects have moved.

use crate::util::{Address, ObjectReference};
use crate::vm::ObjectModel;
use crate::vm::VMBinding;

/// Low bits of a forwarded mark word.
pub const FORWARDED: usize = 0b11;
const FORWARDING_MASK: usize = 0b11;

/// Is this mark word a forwarding pointer?
pub fn is_forwarded_mark(mark_word: usize) -> bool {
    mark_word & FORWARDING_MASK == FORWARDED
}

pub fn is_forwarded<VM: VMBinding>(object: ObjectReference) -> bool {
    is_forwarded_mark(VM::VMObjectModel::load_mark_word(object))
}

/// The new location of a forwarded object.
pub fn read_forwarding_pointer<VM: VMBinding>(object: ObjectReference) -> ObjectReference {
    let mark_word = VM::VMObjectModel::load_mark_word(object);
    debug_assert!(
        is_forwarded_mark(mark_word),
        "{} is not forwarded: mark word {:#x}",
        object,
        mark_word
    );
    unsafe {
        ObjectReference::from_raw_address_unchecked(Address::from_usize(
            mark_word & !FORWARDING_MASK,
        ))
    }
}

/// Where the object is now, or where it will be once the move phase has run.
pub fn get_forwarded_object<VM: VMBinding>(object: ObjectReference) -> Option<ObjectReference> {
    if is_forwarded::<VM>(object) {
        Some(read_forwarding_pointer::<VM>(object))
    } else {
        None
    }
}

/// Overwrite the mark word with a forwarding pointer to `new_object`.
pub fn write_forwarding_pointer<VM: VMBinding>(
    object: ObjectReference,
    new_object: ObjectReference,
) {
    debug_assert!(new_object.to_raw_address().is_aligned_to(FORWARDING_MASK + 1));
    debug_assert!(new_object < object, "sliding only moves objects down");
    VM::VMObjectModel::store_mark_word(object, new_object.value() | FORWARDED);
}

/// Mark words saved before they were replaced by forwarding pointers.
#[derive(Default)]
pub struct PreservedMarks {
    entries: Vec<(ObjectReference, usize)>,
}

impl PreservedMarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the mark word of `object` if it holds anything but the prototype.
    pub fn push_if_necessary<VM: VMBinding>(&mut self, object: ObjectReference, mark_word: usize) {
        if VM::VMObjectModel::mark_word_must_be_preserved(mark_word) {
            trace!("Preserving mark word {:#x} of {}", mark_word, object);
            self.entries.push((object, mark_word));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-key the entries to the new locations. Must run after forwarding pointers are installed
    /// and before objects move, while the old copies still hold the forwarding pointers.
    pub fn adjust_during_full_gc<VM: VMBinding>(&mut self) {
        for (object, _) in self.entries.iter_mut() {
            if let Some(new_object) = get_forwarded_object::<VM>(*object) {
                *object = new_object;
            }
        }
    }

    /// Write the saved mark words back and empty the list.
    pub fn restore<VM: VMBinding>(&mut self) {
        for (object, mark_word) in self.entries.drain(..) {
            VM::VMObjectModel::store_mark_word(object, mark_word);
        }
    }
}
