use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;

/// VM-specific methods for the object model.
///
/// This trait describes the parts of an object the collector touches:
///
/// * **Size.** Objects are laid out back to back in the space, each starting at a multiple of
///   [`VMBinding::MIN_ALIGNMENT`]. [`ObjectModel::get_current_size`] must return the number of
///   bytes the object occupies, rounded up to `MIN_ALIGNMENT`, and it must keep working while the
///   mark word holds a forwarding pointer.
/// * **Mark word.** One word per object that the collector can overwrite during a cycle. A sliding
///   cycle stores the forwarding address of moving objects there, tagged with
///   [`crate::util::object_forwarding::FORWARDED`] in the two low bits. A mark word in its normal
///   state must never have both low bits set while the world is stopped. Mark words that carry
///   information (identity hash, lock state) are saved before being overwritten and restored once
///   the object is in its new place, so [`ObjectModel::mark_word_must_be_preserved`] must say
///   which values differ from the prototype.
/// * **Dummy objects.** Unused TLAB tails are filled with dummy objects so the space can be
///   walked linearly. They are never reachable.
///
/// An object reference is the address of the first byte of the object, where the mark word is
/// expected to live.
pub trait ObjectModel<VM: VMBinding> {
    /// The mark word of a freshly allocated object. Written back into every moved object.
    const PROTOTYPE_MARK_WORD: usize;

    /// The size of the object in bytes, a multiple of `MIN_ALIGNMENT`.
    fn get_current_size(object: ObjectReference) -> usize;

    /// Load the mark word.
    fn load_mark_word(object: ObjectReference) -> usize;

    /// Store the mark word.
    fn store_mark_word(object: ObjectReference, value: usize);

    /// Does this mark word carry state that is lost if it is replaced by the prototype?
    fn mark_word_must_be_preserved(mark_word: usize) -> bool {
        mark_word != Self::PROTOTYPE_MARK_WORD
    }

    /// Copy the object to `to` and return the reference of the copy. Source and destination may
    /// overlap: sliding moves objects by less than their own size.
    fn copy_to(from: ObjectReference, to: Address) -> ObjectReference {
        let bytes = Self::get_current_size(from);
        unsafe {
            std::ptr::copy(
                from.to_raw_address().to_ptr::<u8>(),
                to.to_mut_ptr::<u8>(),
                bytes,
            );
            ObjectReference::from_raw_address_unchecked(to)
        }
    }

    /// Turn `[start, start + bytes)` into a dummy object. `bytes` is a non-zero multiple of
    /// `MIN_ALIGNMENT`.
    fn fill_with_dummy_object(start: Address, bytes: usize);

    /// Is this a dummy object written by [`ObjectModel::fill_with_dummy_object`]?
    fn is_dummy_object(object: ObjectReference) -> bool;
}
