//! The phases of a Lisp2 sliding cycle. Each phase is a walk over the roots or over the marked
//! objects in address order.

use crate::policy::contiguousspace::ContiguousSpace;
use crate::util::metadata::MarkBitmap;
use crate::util::object_forwarding::{self, PreservedMarks};
use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, Scanning, Slot, VMBinding};
use std::marker::PhantomData;

/// Objects found by a marking pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct MarkCounts {
    /// Objects marked directly from the roots.
    pub roots: usize,
    /// All marked objects, the ones marked from roots included.
    pub heap: usize,
}

/// Marks everything reachable from the roots with an explicit stack. Each object is pushed at most
/// once: only the call that sets its bit pushes it.
///
/// The verifying variant is used after the objects have moved. It checks every reference it
/// follows points into the allocated part of the space, at an object that is no longer
/// forwarded, and panics if not.
pub(super) struct MarkingClosure<'a, VM: VMBinding> {
    bitmap: &'a MarkBitmap,
    space: &'a ContiguousSpace,
    stack: Vec<ObjectReference>,
    verify: bool,
    _p: PhantomData<VM>,
}

impl<'a, VM: VMBinding> MarkingClosure<'a, VM> {
    pub fn new(bitmap: &'a MarkBitmap, space: &'a ContiguousSpace) -> Self {
        MarkingClosure {
            bitmap,
            space,
            stack: vec![],
            verify: false,
            _p: PhantomData,
        }
    }

    pub fn verifying(bitmap: &'a MarkBitmap, space: &'a ContiguousSpace) -> Self {
        MarkingClosure {
            verify: true,
            ..Self::new(bitmap, space)
        }
    }

    fn mark_slot(&mut self, slot: VM::VMSlot) {
        let Some(object) = slot.load() else {
            return;
        };
        let addr = object.to_raw_address();
        if self.verify {
            assert!(
                self.space.contains(addr),
                "Verification: {} found in {:?} is not in the heap",
                object,
                slot
            );
        } else {
            debug_assert!(self.space.contains(addr), "{} is not in the heap", object);
        }
        if self.bitmap.mark(addr) {
            if self.verify {
                assert!(
                    !object_forwarding::is_forwarded::<VM>(object),
                    "Verification: {} is still forwarded",
                    object
                );
            }
            trace!("Marked {}", object);
            self.stack.push(object);
        }
    }

    /// Mark from the roots, then drain the stack.
    pub fn mark(mut self) -> MarkCounts {
        VM::VMScanning::scan_roots(false, &mut |slot: VM::VMSlot| self.mark_slot(slot));
        let roots = self.stack.len();

        let mut heap = 0;
        while let Some(object) = self.stack.pop() {
            VM::VMScanning::scan_object(object, &mut |slot: VM::VMSlot| self.mark_slot(slot));
            heap += 1;
        }
        MarkCounts { roots, heap }
    }
}

/// Call `f` on every marked object in the space, in address order.
fn walk_bitmap<F: FnMut(ObjectReference)>(
    bitmap: &MarkBitmap,
    space: &ContiguousSpace,
    mut f: F,
) {
    bitmap.iterate_marked(space.bottom(), space.top(), |addr| {
        f(unsafe { ObjectReference::from_raw_address_unchecked(addr) })
    });
}

/// Slide every marked object down to the next free address, and install forwarding pointers in
/// the ones that move. Mark words that would be lost are saved in `preserved_marks`. Returns the
/// new top of the space.
pub(super) fn calculate_new_locations<VM: VMBinding>(
    bitmap: &MarkBitmap,
    space: &ContiguousSpace,
    preserved_marks: &mut PreservedMarks,
) -> Address {
    let mut compact_point = space.bottom();
    walk_bitmap(bitmap, space, |object| {
        // Objects already in place (the dense prefix) are left alone.
        if object.to_raw_address() != compact_point {
            let mark_word = VM::VMObjectModel::load_mark_word(object);
            preserved_marks.push_if_necessary::<VM>(object, mark_word);
            let new_object = unsafe { ObjectReference::from_raw_address_unchecked(compact_point) };
            object_forwarding::write_forwarding_pointer::<VM>(object, new_object);
        }
        compact_point += VM::VMObjectModel::get_current_size(object);
    });
    compact_point
}

fn adjust_slot<VM: VMBinding>(slot: VM::VMSlot) {
    if let Some(object) = slot.load() {
        if let Some(new_object) = object_forwarding::get_forwarded_object::<VM>(object) {
            slot.store(new_object);
        }
    }
}

/// Point every reference to a forwarded object, in live objects and in roots, at its new
/// location.
pub(super) fn adjust_pointers<VM: VMBinding>(
    bitmap: &MarkBitmap,
    space: &ContiguousSpace,
    preserved_marks: &mut PreservedMarks,
) {
    walk_bitmap(bitmap, space, |object| {
        VM::VMScanning::scan_object(object, &mut |slot: VM::VMSlot| adjust_slot::<VM>(slot));
    });
    VM::VMScanning::scan_roots(true, &mut |slot: VM::VMSlot| adjust_slot::<VM>(slot));
    preserved_marks.adjust_during_full_gc::<VM>();
}

/// Copy every forwarded object to its new location and reset its mark word. Returns the number
/// of objects moved.
///
/// Objects only move down and the walk goes up, so a copy can only overwrite objects that have
/// already been moved.
pub(super) fn move_objects<VM: VMBinding>(bitmap: &MarkBitmap, space: &ContiguousSpace) -> usize {
    let mut moved = 0;
    walk_bitmap(bitmap, space, |object| {
        if let Some(new_object) = object_forwarding::get_forwarded_object::<VM>(object) {
            let copy = VM::VMObjectModel::copy_to(object, new_object.to_raw_address());
            debug_assert_eq!(copy, new_object);
            VM::VMObjectModel::store_mark_word(copy, VM::VMObjectModel::PROTOTYPE_MARK_WORD);
            moved += 1;
        }
    });
    moved
}
