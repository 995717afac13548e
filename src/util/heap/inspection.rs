//! Heap inspection for debugging and tests: object sizes, addresses, outgoing references, and
//! the size of the subgraph reachable from an object.
//!
//! These read the heap without synchronizing with collections. The answers are only stable in a
//! quiescent runtime, and addresses change whenever a sliding cycle runs.

use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, Scanning, Slot, VMBinding};
use std::collections::HashSet;

/// Bit in the value returned by a [`deep_size_of_with`] callback: visit the object's references.
pub const DEEP_SIZE_OF_TRAVERSE: i64 = 1;
/// Bit in the value returned by a [`deep_size_of_with`] callback: count the object's own size.
pub const DEEP_SIZE_OF_SHALLOW: i64 = 2;

/// The number of bytes `object` occupies in the heap.
pub fn size_of<VM: VMBinding>(object: ObjectReference) -> usize {
    VM::VMObjectModel::get_current_size(object)
}

/// The current address of `object`.
pub fn address_of(object: ObjectReference) -> Address {
    object.to_raw_address()
}

/// The objects `object` refers to, in field order. Null fields are left out.
pub fn referenced_objects<VM: VMBinding>(object: ObjectReference) -> Vec<ObjectReference> {
    let mut result = vec![];
    VM::VMScanning::scan_object(object, &mut |slot: VM::VMSlot| {
        if let Some(referent) = slot.load() {
            result.push(referent);
        }
    });
    result
}

/// The total size of `object` and every object reachable from it. Each object is counted once.
pub fn deep_size_of<VM: VMBinding>(object: ObjectReference) -> usize {
    deep_size_of_with::<VM>(object, |_| DEEP_SIZE_OF_TRAVERSE | DEEP_SIZE_OF_SHALLOW)
}

/// Like [`deep_size_of`], with `include_check` deciding for each reached object, including
/// `object` itself, what it contributes:
///
/// * a positive value is a combination of [`DEEP_SIZE_OF_SHALLOW`] (add the object's size) and
///   [`DEEP_SIZE_OF_TRAVERSE`] (visit its references);
/// * a negative value `t` adds `-t` bytes instead of the object's size, and stops there;
/// * zero neither counts nor traverses the object.
///
/// The callback is called once per object, however many paths lead to it.
pub fn deep_size_of_with<VM: VMBinding>(
    object: ObjectReference,
    mut include_check: impl FnMut(ObjectReference) -> i64,
) -> usize {
    let mut visited = HashSet::new();
    let mut stack = vec![];
    visited.insert(object);

    let mut total = 0usize;
    let mut include = |o: ObjectReference, stack: &mut Vec<ObjectReference>| -> usize {
        let t = include_check(o);
        if t > 0 {
            if t & DEEP_SIZE_OF_TRAVERSE != 0 {
                stack.push(o);
            }
            if t & DEEP_SIZE_OF_SHALLOW != 0 {
                return size_of::<VM>(o);
            }
            0
        } else {
            t.unsigned_abs() as usize
        }
    };

    total += include(object, &mut stack);
    while let Some(o) = stack.pop() {
        for referent in referenced_objects::<VM>(o) {
            if visited.insert(referent) {
                total += include(referent, &mut stack);
            }
        }
    }
    total
}
