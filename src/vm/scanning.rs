use crate::util::ObjectReference;
use crate::vm::slot::Slot;
use crate::vm::VMBinding;

/// Callback trait of scanning functions that report slots.
pub trait SlotVisitor<SL: Slot> {
    /// Call this function for each slot.
    fn visit_slot(&mut self, slot: SL);
}

/// This lets us use closures as SlotVisitor.
impl<SL: Slot, F: FnMut(SL)> SlotVisitor<SL> for F {
    fn visit_slot(&mut self, slot: SL) {
        self(slot)
    }
}

/// VM-specific methods for scanning roots and objects.
///
/// Both methods are only called while the mutators are stopped, on the thread that requested the
/// collection.
pub trait Scanning<VM: VMBinding> {
    /// Report every reference field of `object` to `slot_visitor`. Fields that hold null may be
    /// skipped. This is also used by the heap inspection API outside of collections, so it must
    /// not assume a collection is in progress.
    fn scan_object<SV: SlotVisitor<VM::VMSlot>>(object: ObjectReference, slot_visitor: &mut SV);

    /// Report every root slot the runtime holds: thread stacks, global handles, class metadata,
    /// compiled code. Weak roots are reported like strong ones; nothing is ever cleared.
    ///
    /// The collector calls this twice per cycle. With `update == false` it only reads the slots
    /// (marking). With `update == true` it stores relocated references back through
    /// [`Slot::store`], so every slot reported must be writable. The runtime must report the same
    /// set of slots both times, and may use `update` to skip roots it knows cannot move.
    fn scan_roots<SV: SlotVisitor<VM::VMSlot>>(update: bool, slot_visitor: &mut SV);
}
