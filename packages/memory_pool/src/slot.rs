use std::mem::{ManuallyDrop, MaybeUninit};
use std::ptr::NonNull;

/// One unit of pool storage, big enough for either one `T` or one free-list link.
///
/// There is no tag saying which interpretation is active. A slot that is on the free list holds
/// a link; a slot that has been handed out by the pool holds whatever the caller put there. The
/// pool only ever reads the link of a slot it knows to be free.
///
/// `#[repr(C)]` places both fields at offset zero, so a pointer to the slot is also a valid
/// pointer to the value storage and vice versa.
#[repr(C)]
pub(crate) union Slot<T> {
    value: ManuallyDrop<MaybeUninit<T>>,
    next: Option<NonNull<Slot<T>>>,
}

impl<T> Slot<T> {
    /// Makes `slot` a free-list entry that links to `next`.
    ///
    /// # Safety
    ///
    /// `slot` must be valid for writes and must not hold a value that anyone still needs.
    pub(crate) unsafe fn set_next(slot: NonNull<Self>, next: Option<NonNull<Self>>) {
        // SAFETY: Forwarding the caller's guarantee that the slot is writable. Writing a `Copy`
        // union field does not drop anything.
        unsafe {
            (*slot.as_ptr()).next = next;
        }
    }

    /// Reads the free-list link stored in `slot`.
    ///
    /// # Safety
    ///
    /// `slot` must be valid for reads and must currently be a free-list entry, i.e. the last
    /// write to it was through [`set_next()`][Self::set_next].
    #[must_use]
    pub(crate) unsafe fn next(slot: NonNull<Self>) -> Option<NonNull<Self>> {
        // SAFETY: Forwarding the caller's guarantee that the link field is the active one.
        unsafe { (*slot.as_ptr()).next }
    }

    /// The address of the value storage inside `slot`.
    #[must_use]
    pub(crate) fn value_ptr(slot: NonNull<Self>) -> NonNull<T> {
        slot.cast()
    }

    /// Recovers the slot from the value address previously returned by
    /// [`value_ptr()`][Self::value_ptr].
    #[must_use]
    pub(crate) fn from_value_ptr(ptr: NonNull<T>) -> NonNull<Self> {
        ptr.cast()
    }
}
