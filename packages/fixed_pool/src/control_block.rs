use std::ptr::NonNull;

use nm::Event;

use crate::Synchronized;
use crate::metrics::{CONTROL_BLOCKS_CREATED, CONTROL_BLOCKS_RELEASED};

/// The reference counts of one pooled object.
#[derive(Debug)]
struct Counters {
    /// Number of `SharedPtr` instances keeping the value alive.
    shared: usize,

    /// Number of `WeakPtr` instances observing the value. These keep the control block
    /// alive but not the value.
    weak: usize,
}

/// Outcome of giving up one unit of the shared count.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum SharedRelease {
    /// Other shared pointers remain, nothing else to do.
    Retained,

    /// That was the last shared pointer. The value must be returned to the pool but weak
    /// pointers still use the control block.
    ValueReleased,

    /// That was the last pointer of any kind. The value must be returned to the pool and
    /// afterwards the control block must be freed via [`ControlBlock::free()`].
    ValueAndBlockReleased,
}

/// A heap-allocated pair of reference counts shared by every `SharedPtr` and `WeakPtr`
/// that refers to the same pooled object.
///
/// The counts live behind their own lock, so reference count traffic on one object never
/// contends with traffic on another object or with the pool's slot bookkeeping.
///
/// This type is just an address; it is the pointer types that own units of the counts.
/// Every method requires the caller to own at least one unit (shared or weak), which is
/// what keeps the allocation alive for the duration of the call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ControlBlock {
    ptr: NonNull<Synchronized<Counters>>,
}

impl ControlBlock {
    /// Allocates a new control block with one shared unit, owned by the caller.
    #[must_use]
    pub(crate) fn new() -> Self {
        let counters = Box::new(Synchronized::new(Counters { shared: 1, weak: 0 }));

        CONTROL_BLOCKS_CREATED.with(Event::observe_once);

        Self {
            ptr: NonNull::from(Box::leak(counters)),
        }
    }

    /// # Safety
    ///
    /// The caller must own a shared or weak unit of this control block for as long as the
    /// returned reference is used.
    unsafe fn counters<'a>(self) -> &'a Synchronized<Counters> {
        // SAFETY: Forwarding the requirement to the caller - as long as a unit is owned,
        // the block has not been freed.
        unsafe { self.ptr.as_ref() }
    }

    /// Adds one shared unit, to be owned by a new `SharedPtr`.
    ///
    /// # Safety
    ///
    /// The caller must own a shared unit of this control block.
    pub(crate) unsafe fn acquire_shared(self) {
        // SAFETY: Forwarding safety requirements to the caller.
        let mut counters = unsafe { self.counters() }.write_access();

        debug_assert!(counters.shared > 0, "caller must own a shared unit");

        counters.shared = counters
            .shared
            .checked_add(1)
            .expect("shared reference count overflow - more handles than addressable memory");
    }

    /// Adds one shared unit if the value is still alive. Returns whether a unit was added.
    ///
    /// The check and the increment happen under one lock acquisition, so a concurrent release
    /// of the last shared unit either happens entirely before (we see zero and add nothing) or
    /// entirely after (we add a unit and the value stays alive).
    ///
    /// # Safety
    ///
    /// The caller must own a weak unit of this control block.
    pub(crate) unsafe fn try_acquire_shared(self) -> bool {
        // SAFETY: Forwarding safety requirements to the caller.
        let mut counters = unsafe { self.counters() }.write_access();

        if counters.shared == 0 {
            return false;
        }

        counters.shared = counters
            .shared
            .checked_add(1)
            .expect("shared reference count overflow - more handles than addressable memory");

        true
    }

    /// Adds one weak unit, to be owned by a new `WeakPtr`.
    ///
    /// # Safety
    ///
    /// The caller must own a shared or weak unit of this control block.
    pub(crate) unsafe fn acquire_weak(self) {
        // SAFETY: Forwarding safety requirements to the caller.
        let mut counters = unsafe { self.counters() }.write_access();

        counters.weak = counters
            .weak
            .checked_add(1)
            .expect("weak reference count overflow - more handles than addressable memory");
    }

    /// Gives up one shared unit and reports what the caller now has to clean up.
    ///
    /// Both decisions are taken from a single locked observation of the counts. Once the lock
    /// is released, the caller may no longer touch the block unless it still owns a unit or was
    /// told to free it.
    ///
    /// # Safety
    ///
    /// The caller must own a shared unit of this control block and must not use that unit
    /// again after this call.
    #[must_use]
    pub(crate) unsafe fn release_shared(self) -> SharedRelease {
        // SAFETY: Forwarding safety requirements to the caller.
        let mut counters = unsafe { self.counters() }.write_access();

        counters.shared = counters
            .shared
            .checked_sub(1)
            .expect("caller must own a shared unit so the count cannot be zero");

        match (counters.shared, counters.weak) {
            (0, 0) => SharedRelease::ValueAndBlockReleased,
            (0, _) => SharedRelease::ValueReleased,
            _ => SharedRelease::Retained,
        }
    }

    /// Gives up one weak unit, freeing the block if nothing else references it anymore.
    ///
    /// # Safety
    ///
    /// The caller must own a weak unit of this control block and must not use that unit
    /// again after this call.
    pub(crate) unsafe fn release_weak(self) {
        let is_last = {
            // SAFETY: Forwarding safety requirements to the caller.
            let mut counters = unsafe { self.counters() }.write_access();

            counters.weak = counters
                .weak
                .checked_sub(1)
                .expect("caller must own a weak unit so the count cannot be zero");

            counters.shared == 0 && counters.weak == 0
        };

        if is_last {
            // SAFETY: Both counts are zero, so no other pointer references the block. The lock
            // guard was dropped above, so nothing borrows the block anymore.
            unsafe {
                self.free();
            }
        }
    }

    /// The current number of shared units. Only valid at the instant it is read.
    ///
    /// # Safety
    ///
    /// The caller must own a shared or weak unit of this control block.
    #[must_use]
    pub(crate) unsafe fn shared_count(self) -> usize {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { self.counters() }.read_access().shared
    }

    /// The current number of weak units. Only valid at the instant it is read.
    ///
    /// # Safety
    ///
    /// The caller must own a shared or weak unit of this control block.
    #[must_use]
    pub(crate) unsafe fn weak_count(self) -> usize {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { self.counters() }.read_access().weak
    }

    /// Deallocates the control block.
    ///
    /// # Safety
    ///
    /// Both counts must be zero, no lock guard on the block may exist and the block must not
    /// be used again.
    pub(crate) unsafe fn free(self) {
        // SAFETY: The block was created via `Box::leak()` in `new()` and the caller guarantees
        // that this is the single point where it is turned back into a box.
        let counters = unsafe { Box::from_raw(self.ptr.as_ptr()) };

        debug_assert!(
            {
                let counters = counters.read_access();
                counters.shared == 0 && counters.weak == 0
            },
            "control block freed while still referenced"
        );

        drop(counters);

        CONTROL_BLOCKS_RELEASED.with(Event::observe_once);
    }
}
