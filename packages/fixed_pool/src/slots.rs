use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use foldhash::{HashSet, HashSetExt};

use crate::{Error, Result};

/// The backing storage of a [`Pool`][crate::Pool]: a fixed number of uninitialized slots, each
/// sized and aligned for one `T`, plus the bookkeeping that says which of them hold a value.
///
/// The arena does not keep references to its items and does not create any, so it is valid for
/// the pointer types to access items via the raw pointers handed out by [`insert()`][1] while
/// other slots are being inserted or removed. The pointers remain valid until the item is
/// removed or the arena is dropped.
///
/// This type performs no synchronization. The pool wraps it in a [`Synchronized`][2].
///
/// [1]: Self::insert
/// [2]: crate::Synchronized
#[derive(Debug)]
pub(crate) struct SlotArena<T> {
    /// Start of the slot array. Dangling if the arena has no capacity or `T` is zero-sized.
    first_slot_ptr: NonNull<MaybeUninit<T>>,

    capacity: usize,

    /// Stack of vacant slot indices. The most recently freed slot is reused first.
    free: Vec<usize>,

    /// Indices of slots that currently hold a value.
    allocated: HashSet<usize>,
}

impl<T> SlotArena<T> {
    /// An arena with no slots at all, representing a pool that has not been set up.
    #[must_use]
    pub(crate) fn empty() -> Self {
        Self {
            first_slot_ptr: NonNull::dangling(),
            capacity: 0,
            free: Vec::new(),
            allocated: HashSet::new(),
        }
    }

    /// Allocates storage for `capacity` slots, all of them vacant.
    ///
    /// Nothing is retained if this fails, so the caller can treat failure as "no arena".
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument {
                problem: "pool capacity must be greater than zero".to_string(),
            });
        }

        let layout = Self::layout(capacity)?;

        let first_slot_ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            // SAFETY: The layout is valid for an array of `capacity` slots and we checked
            // above that it is not zero-sized.
            NonNull::new(unsafe { alloc(layout).cast::<MaybeUninit<T>>() }).expect(
                "we do not intend to handle allocation failure as a real possibility - OOM is panic",
            )
        };

        // Reversed so that the first allocations hand out the lowest indices.
        let free = (0..capacity).rev().collect::<Vec<_>>();

        Ok(Self {
            first_slot_ptr,
            capacity,
            free,
            allocated: HashSet::with_capacity(capacity),
        })
    }

    fn layout(capacity: usize) -> Result<Layout> {
        Layout::array::<T>(capacity).map_err(|_layout_error| Error::InvalidArgument {
            problem: format!(
                "a pool of {capacity} slots of {} exceeds the addressable memory size",
                type_name::<T>()
            ),
        })
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Mutations are caught by integrity check panics only.
    pub(crate) fn free_len(&self) -> usize {
        self.free.len()
    }

    #[must_use]
    pub(crate) fn allocated_len(&self) -> usize {
        self.allocated.len()
    }

    /// The indices of all occupied slots, in ascending order.
    #[must_use]
    pub(crate) fn allocated_indices(&self) -> Vec<usize> {
        let mut indices = self.allocated.iter().copied().collect::<Vec<_>>();
        indices.sort_unstable();
        indices
    }

    fn slot_ptr(&self, index: usize) -> Result<NonNull<MaybeUninit<T>>> {
        if index >= self.capacity {
            return Err(Error::InvalidIndex {
                index,
                capacity: self.capacity,
            });
        }

        // SAFETY: Guarded by the bounds check above, so the offset stays within
        // the allocation (or is a zero offset for zero-sized `T`).
        Ok(unsafe { self.first_slot_ptr.add(index) })
    }

    /// Moves `value` into a vacant slot and returns the slot index and a pointer to the value.
    ///
    /// If there is no vacant slot, `value` is dropped and [`Error::PoolExhausted`] is returned.
    pub(crate) fn insert(&mut self, value: T) -> Result<(usize, NonNull<T>)> {
        let Some(index) = self.free.pop() else {
            return Err(Error::PoolExhausted {
                capacity: self.capacity,
            });
        };

        let slot_ptr = self.slot_ptr(index)?;

        // SAFETY: The slot is within bounds and vacant (it was on the free stack),
        // so nothing else is reading or writing it and there is no value to overwrite.
        unsafe {
            slot_ptr.as_ptr().write(MaybeUninit::new(value));
        }

        let newly_allocated = self.allocated.insert(index);
        assert!(
            newly_allocated,
            "slot {index} was on the free stack while also allocated in arena of {}",
            type_name::<T>()
        );

        Ok((index, slot_ptr.cast::<T>()))
    }

    /// Marks the slot at `index` as vacant and moves its value out to the caller.
    ///
    /// The caller decides where to drop the value. The pool drops it after releasing its
    /// lock, so that destructors are free to use the pool themselves.
    pub(crate) fn remove(&mut self, index: usize) -> Result<T> {
        let slot_ptr = self.slot_ptr(index)?;

        if !self.allocated.remove(&index) {
            return Err(Error::InvalidIndex {
                index,
                capacity: self.capacity,
            });
        }

        self.free.push(index);

        // SAFETY: The slot was in the allocated set, so it holds an initialized value. We
        // just marked it vacant, so this is the only read of that value that will ever happen.
        Ok(unsafe { slot_ptr.as_ptr().read().assume_init() })
    }

    /// Verifies that the free and allocated slot counts add up to the capacity.
    ///
    /// This is cheap enough to run around every insert and remove. See
    /// [`check_consistency()`][Self::check_consistency] for the exhaustive variant.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    pub(crate) fn check_integrity(&self) -> Result<()> {
        let free = self.free.len();
        let allocated = self.allocated.len();

        if free.checked_add(allocated) != Some(self.capacity) {
            return Err(Error::InvariantViolation {
                free,
                allocated,
                capacity: self.capacity,
            });
        }

        Ok(())
    }

    /// Verifies that every slot is accounted for exactly once, by checking each index on the
    /// free stack against the allocated set.
    ///
    /// This walks the whole free stack, so it only runs in debug builds when the arena is
    /// discarded.
    #[cfg(debug_assertions)]
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    pub(crate) fn check_consistency(&self) -> Result<()> {
        self.check_integrity()?;

        for &index in &self.free {
            if index >= self.capacity || self.allocated.contains(&index) {
                return Err(Error::InvalidIndex {
                    index,
                    capacity: self.capacity,
                });
            }
        }

        Ok(())
    }
}

impl<T> Drop for SlotArena<T> {
    fn drop(&mut self) {
        for index in self.allocated.drain() {
            // SAFETY: Indices in the allocated set are always within bounds.
            let slot_ptr = unsafe { self.first_slot_ptr.add(index) };

            // SAFETY: The slot was in the allocated set, so it holds an initialized value,
            // and draining the set guarantees we drop each value exactly once.
            unsafe {
                slot_ptr.cast::<T>().drop_in_place();
            }
        }

        if self.capacity == 0 {
            return;
        }

        let layout = Self::layout(self.capacity)
            .expect("layout was calculable when the arena was created so it still is");

        if layout.size() == 0 {
            return;
        }

        // SAFETY: The layout must match between alloc and dealloc. It does.
        unsafe {
            dealloc(self.first_slot_ptr.as_ptr().cast(), layout);
        }
    }
}

// SAFETY: There are raw pointers involved here but nothing inherently non-thread-mobile
// about them, so as long as T itself can move between threads, the arena can do so, too.
unsafe impl<T: Send> Send for SlotArena<T> {}

// SAFETY: Shared references to the arena only expose bookkeeping data, never the values. The
// values are only reachable through pointers whose owners enforce their own thread-safety bounds.
unsafe impl<T: Send> Sync for SlotArena<T> {}
