use std::fmt;
use std::ptr::{self, NonNull};

use crate::Pool;
use crate::control_block::ControlBlock;

/// Locates one occupied slot of a [`Pool`].
///
/// A handle is not an ownership type: holding one does not keep the slot occupied. The pointer
/// types ([`SharedPtr`][1], [`UniquePtr`][2] and [`WeakPtr`][3]) are built on top of handles
/// and expose them via their `handle()` methods for introspection.
///
/// The slot index is the source of truth for which slot a handle refers to. The raw pointer is
/// a cached address of that slot.
///
/// # Example
///
/// ```rust
/// use fixed_pool::Pool;
///
/// let pool = Pool::<u32>::with_capacity(2)?;
///
/// let first = pool.make_unique(1)?;
/// let second = pool.make_unique(2)?;
///
/// let first_handle = first.handle().expect("not null");
/// let second_handle = second.handle().expect("not null");
///
/// assert_ne!(first_handle.index(), second_handle.index());
/// assert!(std::ptr::eq(first_handle.pool(), &pool));
/// # Ok::<(), fixed_pool::Error>(())
/// ```
///
/// [1]: crate::SharedPtr
/// [2]: crate::UniquePtr
/// [3]: crate::WeakPtr
pub struct Handle<'p, T> {
    ptr: NonNull<T>,
    index: usize,
    pool: &'p Pool<T>,
}

impl<'p, T> Handle<'p, T> {
    #[must_use]
    pub(crate) fn new(ptr: NonNull<T>, index: usize, pool: &'p Pool<T>) -> Self {
        Self { ptr, index, pool }
    }

    /// Index of the slot in the pool.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Address of the value in the slot.
    ///
    /// The pointer is only valid to dereference while an owning pointer keeps the slot
    /// occupied.
    #[must_use]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// The pool that owns the slot.
    #[must_use]
    pub fn pool(&self) -> &'p Pool<T> {
        self.pool
    }
}

impl<T> Clone for Handle<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<'_, T> {}

impl<T> PartialEq for Handle<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        // The index is included so that zero-sized values, which all share
        // one address, still compare by slot.
        self.ptr == other.ptr && self.index == other.index && ptr::eq(self.pool, other.pool)
    }
}

impl<T> Eq for Handle<'_, T> {}

impl<T> fmt::Debug for Handle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("ptr", &self.ptr)
            .field("index", &self.index)
            .field("pool", &ptr::from_ref(self.pool))
            .finish()
    }
}

/// A handle together with the control block that counts references to its slot.
/// This is the non-null state of both `SharedPtr` and `WeakPtr`.
pub(crate) struct CountedHandle<'p, T> {
    pub(crate) handle: Handle<'p, T>,
    pub(crate) block: ControlBlock,
}

impl<T> Clone for CountedHandle<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CountedHandle<'_, T> {}

impl<T> fmt::Debug for CountedHandle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountedHandle")
            .field("handle", &self.handle)
            .field("block", &self.block)
            .finish()
    }
}
