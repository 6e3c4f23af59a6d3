use std::fmt;
use std::mem;
use std::ops::Deref;

use crate::control_block::{ControlBlock, SharedRelease};
use crate::handle::CountedHandle;
use crate::{Error, Handle, Result, WeakPtr};

/// A reference-counted pointer to a value stored in a [`Pool`][crate::Pool].
///
/// Cloning the pointer increments a reference count kept in a control block next to (but not
/// inside) the pool. When the last clone is dropped or [reset][Self::reset], the value is
/// dropped and its slot returned to the pool.
///
/// A `SharedPtr` may be null, e.g. when returned by [`WeakPtr::lock()`] after the value is
/// gone. Dereferencing a null pointer via [`get()`][Self::get] returns
/// [`Error::NullDereference`]; dereferencing it via [`Deref`] panics.
///
/// Two pointers compare equal if they point to the same slot, or are both null.
///
/// # Example
///
/// ```rust
/// use fixed_pool::{Pool, SharedPtr};
///
/// let pool = Pool::<String>::with_capacity(4)?;
///
/// let original = pool.make_shared("hello".to_string())?;
/// let copy = original.clone();
///
/// assert_eq!(original, copy);
/// assert_eq!(original.count(), 2);
///
/// drop(original);
/// assert_eq!(copy.count(), 1);
/// assert_eq!(*copy, "hello");
///
/// assert_ne!(copy, SharedPtr::null());
/// # Ok::<(), fixed_pool::Error>(())
/// ```
///
/// # Thread safety
///
/// This type is thread-safe ([`Send`] + [`Sync`]) if `T` is both [`Send`] and [`Sync`], as
/// any clone may be the one to drop the value and all clones may read it concurrently.
pub struct SharedPtr<'p, T> {
    inner: Option<CountedHandle<'p, T>>,
}

impl<'p, T> SharedPtr<'p, T> {
    /// A pointer that points to nothing.
    #[must_use]
    pub const fn null() -> Self {
        Self { inner: None }
    }

    /// Takes ownership of a freshly allocated slot, creating a new control block.
    #[must_use]
    pub(crate) fn from_handle(handle: Handle<'p, T>) -> Self {
        Self {
            inner: Some(CountedHandle {
                handle,
                block: ControlBlock::new(),
            }),
        }
    }

    /// # Safety
    ///
    /// The caller must transfer ownership of one shared unit of `counted.block` to the new
    /// pointer.
    #[must_use]
    pub(crate) unsafe fn adopt(counted: CountedHandle<'p, T>) -> Self {
        Self {
            inner: Some(counted),
        }
    }

    /// Whether this pointer points to nothing.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns a reference to the pointed-to value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullDereference`] if this pointer is null.
    pub fn get(&self) -> Result<&T> {
        let counted = self.inner.as_ref().ok_or(Error::NullDereference)?;

        // SAFETY: We own a shared unit, so the slot stays occupied for as long as `self` lives,
        // and shared pointers never hand out exclusive references to the value.
        Ok(unsafe { counted.handle.ptr().as_ref() })
    }

    /// The slot locator, or `None` if this pointer is null.
    #[must_use]
    pub fn handle(&self) -> Option<Handle<'p, T>> {
        self.inner.map(|counted| counted.handle)
    }

    /// The number of shared pointers to the value, including this one. Zero if null.
    ///
    /// The count is a snapshot and may be outdated as soon as it is returned if other threads
    /// hold pointers to the same value.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.map_or(0, |counted| {
            // SAFETY: We own a shared unit of the block.
            unsafe { counted.block.shared_count() }
        })
    }

    /// The number of weak pointers to the value. Zero if null.
    #[must_use]
    pub fn weak_count(&self) -> usize {
        self.inner.map_or(0, |counted| {
            // SAFETY: We own a shared unit of the block.
            unsafe { counted.block.weak_count() }
        })
    }

    /// Creates a [`WeakPtr`] that observes the same value without keeping it alive.
    ///
    /// Returns a null [`WeakPtr`] if this pointer is null.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::Pool;
    ///
    /// let pool = Pool::<u32>::with_capacity(1)?;
    ///
    /// let strong = pool.make_shared(5)?;
    /// let weak = strong.make_weak();
    ///
    /// assert_eq!(strong.weak_count(), 1);
    /// assert_eq!(*weak.lock(), 5);
    ///
    /// drop(strong);
    /// assert!(weak.expired());
    /// assert_eq!(pool.allocated_size(), 0);
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    #[must_use]
    pub fn make_weak(&self) -> WeakPtr<'p, T> {
        match self.inner {
            Some(counted) => {
                // SAFETY: We own a shared unit of the block.
                unsafe {
                    counted.block.acquire_weak();
                }

                // SAFETY: The weak unit we just acquired is handed over to the new pointer.
                unsafe { WeakPtr::adopt(counted) }
            }
            None => WeakPtr::null(),
        }
    }

    /// Releases this pointer's share of the value and makes it null.
    ///
    /// If this was the last shared pointer, the value is dropped and its slot returned to the
    /// pool. Resetting a null pointer does nothing.
    pub fn reset(&mut self) {
        let Some(counted) = self.inner.take() else {
            return;
        };

        // SAFETY: We owned a shared unit and just gave up our only way to use it.
        let release = unsafe { counted.block.release_shared() };

        match release {
            SharedRelease::Retained => {}
            SharedRelease::ValueReleased => {
                counted.handle.pool().release(counted.handle);
            }
            SharedRelease::ValueAndBlockReleased => {
                // The block goes first, so a panicking destructor of the value cannot leak it.
                // SAFETY: Both counts reached zero under the block lock, so nobody else can
                // reach the block anymore, and we no longer hold the lock.
                unsafe {
                    counted.block.free();
                }

                counted.handle.pool().release(counted.handle);
            }
        }
    }

    /// Moves the pointer out, leaving a null pointer in its place. No counts change.
    #[must_use]
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }
}

impl<T> Clone for SharedPtr<'_, T> {
    fn clone(&self) -> Self {
        if let Some(counted) = self.inner {
            // SAFETY: We own a shared unit of the block. The new shared unit is handed over
            // to the new pointer below.
            unsafe {
                counted.block.acquire_shared();
            }
        }

        Self { inner: self.inner }
    }
}

impl<T> Drop for SharedPtr<'_, T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T> Default for SharedPtr<'_, T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Deref for SharedPtr<'_, T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the pointer is null.
    fn deref(&self) -> &Self::Target {
        match self.get() {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }
}

impl<T> PartialEq for SharedPtr<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl<T> Eq for SharedPtr<'_, T> {}

impl<T> fmt::Debug for SharedPtr<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPtr")
            .field("handle", &self.handle())
            .field("count", &self.count())
            .finish()
    }
}

// SAFETY: Any clone on any thread may end up dropping the value (so `T: Send`) and clones on
// different threads may read the value concurrently (so `T: Sync`). The counts are guarded by
// the control block lock and the pool is thread-safe.
unsafe impl<T: Send + Sync> Send for SharedPtr<'_, T> {}

// SAFETY: See `Send` above; `&SharedPtr` can be cloned into a `SharedPtr` so the
// requirements are the same.
unsafe impl<T: Send + Sync> Sync for SharedPtr<'_, T> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::Pool;

    assert_impl_all!(SharedPtr<'static, u32>: Send, Sync, Clone);
    assert_not_impl_any!(SharedPtr<'static, Cell<u32>>: Send, Sync);
    assert_not_impl_any!(SharedPtr<'static, Rc<u32>>: Send, Sync);

    #[test]
    fn clone_increments_and_drop_decrements() {
        let pool = Pool::<u32>::with_capacity(1).unwrap();

        let a = pool.make_shared(1).unwrap();
        assert_eq!(a.count(), 1);

        let b = a.clone();
        assert_eq!(a.count(), 2);
        assert_eq!(b.count(), 2);

        drop(b);
        assert_eq!(a.count(), 1);
        assert_eq!(*a, 1);
        assert_eq!(pool.allocated_size(), 1);

        drop(a);
        assert_eq!(pool.allocated_size(), 0);
    }

    #[test]
    fn null_pointer_behavior() {
        let null = SharedPtr::<u32>::null();

        assert!(null.is_null());
        assert_eq!(null.get(), Err(Error::NullDereference));
        assert_eq!(null.count(), 0);
        assert!(null.handle().is_none());
        assert!(null.make_weak().expired());
        assert_eq!(null, SharedPtr::default());

        let cloned = null.clone();
        assert!(cloned.is_null());
    }

    #[test]
    #[should_panic]
    fn deref_null_panics() {
        let null = SharedPtr::<u32>::null();
        let _value: u32 = *null;
    }

    #[test]
    fn reset_releases_and_nulls() {
        let pool = Pool::<u32>::with_capacity(1).unwrap();

        let mut a = pool.make_shared(1).unwrap();
        a.reset();

        assert!(a.is_null());
        assert_eq!(pool.allocated_size(), 0);

        // Resetting again is harmless.
        a.reset();
        assert!(a.is_null());
    }

    #[test]
    fn assigning_null_releases() {
        let pool = Pool::<u32>::with_capacity(1).unwrap();

        let mut a = pool.make_shared(1).unwrap();
        a = SharedPtr::null();

        assert!(a.is_null());
        assert_eq!(pool.allocated_size(), 0);
    }

    #[test]
    fn take_moves_without_changing_count() {
        let pool = Pool::<u32>::with_capacity(1).unwrap();

        let mut a = pool.make_shared(1).unwrap();
        let b = a.take();

        assert!(a.is_null());
        assert_eq!(b.count(), 1);
        assert_eq!(*b, 1);
    }

    #[test]
    fn equality_compares_slots() {
        let pool = Pool::<u32>::with_capacity(2).unwrap();

        let a = pool.make_shared(1).unwrap();
        let b = pool.make_shared(1).unwrap();

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a, SharedPtr::null());
    }

    #[test]
    fn value_dropped_exactly_once() {
        struct Droppable {
            drops: Rc<Cell<usize>>,
        }

        impl Drop for Droppable {
            fn drop(&mut self) {
                self.drops.set(self.drops.get().checked_add(1).unwrap());
            }
        }

        let drops = Rc::new(Cell::new(0));
        let pool = Pool::<Droppable>::with_capacity(1).unwrap();

        let a = pool
            .make_shared(Droppable {
                drops: Rc::clone(&drops),
            })
            .unwrap();
        let b = a.clone();
        let c = b.clone();

        drop(a);
        drop(c);
        assert_eq!(drops.get(), 0);

        drop(b);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn weak_outliving_shared_keeps_block_only() {
        let pool = Pool::<u32>::with_capacity(1).unwrap();

        let a = pool.make_shared(1).unwrap();
        let weak = a.make_weak();

        drop(a);

        // The slot is free again even though the weak pointer is alive.
        assert_eq!(pool.free_size(), 1);
        assert!(weak.expired());
        assert_eq!(weak.weak_count(), 1);
    }

    #[test]
    fn clones_on_many_threads() {
        const THREADS: usize = 8;
        const CLONES_PER_THREAD: usize = 1000;

        let pool = Pool::<u64>::with_capacity(1).unwrap();
        let original = pool.make_shared(42).unwrap();

        thread::scope(|s| {
            for _ in 0..THREADS {
                let original = &original;

                s.spawn(move || {
                    for _ in 0..CLONES_PER_THREAD {
                        let copy = original.clone();
                        assert_eq!(*copy, 42);
                    }
                });
            }
        });

        assert_eq!(original.count(), 1);
        assert_eq!(pool.allocated_size(), 1);

        drop(original);
        assert_eq!(pool.allocated_size(), 0);
    }
}
