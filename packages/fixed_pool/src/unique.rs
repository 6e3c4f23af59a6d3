use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

use crate::{Error, Handle, Result, SharedPtr};

/// An exclusively owning pointer to a value stored in a [`Pool`][crate::Pool].
///
/// There is no reference counting and no control block, which makes this the cheap way to use
/// pool-backed storage when the value does not need to be shared. The pointer cannot be cloned,
/// only moved. When it is dropped or [reset][Self::reset], the value is dropped and its slot
/// returned to the pool.
///
/// If sharing becomes necessary later, [`into_shared()`][Self::into_shared] converts the pointer
/// into a [`SharedPtr`] without moving the value.
///
/// # Example
///
/// ```rust
/// use fixed_pool::Pool;
///
/// let pool = Pool::<Vec<u32>>::with_capacity(2)?;
///
/// let mut numbers = pool.make_unique(vec![1, 2])?;
/// numbers.push(3);
///
/// // Moving transfers ownership; the slot stays occupied.
/// let moved = numbers;
/// assert_eq!(*moved, vec![1, 2, 3]);
/// assert_eq!(pool.allocated_size(), 1);
///
/// drop(moved);
/// assert_eq!(pool.allocated_size(), 0);
/// # Ok::<(), fixed_pool::Error>(())
/// ```
pub struct UniquePtr<'p, T> {
    handle: Option<Handle<'p, T>>,
}

impl<'p, T> UniquePtr<'p, T> {
    /// A pointer that points to nothing.
    #[must_use]
    pub const fn null() -> Self {
        Self { handle: None }
    }

    /// Takes sole ownership of a freshly allocated slot.
    #[must_use]
    pub(crate) fn from_handle(handle: Handle<'p, T>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Whether this pointer points to nothing.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.handle.is_none()
    }

    /// Returns a reference to the owned value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullDereference`] if this pointer is null.
    pub fn get(&self) -> Result<&T> {
        let handle = self.handle.ok_or(Error::NullDereference)?;

        // SAFETY: We are the only owner of the occupied slot and the borrow of `self`
        // prevents any conflicting exclusive reference for the lifetime of the result.
        Ok(unsafe { handle.ptr().as_ref() })
    }

    /// Returns an exclusive reference to the owned value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullDereference`] if this pointer is null.
    pub fn get_mut(&mut self) -> Result<&mut T> {
        let handle = self.handle.ok_or(Error::NullDereference)?;

        // SAFETY: We are the only owner of the occupied slot and the exclusive borrow of
        // `self` prevents any other reference for the lifetime of the result.
        Ok(unsafe { handle.ptr().as_mut() })
    }

    /// The slot locator, or `None` if this pointer is null.
    #[must_use]
    pub fn handle(&self) -> Option<Handle<'p, T>> {
        self.handle
    }

    /// Drops the owned value, returns its slot to the pool and makes this pointer null.
    /// Resetting a null pointer does nothing.
    pub fn reset(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.pool().release(handle);
        }
    }

    /// Moves the pointer out, leaving a null pointer in its place.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::Pool;
    ///
    /// let pool = Pool::<u32>::with_capacity(1)?;
    ///
    /// let mut source = pool.make_unique(9)?;
    /// let target = source.take();
    ///
    /// assert!(source.is_null());
    /// assert_eq!(*target, 9);
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Converts this pointer into a [`SharedPtr`] by attaching a new control block.
    ///
    /// The value stays in its slot. A null pointer converts into a null [`SharedPtr`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::Pool;
    ///
    /// let pool = Pool::<u32>::with_capacity(1)?;
    ///
    /// let unique = pool.make_unique(3)?;
    /// let index = unique.handle().map(|handle| handle.index());
    ///
    /// let shared = unique.into_shared();
    /// assert_eq!(shared.count(), 1);
    /// assert_eq!(shared.handle().map(|handle| handle.index()), index);
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    #[must_use]
    pub fn into_shared(mut self) -> SharedPtr<'p, T> {
        match self.handle.take() {
            Some(handle) => SharedPtr::from_handle(handle),
            None => SharedPtr::null(),
        }
    }
}

impl<T> Drop for UniquePtr<'_, T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T> Default for UniquePtr<'_, T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Deref for UniquePtr<'_, T> {
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

impl<T> DerefMut for UniquePtr<'_, T> {
    /// # Panics
    ///
    /// Panics if the pointer is null.
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.get_mut() {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }
}

impl<T> PartialEq for UniquePtr<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for UniquePtr<'_, T> {}

impl<T> fmt::Debug for UniquePtr<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniquePtr")
            .field("handle", &self.handle)
            .finish()
    }
}

// SAFETY: The pointer owns its value exclusively, like a `Box<T>`, and the pool it returns the
// slot to is thread-safe.
unsafe impl<T: Send> Send for UniquePtr<'_, T> {}

// SAFETY: A shared reference to the pointer grants shared access to the value, like
// `&Box<T>`, so `T: Sync` is required. It also reaches the pool via `handle().pool()`, through
// which another thread can place values that this thread may end up dropping, so `T: Send` is
// required as well.
unsafe impl<T: Send + Sync> Sync for UniquePtr<'_, T> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::MutexGuard;
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::Pool;

    assert_impl_all!(UniquePtr<'static, u32>: Send, Sync);
    assert_impl_all!(UniquePtr<'static, Cell<u32>>: Send);
    assert_not_impl_any!(UniquePtr<'static, Cell<u32>>: Sync);
    assert_not_impl_any!(UniquePtr<'static, Rc<u32>>: Send, Sync);

    // A value that may be shared but not moved across threads must not become reachable for
    // pool operations on another thread.
    assert_not_impl_any!(UniquePtr<'static, MutexGuard<'static, u32>>: Send, Sync);

    // Uniqueness is enforced by the type system.
    assert_not_impl_any!(UniquePtr<'static, u32>: Clone, Copy);

    #[test]
    fn drop_releases_slot() {
        let pool = Pool::<u32>::with_capacity(1).unwrap();

        let item = pool.make_unique(1).unwrap();
        assert_eq!(pool.allocated_size(), 1);

        drop(item);
        assert_eq!(pool.allocated_size(), 0);
    }

    #[test]
    fn mutation_through_deref_mut() {
        let pool = Pool::<String>::with_capacity(1).unwrap();

        let mut item = pool.make_unique_default().unwrap();
        item.push_str("abc");
        item.get_mut().unwrap().push('d');

        assert_eq!(item.get().unwrap(), "abcd");
    }

    #[test]
    fn null_pointer_behavior() {
        let mut null = UniquePtr::<u32>::null();

        assert!(null.is_null());
        assert_eq!(null.get(), Err(Error::NullDereference));
        assert_eq!(null.get_mut(), Err(Error::NullDereference));
        assert!(null.handle().is_none());
        assert_eq!(null, UniquePtr::default());
        assert!(null.into_shared().is_null());
    }

    #[test]
    #[should_panic]
    fn deref_null_panics() {
        let null = UniquePtr::<u32>::null();
        let _value: u32 = *null;
    }

    #[test]
    fn take_nulls_source() {
        let pool = Pool::<u32>::with_capacity(1).unwrap();

        let mut source = pool.make_unique(5).unwrap();
        let target = source.take();

        assert!(source.is_null());
        assert_eq!(*target, 5);
        assert_eq!(pool.allocated_size(), 1);

        drop(source);
        assert_eq!(pool.allocated_size(), 1);

        drop(target);
        assert_eq!(pool.allocated_size(), 0);
    }

    #[test]
    fn reset_releases_and_nulls() {
        let pool = Pool::<u32>::with_capacity(1).unwrap();

        let mut item = pool.make_unique(5).unwrap();
        item.reset();

        assert!(item.is_null());
        assert_eq!(pool.free_size(), 1);
    }

    #[test]
    fn into_shared_keeps_value_in_place() {
        let pool = Pool::<u32>::with_capacity(1).unwrap();

        let unique = pool.make_unique(5).unwrap();
        let ptr = unique.handle().unwrap().ptr();

        let shared = unique.into_shared();
        assert_eq!(shared.handle().unwrap().ptr(), ptr);
        assert_eq!(pool.allocated_size(), 1);

        let weak = shared.make_weak();
        drop(shared);

        assert!(weak.expired());
        assert_eq!(pool.allocated_size(), 0);
    }

    #[test]
    fn moves_between_threads() {
        let pool = Pool::<Vec<u32>>::with_capacity(1).unwrap();

        let mut item = pool.make_unique(vec![1]).unwrap();

        thread::scope(|s| {
            s.spawn(|| {
                item.push(2);
            });
        });

        assert_eq!(*item, vec![1, 2]);

        thread::scope(|s| {
            s.spawn(move || drop(item));
        });

        assert_eq!(pool.allocated_size(), 0);
    }
}
