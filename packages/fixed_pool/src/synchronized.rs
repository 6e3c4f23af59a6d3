use std::fmt;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Exclusive view of the value inside a [`Synchronized`]. The lock is released when the
/// view is dropped.
pub type WriteAccess<'a, T> = RwLockWriteGuard<'a, T>;

/// Shared read-only view of the value inside a [`Synchronized`]. The lock is released when
/// the view is dropped. Any number of read views may exist at the same time, as long as no
/// write view exists.
pub type ReadAccess<'a, T> = RwLockReadGuard<'a, T>;

/// Wraps a value so that every access to it goes through a reader-writer lock.
///
/// The pool uses one instance to guard its slot bookkeeping and one instance per
/// control block to guard the reference counts of each pooled object.
///
/// # Example
///
/// ```rust
/// use fixed_pool::Synchronized;
///
/// let counter = Synchronized::new(0_u32);
///
/// *counter.write_access() += 1;
///
/// assert_eq!(*counter.read_access(), 1);
/// ```
pub struct Synchronized<T> {
    lock: RwLock<T>,
}

impl<T> Synchronized<T> {
    /// Wraps `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            lock: RwLock::new(value),
        }
    }

    /// Blocks until exclusive access to the value is available.
    pub fn write_access(&self) -> WriteAccess<'_, T> {
        self.lock.write()
    }

    /// Blocks until shared access to the value is available.
    pub fn read_access(&self) -> ReadAccess<'_, T> {
        self.lock.read()
    }

    /// Returns exclusive access to the value if it is available right now,
    /// otherwise `None`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::Synchronized;
    ///
    /// let value = Synchronized::new("hello");
    ///
    /// let reader = value.read_access();
    /// assert!(value.try_write_access().is_none());
    ///
    /// drop(reader);
    /// assert!(value.try_write_access().is_some());
    /// ```
    pub fn try_write_access(&self) -> Option<WriteAccess<'_, T>> {
        self.lock.try_write()
    }

    /// Returns shared access to the value if it is available right now, otherwise `None`.
    pub fn try_read_access(&self) -> Option<ReadAccess<'_, T>> {
        self.lock.try_read()
    }

    /// Accesses the value through an exclusive reference to the wrapper, which proves that
    /// no other access can exist, so no locking is needed.
    pub fn get_mut(&mut self) -> &mut T {
        self.lock.get_mut()
    }

    /// Unwraps the value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.lock.into_inner()
    }
}

impl<T: Default> Default for Synchronized<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Synchronized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never block inside Debug - a debugger or panic handler may call us while
        // the lock is held by the same thread.
        match self.try_read_access() {
            Some(value) => f
                .debug_struct("Synchronized")
                .field("value", &*value)
                .finish(),
            None => f
                .debug_struct("Synchronized")
                .field("value", &format_args!("<locked>"))
                .finish(),
        }
    }
}
