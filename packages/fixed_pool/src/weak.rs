use std::fmt;
use std::mem;

use crate::SharedPtr;
use crate::handle::CountedHandle;

/// A non-owning observer of a value held by [`SharedPtr`]s.
///
/// A weak pointer keeps the control block of the value alive, so it can always tell whether
/// the value still exists, but it does not keep the value itself alive. Once the last
/// [`SharedPtr`] goes away, the value is dropped and its slot returned to the pool even if weak
/// pointers remain.
///
/// To access the value, upgrade the weak pointer via [`lock()`][Self::lock].
///
/// # Example
///
/// ```rust
/// use fixed_pool::Pool;
///
/// let pool = Pool::<u32>::with_capacity(2)?;
///
/// let strong = pool.make_shared(10)?;
/// let weak = strong.make_weak();
///
/// {
///     let upgraded = weak.lock();
///     assert_eq!(*upgraded, 10);
///     assert_eq!(strong.count(), 2);
/// }
///
/// drop(strong);
///
/// assert!(weak.expired());
/// assert!(weak.lock().is_null());
/// # Ok::<(), fixed_pool::Error>(())
/// ```
///
/// # Thread safety
///
/// This type is thread-safe ([`Send`] + [`Sync`]) if `T` is both [`Send`] and [`Sync`], as it
/// can be upgraded into a [`SharedPtr`] on any thread.
pub struct WeakPtr<'p, T> {
    inner: Option<CountedHandle<'p, T>>,
}

impl<'p, T> WeakPtr<'p, T> {
    /// A pointer that observes nothing. It is always expired.
    #[must_use]
    pub const fn null() -> Self {
        Self { inner: None }
    }

    /// # Safety
    ///
    /// The caller must transfer ownership of one weak unit of `counted.block` to the new
    /// pointer.
    #[must_use]
    pub(crate) unsafe fn adopt(counted: CountedHandle<'p, T>) -> Self {
        Self {
            inner: Some(counted),
        }
    }

    /// Whether this pointer observes nothing at all.
    ///
    /// A weak pointer whose value is gone is not null, only [expired][Self::expired].
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Attempts to obtain a [`SharedPtr`] to the observed value.
    ///
    /// Returns a null [`SharedPtr`] if the value has already been dropped or if this pointer
    /// is null. The check and the count increment are a single atomic step, so a non-null
    /// result always points to a live value even if other threads drop their shared pointers
    /// concurrently.
    #[must_use]
    pub fn lock(&self) -> SharedPtr<'p, T> {
        let Some(counted) = self.inner else {
            return SharedPtr::null();
        };

        // SAFETY: We own a weak unit of the block.
        if unsafe { counted.block.try_acquire_shared() } {
            // SAFETY: The shared unit we just acquired is handed over to the new pointer.
            unsafe { SharedPtr::adopt(counted) }
        } else {
            SharedPtr::null()
        }
    }

    /// Whether the observed value has been dropped. A null pointer is always expired.
    ///
    /// A `false` result is only a snapshot: another thread may drop the last shared pointer
    /// right after. Use [`lock()`][Self::lock] to get guaranteed access.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.count() == 0
    }

    /// The number of [`SharedPtr`]s keeping the observed value alive. Zero if null.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.map_or(0, |counted| {
            // SAFETY: We own a weak unit of the block.
            unsafe { counted.block.shared_count() }
        })
    }

    /// The number of weak pointers observing the value, including this one. Zero if null.
    #[must_use]
    pub fn weak_count(&self) -> usize {
        self.inner.map_or(0, |counted| {
            // SAFETY: We own a weak unit of the block.
            unsafe { counted.block.weak_count() }
        })
    }

    /// Stops observing the value and makes this pointer null.
    pub fn reset(&mut self) {
        if let Some(counted) = self.inner.take() {
            // SAFETY: We owned a weak unit and just gave up our only way to use it.
            unsafe {
                counted.block.release_weak();
            }
        }
    }

    /// Moves the pointer out, leaving a null pointer in its place. No counts change.
    #[must_use]
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }
}

impl<T> Clone for WeakPtr<'_, T> {
    fn clone(&self) -> Self {
        if let Some(counted) = self.inner {
            // SAFETY: We own a weak unit of the block. The new weak unit is handed over to
            // the new pointer below.
            unsafe {
                counted.block.acquire_weak();
            }
        }

        Self { inner: self.inner }
    }
}

impl<T> Drop for WeakPtr<'_, T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T> Default for WeakPtr<'_, T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> PartialEq for WeakPtr<'_, T> {
    /// Weak pointers are equal if they observe the same value (even after it has been
    /// dropped), or are both null.
    fn eq(&self, other: &Self) -> bool {
        self.inner.map(|counted| counted.block) == other.inner.map(|counted| counted.block)
    }
}

impl<T> Eq for WeakPtr<'_, T> {}

impl<T> fmt::Debug for WeakPtr<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPtr")
            .field("handle", &self.inner.map(|counted| counted.handle))
            .field("count", &self.count())
            .field("weak_count", &self.weak_count())
            .finish()
    }
}

// SAFETY: A weak pointer can be upgraded into a `SharedPtr` on any thread, so the same
// requirements apply.
unsafe impl<T: Send + Sync> Send for WeakPtr<'_, T> {}

// SAFETY: See `Send` above.
unsafe impl<T: Send + Sync> Sync for WeakPtr<'_, T> {}
