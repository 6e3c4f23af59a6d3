use std::any::type_name;
use std::fmt;
use std::{mem, ptr, thread};

use nm::Event;

use crate::metrics::{CAPACITY_SLOTS, POOL_EXHAUSTED, SLOTS_ALLOCATED, SLOTS_RELEASED};
use crate::slots::SlotArena;
use crate::{
    DropPolicy, Error, Handle, PoolBuilder, Result, SharedPtr, Synchronized, UniquePtr,
};

/// A fixed-capacity, thread-safe object pool.
///
/// The pool owns an array of slots, each able to hold one `T`, which is allocated once when the
/// pool is given a capacity. Values are placed into the slots via one of the `make_*` methods,
/// which return a pointer that decides when the value is removed again:
///
/// * [`make_shared()`][1] returns a reference-counted [`SharedPtr`]. The value is removed when
///   the last clone is dropped. [`WeakPtr`][5]s can observe the value without keeping it alive.
/// * [`make_unique()`][2] returns a [`UniquePtr`] with exclusive ownership and no reference
///   counting overhead. The value is removed when the pointer is dropped.
///
/// The pool never grows. Once all slots are in use, allocations fail with
/// [`Error::PoolExhausted`] until some pointer releases its slot.
///
/// # Thread safety
///
/// The pool can be shared between threads by reference. Slot bookkeeping is guarded by one
/// pool-wide lock; reference counts are guarded by one lock per shared object, so reference
/// count traffic on different objects does not contend.
///
/// # Lifecycle
///
/// Every pointer borrows the pool it came from. [`set()`][3] and [`clear()`][4] take `&mut self`,
/// so the compiler guarantees that no pointers are outstanding when the slots are replaced.
///
/// # Example
///
/// ```rust
/// use fixed_pool::{Error, Pool};
///
/// let pool = Pool::<i32>::with_capacity(2)?;
///
/// let one = pool.make_shared(1)?;
/// let two = pool.make_shared(2)?;
///
/// assert!(matches!(pool.make_shared(3), Err(Error::PoolExhausted { capacity: 2 })));
///
/// drop(two);
/// let three = pool.make_shared(3)?;
///
/// assert_eq!(*one + *three, 4);
/// # Ok::<(), fixed_pool::Error>(())
/// ```
///
/// [1]: Self::make_shared
/// [2]: Self::make_unique
/// [3]: Self::set
/// [4]: Self::clear
/// [5]: crate::WeakPtr
pub struct Pool<T> {
    arena: Synchronized<SlotArena<T>>,

    drop_policy: DropPolicy,
}

impl<T> Pool<T> {
    #[must_use]
    pub(crate) fn new_inner(drop_policy: DropPolicy) -> Self {
        Self {
            arena: Synchronized::new(SlotArena::empty()),
            drop_policy,
        }
    }

    /// Creates a new pool without any slots.
    ///
    /// The pool must be given a capacity via [`set()`][Self::set] before the first allocation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::{Error, Pool};
    ///
    /// let mut pool = Pool::<String>::new();
    /// assert!(!pool.is_initialized());
    /// assert_eq!(pool.make_unique_default().err(), Some(Error::NotInitialized));
    ///
    /// pool.set(8)?;
    /// assert!(pool.is_initialized());
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::new_inner(DropPolicy::default())
    }

    /// Creates a new pool with `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `capacity` is zero or too large to be addressed.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::builder().capacity(capacity).build()
    }

    /// Starts building a new [`Pool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new()
    }

    /// Gives the pool a fixed number of slots.
    ///
    /// If the pool already has slots, they are [cleared][Self::clear] first, dropping any
    /// values still stored in them. If setting up the new slots fails, the pool is left
    /// without any slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `capacity` is zero or too large to be addressed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::{Error, Pool};
    ///
    /// let mut pool = Pool::<u64>::with_capacity(4)?;
    ///
    /// assert!(matches!(pool.set(0), Err(Error::InvalidArgument { .. })));
    /// assert!(!pool.is_initialized());
    ///
    /// pool.set(16)?;
    /// assert_eq!(pool.capacity(), 16);
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    pub fn set(&mut self, capacity: usize) -> Result<()> {
        self.clear();

        *self.arena.get_mut() = SlotArena::with_capacity(capacity)?;

        CAPACITY_SLOTS.with(|e| e.observe(capacity));

        Ok(())
    }

    /// Drops every value still stored in the pool and releases the slots,
    /// leaving the pool uninitialized.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::Pool;
    ///
    /// let mut pool = Pool::<u64>::with_capacity(4)?;
    ///
    /// // Leaked pointers do not prevent clearing; their values are dropped here.
    /// std::mem::forget(pool.make_unique(1)?);
    /// assert_eq!(pool.allocated_size(), 1);
    ///
    /// pool.clear();
    /// assert!(!pool.is_initialized());
    /// assert_eq!(pool.allocated_size(), 0);
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    pub fn clear(&mut self) {
        // Exclusive access to the pool proves that no pointers into it exist anymore,
        // except leaked ones that can never be used again.
        let arena = mem::replace(self.arena.get_mut(), SlotArena::empty());

        #[cfg(debug_assertions)]
        if !thread::panicking() {
            if let Err(error) = arena.check_consistency() {
                panic!("pool of {} is corrupted: {error}", type_name::<T>());
            }
        }

        drop(arena);
    }

    /// Moves `value` into a vacant slot and returns a handle to it.
    ///
    /// The caller becomes responsible for eventually passing the handle to
    /// [`deallocate()`][Self::deallocate].
    pub(crate) fn allocate(&self, value: T) -> Result<Handle<'_, T>> {
        let (index, ptr) = {
            let mut arena = self.arena.write_access();

            if arena.capacity() == 0 {
                // The value is dropped after the lock guard, once we return.
                return Err(Error::NotInitialized);
            }

            arena.check_integrity()?;

            if arena.free_len() == 0 {
                POOL_EXHAUSTED.with(Event::observe_once);

                return Err(Error::PoolExhausted {
                    capacity: arena.capacity(),
                });
            }

            let allocated = arena.insert(value)?;

            arena.check_integrity()?;

            allocated
        };

        SLOTS_ALLOCATED.with(Event::observe_once);

        Ok(Handle::new(ptr, index, self))
    }

    /// Removes the value from the slot identified by `handle` and drops it.
    ///
    /// The value is dropped after the pool lock has been released, so its destructor may itself
    /// use the pool (e.g. release a pointer to another value in the same pool).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if the handle does not refer to an occupied slot of this
    /// pool and [`Error::InvariantViolation`] if the pool bookkeeping is found to be corrupted.
    /// Both indicate a defect, not a user error.
    pub(crate) fn deallocate(&self, handle: Handle<'_, T>) -> Result<()> {
        let value = {
            let mut arena = self.arena.write_access();

            if !ptr::eq(handle.pool(), self) {
                return Err(Error::InvalidIndex {
                    index: handle.index(),
                    capacity: arena.capacity(),
                });
            }

            arena.check_integrity()?;

            let value = arena.remove(handle.index())?;

            arena.check_integrity()?;

            value
        };

        drop(value);

        SLOTS_RELEASED.with(Event::observe_once);

        Ok(())
    }

    /// [`deallocate()`][Self::deallocate] for use in pointer destructors, where errors cannot be
    /// returned. Any error is a defect, so we panic in all build profiles.
    pub(crate) fn release(&self, handle: Handle<'_, T>) {
        if let Err(error) = self.deallocate(handle) {
            panic!(
                "failed to return slot {} to pool of {}: {error}",
                handle.index(),
                type_name::<T>()
            );
        }
    }

    /// Moves `value` into the pool and returns a reference-counted pointer to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the pool has no slots and [`Error::PoolExhausted`]
    /// if all slots are in use. In both cases, `value` is dropped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::Pool;
    ///
    /// let pool = Pool::<String>::with_capacity(4)?;
    ///
    /// let greeting = pool.make_shared("hello".to_string())?;
    /// let also_greeting = greeting.clone();
    ///
    /// assert_eq!(greeting.count(), 2);
    /// assert_eq!(pool.allocated_size(), 1);
    /// assert_eq!(*also_greeting, "hello");
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    pub fn make_shared(&self, value: T) -> Result<SharedPtr<'_, T>> {
        let handle = self.allocate(value)?;

        Ok(SharedPtr::from_handle(handle))
    }

    /// Moves `T::default()` into the pool and returns a reference-counted pointer to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the pool has no slots and [`Error::PoolExhausted`]
    /// if all slots are in use.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::Pool;
    ///
    /// let pool = Pool::<String>::with_capacity(1)?;
    ///
    /// let empty = pool.make_shared_default()?;
    /// assert_eq!(*empty, "");
    /// assert_eq!(empty.count(), 1);
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    pub fn make_shared_default(&self) -> Result<SharedPtr<'_, T>>
    where
        T: Default,
    {
        self.make_shared(T::default())
    }

    /// Moves `value` into the pool and returns an exclusively owning pointer to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the pool has no slots and [`Error::PoolExhausted`]
    /// if all slots are in use. In both cases, `value` is dropped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::Pool;
    ///
    /// let pool = Pool::<Vec<u8>>::with_capacity(4)?;
    ///
    /// let mut buffer = pool.make_unique(Vec::new())?;
    /// buffer.extend_from_slice(b"abc");
    ///
    /// assert_eq!(buffer.len(), 3);
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    pub fn make_unique(&self, value: T) -> Result<UniquePtr<'_, T>> {
        let handle = self.allocate(value)?;

        Ok(UniquePtr::from_handle(handle))
    }

    /// Moves `T::default()` into the pool and returns an exclusively owning pointer to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the pool has no slots and [`Error::PoolExhausted`]
    /// if all slots are in use.
    pub fn make_unique_default(&self) -> Result<UniquePtr<'_, T>>
    where
        T: Default,
    {
        self.make_unique(T::default())
    }

    /// The number of slots that currently hold a value.
    ///
    /// This operation may block if another thread is currently allocating or releasing a slot.
    #[must_use]
    pub fn allocated_size(&self) -> usize {
        self.arena.read_access().allocated_len()
    }

    /// The number of slots that are currently vacant.
    ///
    /// This operation may block if another thread is currently allocating or releasing a slot.
    #[must_use]
    pub fn free_size(&self) -> usize {
        self.arena.read_access().free_len()
    }

    /// The total number of slots, or zero if the pool is not initialized.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arena.read_access().capacity()
    }

    /// Whether the pool has been given a capacity and not cleared since.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.capacity() != 0
    }

    /// The indices of all slots that currently hold a value, in ascending order.
    ///
    /// The result is a snapshot and may be outdated as soon as it is returned if other threads
    /// are using the pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_pool::Pool;
    ///
    /// let pool = Pool::<u8>::with_capacity(3)?;
    ///
    /// let a = pool.make_unique(1)?;
    /// let b = pool.make_unique(2)?;
    /// let c = pool.make_unique(3)?;
    /// drop(b);
    ///
    /// assert_eq!(pool.allocated_indices(), vec![0, 2]);
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    #[must_use]
    pub fn allocated_indices(&self) -> Vec<usize> {
        self.arena.read_access().allocated_indices()
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena.read_access();

        f.debug_struct("Pool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &arena.capacity())
            .field("allocated", &arena.allocated_len())
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        let was_empty = self.arena.get_mut().allocated_len() == 0;

        // Drop any remaining values first and only then check the policy, so the memory is
        // cleaned up even if we are about to panic.
        self.clear();

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a non-empty pool of {} with a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}
