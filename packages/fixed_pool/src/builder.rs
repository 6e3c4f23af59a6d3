use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{DropPolicy, Pool, Result};

/// Builder for creating an instance of [`Pool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// [`Pool::new()`] and [`Pool::with_capacity()`] are sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use fixed_pool::{DropPolicy, Pool};
///
/// let pool = Pool::<u32>::builder()
///     .capacity(64)
///     .drop_policy(DropPolicy::MayDropItems)
///     .build()?;
///
/// assert_eq!(pool.capacity(), 64);
/// # Ok::<(), fixed_pool::Error>(())
/// ```
#[must_use]
pub struct PoolBuilder<T> {
    capacity: Option<usize>,
    drop_policy: DropPolicy,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for PoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T> PoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: None,
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Sets the number of slots to allocate up front.
    ///
    /// If not set, the pool is built uninitialized and must be given a capacity via
    /// [`Pool::set()`] before the first allocation.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat remaining values in the pool when the pool is dropped.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`][crate::Error::InvalidArgument] if the capacity is
    /// zero or too large to be addressed.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_pool::Pool;
    ///
    /// let pool = Pool::<u32>::builder().build()?;
    /// assert!(!pool.is_initialized());
    ///
    /// assert!(Pool::<u32>::builder().capacity(0).build().is_err());
    /// # Ok::<(), fixed_pool::Error>(())
    /// ```
    pub fn build(self) -> Result<Pool<T>> {
        let mut pool = Pool::new_inner(self.drop_policy);

        if let Some(capacity) = self.capacity {
            pool.set(capacity)?;
        }

        Ok(pool)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn defaults_to_uninitialized() {
        let pool = PoolBuilder::<u32>::new().build().unwrap();

        assert!(!pool.is_initialized());
        assert_eq!(pool.capacity(), 0);
    }

    #[test]
    fn capacity_is_applied() {
        let pool = PoolBuilder::<u32>::new().capacity(8).build().unwrap();

        assert!(pool.is_initialized());
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.free_size(), 8);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = PoolBuilder::<u32>::new().capacity(0).build();

        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn debug_names_item_type() {
        let builder = PoolBuilder::<String>::new().capacity(3);

        let debug = format!("{builder:?}");
        assert!(debug.contains("String"));
        assert!(debug.contains("Some(3)"));
    }
}
