/// Determines what happens to values still stored in a [`Pool`][crate::Pool] when the pool
/// is dropped.
///
/// Every pointer borrows the pool it came from, so a pool can only be dropped while it still
/// holds values if pointers to them were leaked (e.g. via [`std::mem::forget()`]).
///
/// By default, the pool will drop its remaining values when it is dropped.
///
/// # Examples
///
/// ```
/// use fixed_pool::{DropPolicy, Pool};
///
/// let pool = Pool::<u32>::builder()
///     .capacity(16)
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build()?;
/// # Ok::<(), fixed_pool::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool will drop its remaining values when it is dropped. This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if it still contains values when it is dropped.
    ///
    /// This may be valuable if pointers are deliberately leaked and the values are expected
    /// to have been released through other means before the pool goes away.
    MustNotDropItems,
}
