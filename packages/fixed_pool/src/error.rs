use thiserror::Error;

/// Errors that can occur when configuring a [`Pool`][crate::Pool] or accessing its items.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// An allocation was attempted on a pool that has not been given a capacity yet,
    /// or has been cleared since.
    #[error("the pool has not been initialized with a capacity")]
    NotInitialized,

    /// Every slot of the pool is in use. The pool never grows on its own, so the caller
    /// must either release some items or set up a larger pool.
    #[error("all {capacity} slots of the pool are in use")]
    PoolExhausted {
        /// The fixed capacity of the pool that ran out of slots.
        capacity: usize,
    },

    /// The caller provided an argument that the pool cannot accept.
    #[error("invalid argument: {problem}")]
    InvalidArgument {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// A null pointer was dereferenced.
    #[error("attempted to dereference a null pointer")]
    NullDereference,

    /// A handle referenced a slot that is out of bounds or not currently allocated.
    ///
    /// This indicates a defect in the pool or in code that forged a handle.
    #[error("slot {index} is not an allocated slot of a pool with capacity {capacity}")]
    InvalidIndex {
        /// The offending slot index.
        index: usize,

        /// The capacity of the pool at the time of the failed operation.
        capacity: usize,
    },

    /// The pool bookkeeping no longer adds up. This indicates a defect in the pool, not a
    /// user error.
    #[error(
        "pool bookkeeping is corrupted: {free} free + {allocated} allocated slots != capacity {capacity}"
    )]
    InvariantViolation {
        /// Number of indices on the free stack.
        free: usize,

        /// Number of indices in the allocated set.
        allocated: usize,

        /// The capacity the two numbers are expected to add up to.
        capacity: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
