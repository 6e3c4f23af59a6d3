#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity, thread-safe object pool with shared, unique and weak pointers into its slots.
//!
//! This crate provides [`Pool<T>`], which reserves storage for a fixed number of `T` values up
//! front and hands out pointers to values placed in that storage. Allocating from the pool never
//! touches the global allocator for the value itself, and the number of live values can never
//! exceed the configured capacity.
//!
//! # Key Features
//!
//! - **Fixed capacity**: Storage for all slots is reserved when the capacity is set
//! - **Three pointer types**: [`SharedPtr<T>`] (reference counted), [`UniquePtr<T>`]
//!   (exclusively owned) and [`WeakPtr<T>`] (non-owning observer)
//! - **Thread safety**: All pool operations and all pointer operations may be used from any
//!   thread, guarded by reader-writer locks
//! - **Prompt reuse**: A value is dropped and its slot becomes free the moment its last owning
//!   pointer goes away, even if weak pointers remain
//! - **Lifetime-checked**: Pointers borrow the pool, so the pool cannot be dropped, resized or
//!   cleared while any pointer into it exists
//! - **Flexible drop policies**: Configure behavior when the pool is dropped with values still
//!   in it
//!
//! # Pointer Types
//!
//! ## [`SharedPtr<T>`] - Shared Ownership
//!
//! - Cloning increments a reference count kept in a separately allocated control block
//! - The value is dropped when the last clone is dropped
//! - Implements [`std::ops::Deref`] for shared access to the value
//!
//! ## [`UniquePtr<T>`] - Exclusive Ownership
//!
//! - Cannot be cloned, only moved
//! - No control block and no reference counting
//! - Implements [`std::ops::Deref`] and [`std::ops::DerefMut`]
//! - Can be converted to a [`SharedPtr<T>`] via [`into_shared()`](UniquePtr::into_shared)
//!
//! ## [`WeakPtr<T>`] - Observation
//!
//! - Created from a [`SharedPtr<T>`] via [`make_weak()`](SharedPtr::make_weak)
//! - Does not keep the value alive
//! - Upgraded to a [`SharedPtr<T>`] via [`lock()`](WeakPtr::lock), which yields a null pointer
//!   once the value is gone
//!
//! All three pointer types may be null. Dereferencing a null pointer via `get()` returns
//! [`Error::NullDereference`], while dereferencing it via [`std::ops::Deref`] panics.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```rust
//! use fixed_pool::Pool;
//!
//! let pool = Pool::<String>::with_capacity(4)?;
//!
//! let greeting = pool.make_shared("Hello".to_string())?;
//! let another = greeting.clone();
//!
//! assert_eq!(*another, "Hello");
//! assert_eq!(greeting.count(), 2);
//! assert_eq!(pool.allocated_size(), 1);
//! assert_eq!(pool.free_size(), 3);
//!
//! drop(greeting);
//! drop(another);
//!
//! assert_eq!(pool.allocated_size(), 0);
//! # Ok::<(), fixed_pool::Error>(())
//! ```
//!
//! ## Exhaustion
//!
//! ```rust
//! use fixed_pool::{Error, Pool};
//!
//! let pool = Pool::<u64>::with_capacity(2)?;
//!
//! let first = pool.make_unique(1)?;
//! let _second = pool.make_unique(2)?;
//!
//! assert_eq!(
//!     pool.make_unique(3).unwrap_err(),
//!     Error::PoolExhausted { capacity: 2 }
//! );
//!
//! // Releasing any pointer makes room again.
//! drop(first);
//! let _third = pool.make_unique(3)?;
//! # Ok::<(), fixed_pool::Error>(())
//! ```
//!
//! ## Sharing Across Threads
//!
//! ```rust
//! use std::thread;
//!
//! use fixed_pool::Pool;
//!
//! let pool = Pool::<u64>::with_capacity(8)?;
//! let value = pool.make_shared(42)?;
//!
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         let value = value.clone();
//!
//!         s.spawn(move || {
//!             assert_eq!(*value, 42);
//!         });
//!     }
//! });
//!
//! assert_eq!(value.count(), 1);
//! # Ok::<(), fixed_pool::Error>(())
//! ```
//!
//! ## Deferred Initialization
//!
//! A pool may also be created without capacity and configured later. Setting the capacity
//! requires exclusive access to the pool, which guarantees no pointers into it exist.
//!
//! ```rust
//! use fixed_pool::{Error, Pool};
//!
//! let mut pool = Pool::<u32>::new();
//! assert!(!pool.is_initialized());
//! assert_eq!(pool.make_unique(1).unwrap_err(), Error::NotInitialized);
//!
//! pool.set(16)?;
//! assert_eq!(pool.capacity(), 16);
//!
//! let item = pool.make_unique(1)?;
//! assert_eq!(*item, 1);
//! # Ok::<(), fixed_pool::Error>(())
//! ```
//!
//! # Observability
//!
//! The pool reports slot and control block activity via [`nm`] events, which can be collected
//! with `nm::Report::collect()`.

mod builder;
mod control_block;
mod drop_policy;
mod error;
mod handle;
mod metrics;
mod pool;
mod shared;
mod slots;
mod synchronized;
mod unique;
mod weak;

pub use builder::PoolBuilder;
pub use drop_policy::DropPolicy;
pub use error::{Error, Result};
pub use handle::Handle;
pub use pool::Pool;
pub use shared::SharedPtr;
pub use synchronized::{ReadAccess, Synchronized, WriteAccess};
pub use unique::UniquePtr;
pub use weak::WeakPtr;
