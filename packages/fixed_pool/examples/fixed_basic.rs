//! Basic usage example for `fixed_pool`.
//!
//! This example demonstrates how a pool hands out shared and unique pointers, how it reports
//! exhaustion and how released slots are reused.

use fixed_pool::{Error, Pool};

fn main() -> Result<(), Error> {
    // Create a pool with room for exactly four strings.
    let pool = Pool::<String>::with_capacity(4)?;

    println!("Created pool with capacity: {}", pool.capacity());

    let first = pool.make_shared("first".to_string())?;
    let second = pool.make_shared("second".to_string())?;
    let mut third = pool.make_unique("third".to_string())?;
    let fourth = pool.make_unique_default()?;

    println!("Allocated four items, {} slots free", pool.free_size());

    // Unique pointers grant exclusive access to the value.
    third.push_str(" (modified)");
    println!("Third item is now: {}", *third);

    // The pool never grows.
    match pool.make_shared("fifth".to_string()) {
        Err(Error::PoolExhausted { capacity }) => {
            println!("Pool is exhausted at capacity {capacity}");
        }
        other => panic!("expected the pool to be exhausted, got {other:?}"),
    }

    // Shared pointers can be cloned; the value lives until the last clone is gone.
    let first_copy = first.clone();
    println!(
        "First item has {} shared owners: {}",
        first.count(),
        *first_copy
    );

    let second_index = second.handle().map(|handle| handle.index());
    drop(second);

    println!("Released the second item, {} slots free", pool.free_size());

    // The freed slot is reused by the next allocation.
    let fifth = pool.make_shared("fifth".to_string())?;
    println!(
        "Fifth item reused slot {:?} (second item was in slot {second_index:?})",
        fifth.handle().map(|handle| handle.index())
    );

    println!("Occupied slots: {:?}", pool.allocated_indices());

    drop(first);
    drop(first_copy);
    drop(third);
    drop(fourth);
    drop(fifth);

    println!("All items released, {} slots free", pool.free_size());

    Ok(())
}
