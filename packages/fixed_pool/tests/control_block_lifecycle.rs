//! Control block lifecycle tests for the `fixed_pool` package.
//!
//! These tests count control block creation and release via the `nm` events the pool records.
//! The report merges observations from every thread in the process, so all scenarios run
//! sequentially inside a single test, which keeps other tests from disturbing the counts.

use std::panic::{self, AssertUnwindSafe};

use fixed_pool::Pool;
use nm::{EventMetrics, Report};

const BLOCKS_CREATED: &str = "fixed_pool_control_blocks_created";
const BLOCKS_RELEASED: &str = "fixed_pool_control_blocks_released";

/// Number of control blocks created and released so far.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct BlockCounts {
    created: u64,
    released: u64,
}

impl BlockCounts {
    fn collect() -> Self {
        let report = Report::collect();

        let count_of = |name: &str| {
            report
                .events()
                .find(|event| event.name() == name)
                .map_or(0, EventMetrics::count)
        };

        Self {
            created: count_of(BLOCKS_CREATED),
            released: count_of(BLOCKS_RELEASED),
        }
    }

    fn since(baseline: Self) -> Self {
        let now = Self::collect();

        Self {
            created: now
                .created
                .checked_sub(baseline.created)
                .expect("event counts never decrease"),
            released: now
                .released
                .checked_sub(baseline.released)
                .expect("event counts never decrease"),
        }
    }
}

struct PanicsOnDrop;

impl Drop for PanicsOnDrop {
    fn drop(&mut self) {
        panic!("value destructor failed");
    }
}

fn last_shared_without_weak_releases_block() {
    let pool = Pool::<String>::with_capacity(1).unwrap();
    let baseline = BlockCounts::collect();

    let first = pool.make_shared("value".to_string()).unwrap();
    let second = first.clone();

    assert_eq!(
        BlockCounts::since(baseline),
        BlockCounts {
            created: 1,
            released: 0
        }
    );

    drop(first);
    assert_eq!(BlockCounts::since(baseline).released, 0);

    drop(second);
    assert_eq!(
        BlockCounts::since(baseline),
        BlockCounts {
            created: 1,
            released: 1
        }
    );
}

fn weak_outliving_shared_keeps_block_until_last_weak() {
    let pool = Pool::<String>::with_capacity(1).unwrap();
    let baseline = BlockCounts::collect();

    let strong = pool.make_shared("value".to_string()).unwrap();
    let weak_a = strong.make_weak();
    let weak_b = weak_a.clone();

    drop(strong);

    // The value is gone but the weak pointers still use the block.
    assert_eq!(pool.allocated_size(), 0);
    assert!(weak_a.lock().is_null());
    assert_eq!(BlockCounts::since(baseline).released, 0);

    drop(weak_a);
    assert_eq!(BlockCounts::since(baseline).released, 0);

    drop(weak_b);
    assert_eq!(
        BlockCounts::since(baseline),
        BlockCounts {
            created: 1,
            released: 1
        }
    );
}

fn weak_dropped_before_shared_releases_block_once() {
    let pool = Pool::<u32>::with_capacity(1).unwrap();
    let baseline = BlockCounts::collect();

    let strong = pool.make_shared(1).unwrap();
    let weak = strong.make_weak();

    drop(weak);
    assert_eq!(BlockCounts::since(baseline).released, 0);

    drop(strong);
    assert_eq!(
        BlockCounts::since(baseline),
        BlockCounts {
            created: 1,
            released: 1
        }
    );
}

fn unique_pointers_use_no_block_until_shared() {
    let pool = Pool::<u32>::with_capacity(2).unwrap();
    let baseline = BlockCounts::collect();

    let plain = pool.make_unique(1).unwrap();
    let promoted = pool.make_unique(2).unwrap();
    assert_eq!(BlockCounts::since(baseline).created, 0);

    let shared = promoted.into_shared();
    assert_eq!(BlockCounts::since(baseline).created, 1);

    drop(plain);
    drop(shared);
    assert_eq!(
        BlockCounts::since(baseline),
        BlockCounts {
            created: 1,
            released: 1
        }
    );
}

fn panicking_value_destructor_does_not_leak_block() {
    let pool = Pool::<PanicsOnDrop>::with_capacity(1).unwrap();
    let baseline = BlockCounts::collect();

    let item = pool.make_shared(PanicsOnDrop).unwrap();

    let result = panic::catch_unwind(AssertUnwindSafe(|| drop(item)));
    assert!(result.is_err());

    assert_eq!(
        BlockCounts::since(baseline),
        BlockCounts {
            created: 1,
            released: 1
        }
    );

    // The slot was returned before the destructor ran.
    assert_eq!(pool.allocated_size(), 0);
}

#[test]
fn control_blocks_are_released_exactly_once() {
    last_shared_without_weak_releases_block();
    weak_outliving_shared_keeps_block_until_last_weak();
    weak_dropped_before_shared_releases_block_once();
    unique_pointers_use_no_block_until_shared();
    panicking_value_destructor_does_not_leak_block();
}
