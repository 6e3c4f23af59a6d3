//! Demonstrates observing pooled values with weak pointers from several threads.
//!
//! A set of worker threads keeps a weak pointer to a shared configuration value and upgrades it
//! whenever they need to read it. Once the owner drops the value, the workers notice and stop.
//! At the end, the metrics collected by the pool are printed.

use std::sync::Barrier;
use std::thread;

use fixed_pool::{Error, Pool};
use nm::Report;

#[derive(Debug)]
struct Config {
    name: &'static str,
    worker_limit: usize,
}

const WORKER_COUNT: usize = 4;

fn main() -> Result<(), Error> {
    let pool = Pool::<Config>::with_capacity(2)?;

    let config = pool.make_shared(Config {
        name: "production",
        worker_limit: WORKER_COUNT,
    })?;

    let barrier = Barrier::new(WORKER_COUNT + 1);

    thread::scope(|s| {
        for worker_index in 0..WORKER_COUNT {
            let observer = config.make_weak();
            let barrier = &barrier;

            s.spawn(move || {
                // While the owner still holds the value, every upgrade succeeds.
                let current = observer.lock();
                println!(
                    "Worker {worker_index} sees config '{}' allowing {} workers",
                    current.name, current.worker_limit
                );
                drop(current);

                barrier.wait();
                barrier.wait();

                // The owner has dropped the value in between the two barriers.
                assert!(observer.expired());
                assert!(observer.lock().is_null());

                println!("Worker {worker_index} sees that the config is gone");
            });
        }

        barrier.wait();

        println!(
            "Config has {} shared and {} weak pointers",
            config.count(),
            config.weak_count()
        );

        drop(config);

        println!("Owner dropped the config, {} slots free", pool.free_size());

        barrier.wait();
    });

    let report = Report::collect();
    println!("{report}");

    Ok(())
}
