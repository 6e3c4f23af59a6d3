use nm::{Event, Magnitude};

const CAPACITY_SLOTS_BUCKETS: &[Magnitude] = &[1, 16, 128, 1024, 16_384, 131_072, 1_048_576];

thread_local! {
    pub(crate) static SLOTS_ALLOCATED: Event = Event::builder()
        .name("fixed_pool_slots_allocated")
        .build();

    pub(crate) static SLOTS_RELEASED: Event = Event::builder()
        .name("fixed_pool_slots_released")
        .build();

    pub(crate) static POOL_EXHAUSTED: Event = Event::builder()
        .name("fixed_pool_exhausted")
        .build();

    pub(crate) static CAPACITY_SLOTS: Event = Event::builder()
        .name("fixed_pool_capacity_slots")
        .histogram(CAPACITY_SLOTS_BUCKETS)
        .build();

    pub(crate) static CONTROL_BLOCKS_CREATED: Event = Event::builder()
        .name("fixed_pool_control_blocks_created")
        .build();

    pub(crate) static CONTROL_BLOCKS_RELEASED: Event = Event::builder()
        .name("fixed_pool_control_blocks_released")
        .build();
}
