//! Metrics published by the pools of the calling thread. Collect them with
//! [`nm::Report::collect()`].

use nm::Event;

thread_local! {
    /// Observed once per chunk added to any pool, with the chunk size in bytes as magnitude.
    pub(crate) static CHUNKS_ALLOCATED_BYTES: Event = Event::builder()
        .name("memory_pool_chunks_allocated_bytes")
        .build();

    /// Observed whenever the backing allocator refuses to provide a chunk.
    pub(crate) static CHUNK_ALLOCATION_FAILURES: Event = Event::builder()
        .name("memory_pool_chunk_allocation_failures")
        .build();
}
