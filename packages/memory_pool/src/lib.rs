#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-size object pool that hands out and takes back storage for single values of one type
//! faster than a general-purpose allocator.
//!
//! Storage is obtained in chunks of many slots at once and free slots are kept on an intrusive
//! free list, so both allocation and deallocation are O(1) and touch the backing allocator only
//! when a new chunk is needed. This suits code that creates and destroys many short-lived
//! values of one type, such as the nodes of a linked data structure.
//!
//! This crate provides:
//!
//! * [`MemoryPool`] - the pool itself, with [`allocate()`][MemoryPool::allocate] and
//!   [`deallocate()`][MemoryPool::deallocate] operating on raw, uninitialized slots.
//! * [`get_memory_pool()`] and [`PoolRegistry`] - one pool per element type per thread,
//!   created on first use. Pools are never shared between threads, so they need no
//!   synchronization.
//! * [`PooledAllocator`] - an [`allocator_api2::alloc::Allocator`] for generic containers that
//!   serves single-element requests from the thread's pool and forwards everything else to a
//!   fallback allocator.
//!
//! The pool manages storage, not values: it never constructs or drops a `T`.
//!
//! # Examples
//!
//! ## Using a pool directly
//!
//! ```rust
//! use memory_pool::MemoryPool;
//!
//! let mut pool = MemoryPool::<String>::new();
//!
//! let slot = pool.allocate();
//!
//! // SAFETY: The slot is sized and aligned for a String and is ours until deallocated.
//! unsafe {
//!     slot.write("Hello".to_string());
//!     assert_eq!(slot.as_ref(), "Hello");
//!
//!     // The pool does not drop values for us.
//!     slot.drop_in_place();
//!
//!     pool.deallocate(slot);
//! }
//! ```
//!
//! ## Pooled storage for a container
//!
//! ```rust
//! use allocator_api2::boxed::Box;
//! use memory_pool::PooledAllocator;
//!
//! struct Node {
//!     value: u64,
//!     next: Option<Box<Node, PooledAllocator<Node>>>,
//! }
//!
//! let allocator = PooledAllocator::<Node>::new();
//!
//! let mut head: Option<Box<Node, PooledAllocator<Node>>> = None;
//! for value in 0..100 {
//!     head = Some(Box::new_in(Node { value, next: head }, allocator.clone()));
//! }
//!
//! // Every node lives in a slot of the pool of this thread.
//! assert_eq!(allocator.pool().len(), 100);
//! assert_eq!(head.as_ref().map(|node| node.value), Some(99));
//! ```
//!
//! # Metrics
//!
//! Growth of the pools on a thread is reported through [`nm`] events named
//! `memory_pool_chunks_allocated_bytes` and `memory_pool_chunk_allocation_failures`.

mod builder;
mod chunk;
mod drop_policy;
mod error;
mod metrics;
mod pool;
mod pooled_allocator;
mod registry;
mod slot;

pub use builder::*;
pub(crate) use chunk::*;
pub use chunk::DEFAULT_CHUNK_CAPACITY;
pub use drop_policy::*;
pub use error::*;
pub(crate) use metrics::*;
pub use pool::MemoryPool;
pub use pooled_allocator::PooledAllocator;
pub use registry::{LocalMemoryPool, PoolRegistry, get_memory_pool};
pub(crate) use slot::*;
