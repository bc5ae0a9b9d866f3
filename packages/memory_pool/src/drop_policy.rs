/// Determines how a [`MemoryPool`][crate::MemoryPool] treats allocations that are still
/// outstanding when the pool is dropped.
///
/// The pool never runs destructors of the values stored in its slots, whatever the policy.
/// Storage of outstanding allocations is always returned to the backing allocator together with
/// the rest of the chunk it belongs to.
///
/// # Examples
///
/// ```
/// use memory_pool::{DropPolicy, MemoryPool};
///
/// let pool = MemoryPool::<u32>::builder()
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// # drop(pool);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Outstanding allocations are silently reclaimed together with their chunks. This is the
    /// default.
    #[default]
    MayDropItems,

    /// The pool will panic if any allocation is still outstanding when the pool is dropped.
    ///
    /// Useful when the slots are known to hold values that need cleanup, so a leftover
    /// allocation indicates a bug in the code that owns those values.
    MustNotDropItems,
}
