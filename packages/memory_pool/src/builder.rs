use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use allocator_api2::alloc::{Allocator, Global};

use crate::{DropPolicy, MemoryPool};

/// Builder for creating an instance of [`MemoryPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`MemoryPool::new()`][1] is sufficient for most use cases.
///
/// The chunk capacity is part of the pool type and is chosen via the `N` parameter of
/// [`MemoryPool`], not via the builder.
///
/// # Examples
///
/// ```
/// use memory_pool::{DropPolicy, MemoryPool};
///
/// let pool = MemoryPool::<u32, 16>::builder()
///     .drop_policy(DropPolicy::MayDropItems)
///     .build();
///
/// assert_eq!(pool.capacity(), 0);
/// ```
///
/// [1]: MemoryPool::new
#[must_use]
pub struct MemoryPoolBuilder<T, const N: usize, A = Global> {
    drop_policy: DropPolicy,

    backing: A,

    _item: PhantomData<T>,
}

impl<T, const N: usize, A> fmt::Debug for MemoryPoolBuilder<T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("chunk_capacity", &N)
            .field("backing", &format_args!("{}", type_name::<A>()))
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T, const N: usize> MemoryPoolBuilder<T, N, Global> {
    pub(crate) fn new() -> Self {
        Self {
            drop_policy: DropPolicy::default(),
            backing: Global,
            _item: PhantomData,
        }
    }
}

impl<T, const N: usize, A> MemoryPoolBuilder<T, N, A>
where
    A: Allocator,
{
    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to treat allocations
    /// that are still outstanding when the pool is dropped.
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
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Sets the allocator that chunk storage is obtained from and returned to.
    ///
    /// # Examples
    ///
    /// ```
    /// use allocator_api2::alloc::Global;
    /// use memory_pool::MemoryPool;
    ///
    /// let pool = MemoryPool::<u64>::builder().backing(Global).build();
    /// # drop(pool);
    /// ```
    pub fn backing<B>(self, backing: B) -> MemoryPoolBuilder<T, N, B>
    where
        B: Allocator,
    {
        MemoryPoolBuilder {
            drop_policy: self.drop_policy,
            backing,
            _item: PhantomData,
        }
    }

    /// Builds the memory pool with the specified configuration.
    ///
    /// No storage is allocated until the first call to `allocate()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use memory_pool::MemoryPool;
    ///
    /// let pool = MemoryPool::<u32>::builder().build();
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn build(self) -> MemoryPool<T, N, A> {
        MemoryPool::new_inner(self.drop_policy, self.backing)
    }
}
