use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use foldhash::{HashMap, HashMapExt};

use crate::{DEFAULT_CHUNK_CAPACITY, MemoryPool, Result};

thread_local! {
    static CURRENT: PoolRegistry = PoolRegistry::new();
}

/// Returns the pool that serves values of type `T` on the calling thread.
///
/// The first call for a given `T` on a given thread creates the pool; later calls on the same
/// thread return handles to that same pool. Other threads get their own, independent pools, so
/// no synchronization is ever needed to use the returned pool.
///
/// This is shorthand for `PoolRegistry::current().pool::<T>()`.
///
/// # Example
///
/// ```rust
/// use memory_pool::get_memory_pool;
///
/// let pool = get_memory_pool::<u64>();
/// let slot = pool.allocate();
///
/// // Every call on this thread resolves to the same pool.
/// assert!(get_memory_pool::<u64>().owns(slot));
///
/// // SAFETY: From this pool, not used again.
/// unsafe {
///     pool.deallocate(slot);
/// }
/// ```
///
/// # Panics
///
/// Panics if called while the thread-local storage of the calling thread is being destroyed.
#[must_use]
pub fn get_memory_pool<T>() -> LocalMemoryPool<T>
where
    T: 'static,
{
    PoolRegistry::current().pool::<T>()
}

/// Maps element types to memory pools, creating each pool on first use.
///
/// A registry is bound to the thread that created it (it is neither [`Send`] nor [`Sync`]) and
/// every pool in it is therefore used by a single thread only. Each thread has its own
/// registry, available via [`PoolRegistry::current()`] and torn down together with the thread.
/// Separate registries can be created with [`PoolRegistry::new()`] when isolation from the
/// rest of the thread is desired, e.g. in tests.
///
/// The registry is a cheaply cloneable handle - all clones refer to the same set of pools.
///
/// A pool stays alive for as long as the registry or any [`LocalMemoryPool`] handle to it
/// exists, so memory handed out by a pool never disappears under a handle that is still in use.
///
/// # Example
///
/// ```rust
/// use memory_pool::PoolRegistry;
///
/// let registry = PoolRegistry::new();
///
/// let numbers = registry.pool::<u64>();
/// let same_numbers = registry.pool::<u64>();
/// let names = registry.pool::<String>();
///
/// assert!(numbers.ptr_eq(&same_numbers));
/// assert_eq!(registry.len(), 2);
/// # drop(names);
/// ```
#[derive(Clone, Default)]
pub struct PoolRegistry {
    /// Keyed by the `TypeId` of the pool type, so pools of the same element type with different
    /// chunk capacities are separate entries. Each value is an `Rc<RefCell<MemoryPool<..>>>`.
    pools: Rc<RefCell<HashMap<TypeId, Rc<dyn Any>>>>,
}

impl PoolRegistry {
    /// Creates a new empty registry, independent of the registry of the current thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Returns the registry of the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if called while the thread-local storage of the calling thread is being destroyed.
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(Self::clone)
    }

    /// Returns the pool for values of type `T` with the default chunk capacity, creating it if
    /// this is the first request for it.
    #[must_use]
    pub fn pool<T>(&self) -> LocalMemoryPool<T>
    where
        T: 'static,
    {
        self.pool_with_capacity::<T, DEFAULT_CHUNK_CAPACITY>()
    }

    /// Returns the pool for values of type `T` with chunks of `N` slots, creating it if this is
    /// the first request for it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use memory_pool::PoolRegistry;
    ///
    /// let registry = PoolRegistry::new();
    ///
    /// let small_chunks = registry.pool_with_capacity::<u32, 8>();
    /// let slot = small_chunks.allocate();
    /// assert_eq!(small_chunks.capacity(), 8);
    /// # // SAFETY: From this pool, not used again.
    /// # unsafe { small_chunks.deallocate(slot) };
    /// ```
    #[must_use]
    pub fn pool_with_capacity<T, const N: usize>(&self) -> LocalMemoryPool<T, N>
    where
        T: 'static,
    {
        let entry = Rc::clone(
            self.pools
                .borrow_mut()
                .entry(TypeId::of::<MemoryPool<T, N>>())
                .or_insert_with(Self::new_entry::<T, N>),
        );

        let inner = entry
            .downcast::<RefCell<MemoryPool<T, N>>>()
            .expect("registry entries are keyed by the type of the pool they hold");

        LocalMemoryPool { inner }
    }

    fn new_entry<T, const N: usize>() -> Rc<dyn Any>
    where
        T: 'static,
    {
        Rc::new(RefCell::new(MemoryPool::<T, N>::new()))
    }

    /// The number of pools created through this registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.borrow().len()
    }

    /// Whether no pool has been created through this registry yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.borrow().is_empty()
    }

    /// Whether two handles refer to the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.pools, &other.pools)
    }
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.pools.try_borrow().map(|pools| pools.len()))
            .finish()
    }
}

/// A handle to a [`MemoryPool`] shared by all users of one element type on one thread.
///
/// Obtained from [`get_memory_pool()`] or a [`PoolRegistry`]. All clones of the handle refer to
/// the same pool. The handle is neither [`Send`] nor [`Sync`], as the pool must only be used by
/// the thread that owns it.
///
/// # Example
///
/// ```rust
/// use memory_pool::{LocalMemoryPool, MemoryPool};
///
/// let pool = LocalMemoryPool::from(MemoryPool::<u64, 4>::new());
/// let pool_clone = pool.clone();
///
/// let slot = pool.allocate();
/// assert_eq!(pool_clone.len(), 1);
///
/// // SAFETY: From this pool, not used again.
/// unsafe {
///     pool_clone.deallocate(slot);
/// }
/// assert!(pool.is_empty());
/// ```
pub struct LocalMemoryPool<T, const N: usize = DEFAULT_CHUNK_CAPACITY> {
    inner: Rc<RefCell<MemoryPool<T, N>>>,
}

impl<T, const N: usize> From<MemoryPool<T, N>> for LocalMemoryPool<T, N> {
    /// Wraps an existing pool for shared single-threaded use. The pool is not registered in
    /// any registry.
    fn from(pool: MemoryPool<T, N>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(pool)),
        }
    }
}

impl<T, const N: usize> LocalMemoryPool<T, N> {
    /// Takes a slot from the pool. See [`MemoryPool::allocate()`].
    #[must_use]
    pub fn allocate(&self) -> NonNull<T> {
        self.inner.borrow_mut().allocate()
    }

    /// Takes a slot from the pool. See [`MemoryPool::try_allocate()`].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::StorageExhausted`][crate::PoolError::StorageExhausted] if the pool
    /// had to grow and no storage was available.
    pub fn try_allocate(&self) -> Result<NonNull<T>> {
        self.inner.borrow_mut().try_allocate()
    }

    /// Returns a slot to the pool. See [`MemoryPool::deallocate()`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by an allocation from this same pool (through any handle)
    /// and must not have been deallocated since. The slot must not be accessed afterwards.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>) {
        // SAFETY: Forwarding the caller's guarantees.
        unsafe {
            self.inner.borrow_mut().deallocate(ptr);
        }
    }

    /// The number of slots handed out and not yet returned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Whether every slot handed out has been returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// The number of slots in all chunks of the pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity()
    }

    /// The number of chunks the pool has allocated.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.inner.borrow().chunk_count()
    }

    /// Whether `ptr` is the address of a slot owned by the pool.
    #[must_use]
    pub fn owns(&self, ptr: NonNull<T>) -> bool {
        self.inner.borrow().owns(ptr)
    }

    /// Whether two handles refer to the same pool.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T, const N: usize> Clone for LocalMemoryPool<T, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, const N: usize> fmt::Debug for LocalMemoryPool<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMemoryPool")
            .field("inner", &self.inner)
            .finish()
    }
}
