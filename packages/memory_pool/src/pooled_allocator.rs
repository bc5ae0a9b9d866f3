use std::alloc::Layout;
use std::any::type_name;
use std::fmt;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator, Global};

use crate::{LocalMemoryPool, PoolRegistry};

/// An allocator for generic containers that serves single-element requests for `T` from the
/// memory pool of the current thread and everything else from a fallback allocator `F`.
///
/// Node-based containers (linked lists, trees, boxed values) allocate one element at a time
/// and therefore get all their storage from the pool. Array requests (e.g. a `Vec` buffer of
/// more than one element) cannot be carved out of fixed-size slots and go to `F` instead.
///
/// The allocator can be used in two ways:
///
/// * Through the typed methods [`allocate()`][1] and [`deallocate()`][2], which take an
///   element count. A count of one is served by the pool.
/// * Through the [`Allocator`] trait, which containers from `allocator-api2` (and crates built
///   on it) accept. A layout that fits exactly one non-zero-sized `T` is served by the pool.
///
/// # Equality
///
/// All allocators for the same `T` that resolve to the same pool compare equal, and memory
/// obtained from one of them may be released through any other. Allocators created from the
/// same [`PoolRegistry`] (by default, the registry of the current thread) always resolve to the
/// same pool. Fallback allocators of equal `PooledAllocator`s are expected to be
/// interchangeable, as is the case for [`Global`].
///
/// # Thread safety
///
/// The allocator is neither [`Send`] nor [`Sync`]: a slot must be returned to the pool of the
/// thread that handed it out.
///
/// # Example
///
/// ```rust
/// use allocator_api2::boxed::Box;
/// use memory_pool::PooledAllocator;
///
/// let allocator = PooledAllocator::<u64>::new();
///
/// let boxed = Box::new_in(42_u64, allocator.clone());
/// assert_eq!(*boxed, 42);
/// assert_eq!(allocator.pool().len(), 1);
///
/// drop(boxed);
/// assert!(allocator.pool().is_empty());
/// ```
///
/// [1]: Self::allocate
/// [2]: Self::deallocate
pub struct PooledAllocator<T, F = Global>
where
    F: Allocator,
{
    pool: LocalMemoryPool<T>,

    /// Kept so that rebinding to another element type resolves within the same registry.
    registry: PoolRegistry,

    fallback: F,
}

impl<T> PooledAllocator<T, Global>
where
    T: 'static,
{
    /// Creates an allocator that uses the pool for `T` of the current thread and falls back to
    /// the global allocator for multi-element requests.
    ///
    /// The pool is created immediately if it does not exist yet.
    ///
    /// # Panics
    ///
    /// Panics if called while the thread-local storage of the calling thread is being destroyed.
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(PoolRegistry::current(), Global)
    }
}

impl<T> Default for PooledAllocator<T, Global>
where
    T: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, F> PooledAllocator<T, F>
where
    T: 'static,
    F: Allocator,
{
    /// Creates an allocator that uses the pool for `T` from `registry` and `fallback` for
    /// multi-element requests.
    ///
    /// The pool is created immediately if it does not exist yet.
    ///
    /// # Example
    ///
    /// ```rust
    /// use allocator_api2::alloc::Global;
    /// use memory_pool::{PoolRegistry, PooledAllocator};
    ///
    /// let registry = PoolRegistry::new();
    /// let allocator = PooledAllocator::<u32, _>::new_in(registry.clone(), Global);
    ///
    /// assert_eq!(registry.len(), 1);
    /// # drop(allocator);
    /// ```
    #[must_use]
    pub fn new_in(registry: PoolRegistry, fallback: F) -> Self {
        Self {
            pool: registry.pool::<T>(),
            registry,
            fallback,
        }
    }

    /// Allocates storage for `n` contiguous values of `T`.
    ///
    /// A single value (`n == 1`) is served by the pool, anything else by the fallback
    /// allocator. The storage is uninitialized.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the pool or the fallback allocator could not obtain storage,
    /// or if `n` values of `T` would not fit in the address space.
    ///
    /// # Example
    ///
    /// ```rust
    /// use memory_pool::PooledAllocator;
    ///
    /// let allocator = PooledAllocator::<u64>::new();
    ///
    /// let single = allocator.allocate(1)?;
    /// let array = allocator.allocate(8)?;
    ///
    /// assert!(allocator.pool().owns(single));
    /// assert!(!allocator.pool().owns(array));
    ///
    /// // SAFETY: Same counts as used for allocation, not used again.
    /// unsafe {
    ///     allocator.deallocate(single, 1);
    ///     allocator.deallocate(array, 8);
    /// }
    /// # Ok::<(), allocator_api2::alloc::AllocError>(())
    /// ```
    pub fn allocate(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        if n == 1 {
            return self.pool.try_allocate().or(Err(AllocError));
        }

        let layout = Layout::array::<T>(n).or(Err(AllocError))?;
        Ok(self.fallback.allocate(layout)?.cast())
    }

    /// Releases storage for `n` contiguous values of `T` obtained from
    /// [`allocate()`][Self::allocate].
    ///
    /// The values are not dropped.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate(n)` with the same `n` on an allocator equal to
    /// this one and must not have been released since. The storage must not be accessed
    /// afterwards.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        if n == 1 {
            // SAFETY: The caller guarantees the slot came from our pool and is not in use.
            unsafe {
                self.pool.deallocate(ptr);
            }
            return;
        }

        let layout =
            Layout::array::<T>(n).expect("the same count was accepted by allocate() before");

        // SAFETY: The caller guarantees the storage came from our fallback allocator with
        // this same layout.
        unsafe {
            self.fallback.deallocate(ptr.cast(), layout);
        }
    }

    /// Creates an allocator for another element type `U` that shares the registry and fallback
    /// allocator of this one.
    ///
    /// The pool for `U` is created right away, so the first allocation of a `U` does not pay
    /// for setting it up.
    ///
    /// # Example
    ///
    /// ```rust
    /// use allocator_api2::alloc::Global;
    /// use memory_pool::{PoolRegistry, PooledAllocator};
    ///
    /// let registry = PoolRegistry::new();
    /// let numbers = PooledAllocator::<u64, _>::new_in(registry.clone(), Global);
    ///
    /// let names = numbers.rebind::<String>();
    ///
    /// assert_eq!(registry.len(), 2);
    /// assert!(names.registry().ptr_eq(&registry));
    /// ```
    #[must_use]
    pub fn rebind<U>(&self) -> PooledAllocator<U, F>
    where
        U: 'static,
        F: Clone,
    {
        PooledAllocator::new_in(self.registry.clone(), self.fallback.clone())
    }

    /// The pool that single-element requests are served from.
    #[must_use]
    pub fn pool(&self) -> &LocalMemoryPool<T> {
        &self.pool
    }

    /// The registry that the pool came from and that [`rebind()`][Self::rebind] resolves in.
    #[must_use]
    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    /// The allocator that multi-element requests are served from.
    #[must_use]
    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Whether a request for `layout` is served by the pool.
    ///
    /// Zero-sized requests always go to the fallback allocator because containers may skip
    /// releasing them.
    fn is_single_element(layout: Layout) -> bool {
        size_of::<T>() != 0 && layout.size() == size_of::<T>() && layout.align() <= align_of::<T>()
    }
}

// SAFETY: Pool slots stay valid until deallocated or until the pool is dropped, and the pool
// is kept alive by every allocator that refers to it (including clones). Equal allocators share
// the same pool, so memory can be released through any clone. Everything else is delegated to
// the fallback allocator, which upholds the same contract.
unsafe impl<T, F> Allocator for PooledAllocator<T, F>
where
    T: 'static,
    F: Allocator,
{
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if !Self::is_single_element(layout) {
            return self.fallback.allocate(layout);
        }

        let slot = self.pool.try_allocate().or(Err(AllocError))?;

        Ok(NonNull::slice_from_raw_parts(slot.cast(), layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if !Self::is_single_element(layout) {
            // SAFETY: Routed by the same layout check as in `allocate()`, so the storage came
            // from the fallback allocator.
            unsafe {
                self.fallback.deallocate(ptr, layout);
            }
            return;
        }

        // SAFETY: Routed by the same layout check as in `allocate()`, so the storage is a slot
        // of our pool. The caller guarantees it is no longer in use.
        unsafe {
            self.pool.deallocate(ptr.cast());
        }
    }
}

impl<T, F> Clone for PooledAllocator<T, F>
where
    F: Allocator + Clone,
{
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            registry: self.registry.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<T, F> PartialEq for PooledAllocator<T, F>
where
    F: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.pool.ptr_eq(&other.pool)
    }
}

impl<T, F> Eq for PooledAllocator<T, F> where F: Allocator {}

impl<T, F> fmt::Debug for PooledAllocator<T, F>
where
    F: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledAllocator")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("pool", &self.pool)
            .field("fallback", &format_args!("{}", type_name::<F>()))
            .finish_non_exhaustive()
    }
}
