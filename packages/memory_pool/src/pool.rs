use std::alloc::handle_alloc_error;
use std::any::type_name;
use std::ptr::NonNull;
use std::{fmt, iter, thread};

use allocator_api2::alloc::{Allocator, Global};

use crate::{
    ChunkIndex, DEFAULT_CHUNK_CAPACITY, DropPolicy, MemoryChunk, MemoryPoolBuilder, Result, Slot,
};

/// A pool of fixed-size storage slots for values of type `T`, handing out and taking back one
/// slot at a time in O(1).
///
/// Storage is obtained from the backing allocator `A` in chunks of `N` slots. Free slots of all
/// chunks are threaded into a single free list, with the link stored inside the free slot
/// itself, so a free slot costs no memory beyond the slot.
///
/// * [`allocate()`][1] pops the most recently freed slot. When the free list is empty, the pool
///   first grows by exactly one chunk.
/// * [`deallocate()`][2] pushes a slot back onto the free list, making it the next one handed
///   out (last-in, first-out reuse).
///
/// The pool manages raw storage only. It never constructs or drops values of type `T` - writing
/// a value into an allocated slot and dropping it before deallocation is up to the caller.
///
/// # Resource usage
///
/// The pool never shrinks. Chunks are released all at once when the pool is dropped, including
/// chunks that still contain outstanding allocations (subject to the [`DropPolicy`]).
///
/// # Thread safety
///
/// The pool is neither [`Send`] nor [`Sync`]. To use pools from multiple threads, give each
/// thread its own pool, e.g. via [`get_memory_pool()`][3].
///
/// # Example
///
/// ```rust
/// use memory_pool::MemoryPool;
///
/// let mut pool = MemoryPool::<u64>::new();
///
/// let slot = pool.allocate();
///
/// // SAFETY: The slot is sized and aligned for a u64 and is ours until we deallocate it.
/// unsafe {
///     slot.write(42);
///     assert_eq!(slot.read(), 42);
/// }
///
/// // SAFETY: The slot came from this pool and is not used after this point.
/// unsafe {
///     pool.deallocate(slot);
/// }
///
/// assert!(pool.is_empty());
/// ```
///
/// [1]: Self::allocate
/// [2]: Self::deallocate
/// [3]: crate::get_memory_pool
pub struct MemoryPool<T, const N: usize = DEFAULT_CHUNK_CAPACITY, A = Global>
where
    A: Allocator,
{
    /// Arena of all chunks owned by the pool, in allocation order. The newest-first chain is
    /// expressed through `newest_chunk` and the `previous()` link of each chunk.
    chunks: Vec<MemoryChunk<T, N>>,

    newest_chunk: Option<ChunkIndex>,

    /// Head of the intrusive free list. May point into any chunk of the pool.
    free_list: Option<NonNull<Slot<T>>>,

    /// Number of slots handed out and not yet returned.
    len: usize,

    drop_policy: DropPolicy,

    backing: A,
}

impl<T, const N: usize> MemoryPool<T, N, Global> {
    /// Creates a new [`MemoryPool`] with the default configuration, obtaining chunk storage
    /// from the global allocator.
    ///
    /// The pool starts empty and allocates its first chunk on the first call to `allocate()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use memory_pool::MemoryPool;
    ///
    /// let pool = MemoryPool::<String>::new();
    ///
    /// assert_eq!(pool.len(), 0);
    /// assert_eq!(pool.capacity(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`MemoryPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use memory_pool::{DropPolicy, MemoryPool};
    ///
    /// let pool = MemoryPool::<u32>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    ///
    /// assert!(pool.is_empty());
    /// ```
    pub fn builder() -> MemoryPoolBuilder<T, N, Global> {
        MemoryPoolBuilder::new()
    }
}

impl<T, const N: usize> Default for MemoryPool<T, N, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, A> MemoryPool<T, N, A>
where
    A: Allocator,
{
    #[must_use]
    pub(crate) fn new_inner(drop_policy: DropPolicy, backing: A) -> Self {
        Self {
            chunks: Vec::new(),
            newest_chunk: None,
            free_list: None,
            len: 0,
            drop_policy,
            backing,
        }
    }

    /// Creates a new [`MemoryPool`] that obtains chunk storage from `backing`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use allocator_api2::alloc::Global;
    /// use memory_pool::MemoryPool;
    ///
    /// let pool = MemoryPool::<u64, 32, _>::new_in(Global);
    /// assert_eq!(pool.chunk_count(), 0);
    /// ```
    #[must_use]
    pub fn new_in(backing: A) -> Self {
        Self::new_inner(DropPolicy::default(), backing)
    }

    /// Takes a slot from the pool, growing the pool by one chunk if no slot is free.
    ///
    /// The returned pointer is sized and aligned for `T` and is not handed out again until it
    /// has been passed to [`deallocate()`][Self::deallocate]. The slot is uninitialized.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::StorageExhausted`][crate::PoolError::StorageExhausted] if the pool
    /// had to grow and the backing allocator could not provide a chunk. The pool is unchanged in
    /// that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use memory_pool::MemoryPool;
    ///
    /// let mut pool = MemoryPool::<u32>::new();
    ///
    /// let slot = pool.try_allocate()?;
    /// assert_eq!(pool.len(), 1);
    /// # // SAFETY: From this pool, not used again.
    /// # unsafe { pool.deallocate(slot) };
    /// # Ok::<(), memory_pool::PoolError>(())
    /// ```
    pub fn try_allocate(&mut self) -> Result<NonNull<T>> {
        let slot = match self.free_list {
            Some(slot) => slot,
            None => self.grow()?,
        };

        // SAFETY: Every slot on the free list holds a link, written either when its chunk was
        // created or when the slot was deallocated.
        self.free_list = unsafe { Slot::next(slot) };

        self.len = self
            .len
            .checked_add(1)
            .expect("cannot have more outstanding allocations than there are addresses");

        Ok(Slot::value_ptr(slot))
    }

    /// Takes a slot from the pool, growing the pool by one chunk if no slot is free.
    ///
    /// Same as [`try_allocate()`][Self::try_allocate] except that failure to obtain storage for
    /// a new chunk is treated as fatal and handed to [`std::alloc::handle_alloc_error()`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use memory_pool::MemoryPool;
    ///
    /// let mut pool = MemoryPool::<u32, 4>::new();
    ///
    /// let slots: Vec<_> = (0..5).map(|_| pool.allocate()).collect();
    ///
    /// assert_eq!(pool.len(), 5);
    /// assert_eq!(pool.chunk_count(), 2);
    /// # for slot in slots {
    /// #     // SAFETY: From this pool, not used again.
    /// #     unsafe { pool.deallocate(slot) };
    /// # }
    /// ```
    #[must_use]
    pub fn allocate(&mut self) -> NonNull<T> {
        match self.try_allocate() {
            Ok(ptr) => ptr,
            Err(_) => handle_alloc_error(MemoryChunk::<T, N>::layout()),
        }
    }

    /// Returns a slot to the pool. The slot becomes the next one handed out by `allocate()`.
    ///
    /// Whatever value the slot holds is not dropped. Drop it first if it needs dropping.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate()` or `try_allocate()` on this same pool and
    /// must not have been deallocated since. The slot must not be accessed after this call.
    ///
    /// In builds with debug assertions, passing an address that does not belong to any chunk
    /// of the pool panics. Deallocating the same slot twice is not detected and corrupts the
    /// free list.
    ///
    /// # Example
    ///
    /// ```rust
    /// use memory_pool::MemoryPool;
    ///
    /// let mut pool = MemoryPool::<u64>::new();
    ///
    /// let first = pool.allocate();
    ///
    /// // SAFETY: From this pool, not used again.
    /// unsafe {
    ///     pool.deallocate(first);
    /// }
    ///
    /// // The slot we just returned is the first one to be reused.
    /// let second = pool.allocate();
    /// assert_eq!(first, second);
    /// # // SAFETY: From this pool, not used again.
    /// # unsafe { pool.deallocate(second) };
    /// ```
    pub unsafe fn deallocate(&mut self, ptr: NonNull<T>) {
        debug_assert!(
            self.owns(ptr),
            "deallocated address {ptr:?} does not belong to this memory pool of {}",
            type_name::<T>()
        );

        let slot = Slot::from_value_ptr(ptr);

        // SAFETY: The caller guarantees that the slot came from this pool and is no longer in
        // use, so we may overwrite it with the free-list link.
        unsafe {
            Slot::set_next(slot, self.free_list);
        }

        self.free_list = Some(slot);

        self.len = self.len.checked_sub(1).unwrap_or_else(|| {
            panic!(
                "more deallocations than allocations in memory pool of {}",
                type_name::<T>()
            )
        });
    }

    /// The number of slots handed out and not yet returned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether every slot handed out has been returned.
    ///
    /// An empty pool may still be holding chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of slots in all chunks of the pool, whether handed out or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.chunks
            .len()
            .checked_mul(N)
            .expect("every slot of every chunk is addressable, so the total cannot overflow")
    }

    /// The number of chunks reachable through the chunk chain of the pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use memory_pool::MemoryPool;
    ///
    /// let mut pool = MemoryPool::<u8, 2>::new();
    /// assert_eq!(pool.chunk_count(), 0);
    ///
    /// let a = pool.allocate();
    /// let b = pool.allocate();
    /// assert_eq!(pool.chunk_count(), 1);
    ///
    /// let c = pool.allocate();
    /// assert_eq!(pool.chunk_count(), 2);
    /// # for slot in [a, b, c] {
    /// #     // SAFETY: From this pool, not used again.
    /// #     unsafe { pool.deallocate(slot) };
    /// # }
    /// ```
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunk_chain().count()
    }

    /// Whether `ptr` is the address of a slot in one of the chunks of this pool.
    ///
    /// This says nothing about whether the slot is currently handed out or free.
    #[must_use]
    pub fn owns(&self, ptr: NonNull<T>) -> bool {
        self.chunks.iter().any(|chunk| chunk.contains(ptr.cast()))
    }

    /// Walks the chunks from the newest to the oldest.
    fn chunk_chain(&self) -> impl Iterator<Item = &MemoryChunk<T, N>> {
        iter::successors(self.newest_chunk.map(|index| self.chunk(index)), |chunk| {
            chunk.previous().map(|index| self.chunk(index))
        })
    }

    fn chunk(&self, index: ChunkIndex) -> &MemoryChunk<T, N> {
        self.chunks
            .get(index.get())
            .expect("the chunk chain only refers to chunks in the arena")
    }

    /// Adds one chunk to the pool and returns its first slot, which becomes the new free list.
    ///
    /// Only called when the free list is empty, so the tail of the new chunk (which links to
    /// nothing) correctly terminates the combined free list.
    fn grow(&mut self) -> Result<NonNull<Slot<T>>> {
        debug_assert!(self.free_list.is_none());

        let chunk = MemoryChunk::<T, N>::new(self.newest_chunk, &self.backing)?;
        let first_slot = chunk.first_slot();

        let index = ChunkIndex::new(self.chunks.len());
        self.chunks.push(chunk);
        self.newest_chunk = Some(index);

        Ok(first_slot)
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        use std::collections::HashSet;

        assert_eq!(
            self.chunk_count(),
            self.chunks.len(),
            "every chunk in the arena must be reachable through the chunk chain"
        );

        let mut seen = HashSet::new();
        let mut current = self.free_list;

        while let Some(slot) = current {
            assert!(
                self.owns(Slot::value_ptr(slot)),
                "free list contains a foreign slot in memory pool of {}",
                type_name::<T>()
            );
            assert!(
                seen.insert(slot),
                "free list contains a slot twice in memory pool of {}",
                type_name::<T>()
            );

            // SAFETY: Slots on the free list hold links.
            current = unsafe { Slot::next(slot) };
        }

        assert_eq!(
            seen.len().checked_add(self.len),
            Some(self.capacity()),
            "free slots plus outstanding allocations must account for the whole capacity"
        );
    }
}

impl<T, const N: usize, A> Drop for MemoryPool<T, N, A>
where
    A: Allocator,
{
    fn drop(&mut self) {
        let outstanding = self.len;

        self.free_list = None;

        for chunk in self.chunks.iter().rev() {
            // SAFETY: Every chunk in the arena was created with `self.backing` and is released
            // exactly once, here. The free list that pointed into the chunks is already gone.
            unsafe {
                chunk.release(&self.backing);
            }
        }

        self.chunks.clear();
        self.newest_chunk = None;

        // We do this check at the end so we clean up the memory first.
        //
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                outstanding == 0,
                "dropped a memory pool of {} with {outstanding} outstanding allocations and a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}

impl<T, const N: usize, A> fmt::Debug for MemoryPool<T, N, A>
where
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("chunk_capacity", &N)
            .field("chunks", &self.chunks.len())
            .field("len", &self.len)
            .field("drop_policy", &self.drop_policy)
            .field("backing", &format_args!("{}", type_name::<A>()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, reason = "panic is fine in tests")]
mod tests {
    use std::alloc::Layout;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use allocator_api2::alloc::AllocError;
    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::PoolError;

    assert_not_impl_any!(MemoryPool<u32>: Send, Sync);

    /// Counts chunk allocations and releases going through it.
    #[derive(Clone, Debug, Default)]
    struct CountingAllocator {
        allocations: Rc<Cell<usize>>,
        releases: Rc<Cell<usize>>,
        refuse: Rc<Cell<bool>>,
    }

    impl CountingAllocator {
        fn live(&self) -> usize {
            self.allocations.get() - self.releases.get()
        }
    }

    // SAFETY: Forwards to `Global`, which upholds the contract.
    unsafe impl Allocator for CountingAllocator {
        fn allocate(&self, layout: Layout) -> std::result::Result<NonNull<[u8]>, AllocError> {
            if self.refuse.get() {
                return Err(AllocError);
            }

            self.allocations.set(self.allocations.get() + 1);
            Global.allocate(layout)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.releases.set(self.releases.get() + 1);

            // SAFETY: Forwarding the caller's guarantees.
            unsafe {
                Global.deallocate(ptr, layout);
            }
        }
    }

    fn free_all<T, const N: usize, A: Allocator>(pool: &mut MemoryPool<T, N, A>, slots: &[NonNull<T>]) {
        for slot in slots {
            // SAFETY: Test slots always come from the same pool and are freed once.
            unsafe {
                pool.deallocate(*slot);
            }
        }
    }

    #[test]
    fn smoke_test() {
        let mut pool = MemoryPool::<u64, 4>::new();

        let a = pool.allocate();
        let b = pool.allocate();

        // SAFETY: Both slots are ours and sized for u64.
        unsafe {
            a.write(1);
        }
        // SAFETY: Same as above.
        unsafe {
            b.write(2);
        }

        // SAFETY: Written above.
        assert_eq!(unsafe { a.read() }, 1);
        // SAFETY: Written above.
        assert_eq!(unsafe { b.read() }, 2);

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.capacity(), 4);
        pool.integrity_check();

        free_all(&mut pool, &[a, b]);

        assert!(pool.is_empty());
        pool.integrity_check();
    }

    #[test]
    fn fresh_pool_owns_nothing() {
        let pool = MemoryPool::<u64>::new();

        assert_eq!(pool.chunk_count(), 0);
        assert_eq!(pool.capacity(), 0);
        assert!(pool.is_empty());
        assert!(!pool.owns(NonNull::dangling()));
    }

    #[test]
    fn live_allocations_are_unique() {
        let mut pool = MemoryPool::<u32, 8>::new();

        let slots: Vec<_> = (0..50).map(|_| pool.allocate()).collect();
        let unique: HashSet<_> = slots.iter().copied().collect();
        assert_eq!(unique.len(), slots.len());

        // Free every other slot, then allocate again - no live slot may be handed out twice.
        let (freed, kept): (Vec<_>, Vec<_>) =
            slots.iter().enumerate().partition(|(index, _)| index % 2 == 0);
        let freed: Vec<_> = freed.into_iter().map(|(_, slot)| *slot).collect();
        let kept: Vec<_> = kept.into_iter().map(|(_, slot)| *slot).collect();

        free_all(&mut pool, &freed);
        pool.integrity_check();

        let reallocated: Vec<_> = (0..freed.len()).map(|_| pool.allocate()).collect();

        let mut live: HashSet<_> = kept.iter().copied().collect();
        for slot in &reallocated {
            assert!(live.insert(*slot), "slot {slot:?} handed out while still live");
        }

        pool.integrity_check();

        free_all(&mut pool, &kept);
        free_all(&mut pool, &reallocated);
        pool.integrity_check();
    }

    #[test]
    fn one_past_chunk_capacity_creates_second_chunk() {
        let mut pool = MemoryPool::<u64, 64>::new();

        let slots: Vec<_> = (0..64).map(|_| pool.allocate()).collect();
        assert_eq!(pool.chunk_count(), 1);

        let extra = pool.allocate();
        assert_eq!(pool.chunk_count(), 2);
        assert_eq!(pool.capacity(), 128);
        pool.integrity_check();

        free_all(&mut pool, &slots);
        free_all(&mut pool, &[extra]);
    }

    #[test]
    fn round_trip_never_grows() {
        let mut pool = MemoryPool::<u64, 4>::new();

        let held = pool.allocate();
        let chunks_before = pool.chunk_count();

        for _ in 0..1000 {
            let slot = pool.allocate();
            // SAFETY: From this pool, not used again.
            unsafe {
                pool.deallocate(slot);
            }
        }

        assert_eq!(pool.chunk_count(), chunks_before);

        free_all(&mut pool, &[held]);
    }

    #[test]
    fn freed_chunk_slots_are_reused_lifo() {
        let mut pool = MemoryPool::<u64, 4>::new();

        // Fill the first chunk, then grow into a second one and fill that too.
        let first: Vec<_> = (0..4).map(|_| pool.allocate()).collect();
        let second: Vec<_> = (0..4).map(|_| pool.allocate()).collect();
        assert_eq!(pool.chunk_count(), 2);

        free_all(&mut pool, &second);

        let again: Vec<_> = (0..4).map(|_| pool.allocate()).collect();

        // Same set of addresses, most recently freed first.
        let expected: Vec<_> = second.iter().rev().copied().collect();
        assert_eq!(again, expected);
        assert_eq!(pool.chunk_count(), 2);

        free_all(&mut pool, &first);
        free_all(&mut pool, &again);
    }

    #[test]
    fn capacity_four_scenario() {
        let mut pool = MemoryPool::<u64, 4>::new();

        let a: Vec<_> = (0..4).map(|_| pool.allocate()).collect();
        assert_eq!(pool.chunk_count(), 1);

        let a5 = pool.allocate();
        assert_eq!(pool.chunk_count(), 2);

        let first_chunk = pool.chunk(ChunkIndex::new(0));
        let second_chunk = pool.chunk(ChunkIndex::new(1));
        for slot in &a {
            assert!(first_chunk.contains(slot.cast()));
        }
        assert!(second_chunk.contains(a5.cast()));

        let a3 = a[2];

        // SAFETY: From this pool, freed once.
        unsafe {
            pool.deallocate(a5);
        }
        // SAFETY: From this pool, freed once.
        unsafe {
            pool.deallocate(a3);
        }

        assert_eq!(pool.allocate(), a3);
        assert_eq!(pool.allocate(), a5);
        assert_eq!(pool.chunk_count(), 2);

        free_all(&mut pool, &a);
        free_all(&mut pool, &[a5]);
    }

    #[test]
    fn chunk_chain_is_newest_first() {
        let mut pool = MemoryPool::<u16, 2>::new();

        let slots: Vec<_> = (0..6).map(|_| pool.allocate()).collect();

        let chain: Vec<_> = pool.chunk_chain().collect();
        assert_eq!(chain.len(), 3);
        assert!(chain[0].contains(slots[5].cast()));
        assert!(chain[1].contains(slots[3].cast()));
        assert!(chain[2].contains(slots[1].cast()));
        assert_eq!(chain[2].previous(), None);

        free_all(&mut pool, &slots);
    }

    #[test]
    fn drop_with_outstanding_releases_all_chunks() {
        let backing = CountingAllocator::default();

        {
            let mut pool = MemoryPool::<u64, 4, _>::new_in(backing.clone());

            for _ in 0..9 {
                _ = pool.allocate();
            }

            assert_eq!(backing.allocations.get(), 3);
            assert_eq!(backing.live(), 3);
        }

        assert_eq!(backing.releases.get(), 3);
        assert_eq!(backing.live(), 0);
    }

    #[test]
    fn drop_of_unused_pool_allocates_nothing() {
        let backing = CountingAllocator::default();

        drop(MemoryPool::<u64, 4, _>::new_in(backing.clone()));

        assert_eq!(backing.allocations.get(), 0);
        assert_eq!(backing.releases.get(), 0);
    }

    #[test]
    fn values_are_not_dropped_by_pool() {
        struct Droppable {
            dropped: Rc<Cell<bool>>,
        }

        impl Drop for Droppable {
            fn drop(&mut self) {
                self.dropped.set(true);
            }
        }

        let dropped = Rc::new(Cell::new(false));

        {
            let mut pool = MemoryPool::<Droppable, 4>::new();
            let slot = pool.allocate();

            // SAFETY: Slot is ours and sized for the value.
            unsafe {
                slot.write(Droppable {
                    dropped: Rc::clone(&dropped),
                });
            }

            // SAFETY: From this pool, freed once. The value inside is deliberately leaked.
            unsafe {
                pool.deallocate(slot);
            }
        }

        assert!(!dropped.get());

        // The `Rc` clone inside the leaked value keeps the count up.
        assert_eq!(Rc::strong_count(&dropped), 2);
    }

    #[test]
    fn storage_exhaustion_propagates_and_leaves_pool_usable() {
        let backing = CountingAllocator::default();
        let mut pool = MemoryPool::<u64, 2, _>::new_in(backing.clone());

        let a = pool.allocate();
        let b = pool.allocate();

        backing.refuse.set(true);

        let result = pool.try_allocate();
        assert!(matches!(result, Err(PoolError::StorageExhausted { .. })));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.chunk_count(), 1);

        // A freed slot can still be served without the backing allocator.
        free_all(&mut pool, &[b]);
        assert_eq!(pool.try_allocate().unwrap(), b);

        backing.refuse.set(false);
        let c = pool.try_allocate().unwrap();
        assert_eq!(pool.chunk_count(), 2);

        free_all(&mut pool, &[a, b, c]);
        pool.integrity_check();
    }

    #[test]
    fn zero_sized_items_get_distinct_slots() {
        let mut pool = MemoryPool::<(), 4>::new();

        let a = pool.allocate();
        let b = pool.allocate();
        assert_ne!(a, b);

        free_all(&mut pool, &[a, b]);
    }

    #[test]
    fn over_aligned_items_are_aligned() {
        #[repr(align(64))]
        struct CacheLine {
            _data: [u8; 8],
        }

        let mut pool = MemoryPool::<CacheLine, 4>::new();

        let slots: Vec<_> = (0..9).map(|_| pool.allocate()).collect();
        for slot in &slots {
            assert!(slot.as_ptr().is_aligned());
        }

        free_all(&mut pool, &slots);
    }

    #[test]
    #[should_panic]
    fn drop_outstanding_with_forbidden_to_drop_policy_panics() {
        let mut pool = MemoryPool::<u32, 4>::builder()
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        _ = pool.allocate();
    }

    #[test]
    fn drop_empty_with_forbidden_to_drop_policy_ok() {
        let mut pool = MemoryPool::<u32, 4>::builder()
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        let slot = pool.allocate();
        free_all(&mut pool, &[slot]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn deallocate_foreign_address_panics_in_debug() {
        let mut pool = MemoryPool::<u64, 4>::new();
        let mut other = MemoryPool::<u64, 4>::new();

        let _own = pool.allocate();
        let foreign = other.allocate();

        // SAFETY: Deliberately violating the contract; debug builds catch this before any
        // memory is touched.
        unsafe {
            pool.deallocate(foreign);
        }
    }

    #[test]
    fn debug_output_names_item_type() {
        let pool = MemoryPool::<u64, 4>::new();

        let debug = format!("{pool:?}");
        assert!(debug.contains("u64"));
        assert!(debug.contains("MemoryPool"));
    }
}
