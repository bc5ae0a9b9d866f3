use std::alloc::Layout;
use std::any::type_name;
use std::mem::size_of;
use std::ptr::NonNull;

use allocator_api2::alloc::Allocator;
use nm::Event;

use crate::{CHUNK_ALLOCATION_FAILURES, CHUNKS_ALLOCATED_BYTES, PoolError, Result, Slot};

/// Number of slots in each chunk of a pool unless the pool type says otherwise.
///
/// Every growth event allocates this many slots at once, so most calls to `allocate()` are
/// served without touching the backing allocator.
pub const DEFAULT_CHUNK_CAPACITY: usize = 64;

/// Position of a chunk in the chunk arena of its pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ChunkIndex(usize);

impl ChunkIndex {
    #[must_use]
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub(crate) fn get(self) -> usize {
        self.0
    }
}

/// A fixed-capacity block of `N` slots, allocated in one piece from the backing allocator of
/// a pool.
///
/// A new chunk starts out with all its slots linked into a free list (slot `i` links to slot
/// `i + 1`, the last slot links to nothing), ready to be spliced onto the free list of the pool.
/// After that, the chunk itself does not know which of its slots are free - that is tracked by
/// the pool.
///
/// Chunks form a newest-first chain through [`previous()`][Self::previous], which refers to the
/// chunk that was allocated before this one by its position in the arena of the pool.
///
/// The chunk does not remember which allocator its storage came from and does not release it
/// on drop. The owning pool must call [`release()`][Self::release] with the same allocator.
#[derive(Debug)]
pub(crate) struct MemoryChunk<T, const N: usize> {
    first_slot: NonNull<Slot<T>>,

    previous: Option<ChunkIndex>,
}

impl<T, const N: usize> MemoryChunk<T, N> {
    /// Allocates storage for a new chunk from `backing` and links all its slots into a free list.
    ///
    /// # Panics
    ///
    /// Panics if the chunk capacity `N` is zero.
    pub(crate) fn new<A>(previous: Option<ChunkIndex>, backing: &A) -> Result<Self>
    where
        A: Allocator,
    {
        assert!(N > 0, "MemoryChunk must have non-zero capacity");

        let layout = Self::layout();

        let Ok(storage) = backing.allocate(layout) else {
            CHUNK_ALLOCATION_FAILURES.with(Event::observe_once);

            return Err(PoolError::StorageExhausted {
                element_type: type_name::<T>(),
                chunk_bytes: layout.size(),
            });
        };

        let first_slot = storage.cast::<Slot<T>>();

        let mut slot = first_slot;

        for _ in 1..N {
            // SAFETY: `layout()` reserves room for `N` slots and this loop stops one short of
            // the last one, so the next slot is still inside the allocation.
            let next = unsafe { slot.add(1) };

            // SAFETY: The slot is inside storage we just allocated and nobody else references.
            unsafe {
                Slot::set_next(slot, Some(next));
            }

            slot = next;
        }

        // SAFETY: After the loop, `slot` is the last slot of the chunk.
        unsafe {
            Slot::set_next(slot, None);
        }

        CHUNKS_ALLOCATED_BYTES.with(|e| e.observe(layout.size()));

        Ok(Self {
            first_slot,
            previous,
        })
    }

    #[must_use]
    pub(crate) fn layout() -> Layout {
        Layout::array::<Slot<T>>(N).expect("simple flat array layout must be calculable")
    }

    /// The first slot of the chunk, which heads the free list the chunk was created with.
    #[must_use]
    pub(crate) fn first_slot(&self) -> NonNull<Slot<T>> {
        self.first_slot
    }

    /// The chunk that was allocated immediately before this one, if any.
    #[must_use]
    pub(crate) fn previous(&self) -> Option<ChunkIndex> {
        self.previous
    }

    /// Whether `ptr` is the address of one of the slots of this chunk.
    #[must_use]
    pub(crate) fn contains(&self, ptr: NonNull<u8>) -> bool {
        let Some(offset) = ptr
            .addr()
            .get()
            .checked_sub(self.first_slot.addr().get())
        else {
            return false;
        };

        offset < Self::layout().size() && offset.checked_rem(size_of::<Slot<T>>()) == Some(0)
    }

    /// Returns the storage of the chunk to `backing`.
    ///
    /// # Safety
    ///
    /// `backing` must be the allocator (or an equivalent clone of it) that the chunk was created
    /// with. No slot of the chunk may be accessed afterwards and the chunk must not be released
    /// twice.
    pub(crate) unsafe fn release<A>(&self, backing: &A)
    where
        A: Allocator,
    {
        // SAFETY: The layout matches the one we allocated with and the caller guarantees that
        // the allocator is the one the storage came from.
        unsafe {
            backing.deallocate(self.first_slot.cast(), Self::layout());
        }
    }
}
