//! A type that always lives in pooled storage.
//!
//! `Obj::new()` takes a slot from the pool for `Obj` on the current thread and `Drop` for the
//! returned handle gives the slot back, so user code never sees the pool. Thousands of values
//! are created and destroyed while the pool grows only as far as the peak number of live values.

use std::ops::Deref;
use std::ptr::NonNull;

use memory_pool::{LocalMemoryPool, get_memory_pool};

#[derive(Debug, Eq, PartialEq)]
struct Obj {
    data: usize,
}

/// Owning handle to an `Obj` stored in a pool slot.
struct PooledObj {
    ptr: NonNull<Obj>,
    pool: LocalMemoryPool<Obj>,
}

impl PooledObj {
    fn new(data: usize) -> Self {
        let pool = get_memory_pool::<Obj>();
        let ptr = pool.allocate();

        // SAFETY: Fresh slot, sized and aligned for `Obj`, used only by this handle.
        unsafe {
            ptr.write(Obj { data });
        }

        Self { ptr, pool }
    }
}

impl Deref for PooledObj {
    type Target = Obj;

    fn deref(&self) -> &Obj {
        // SAFETY: The slot holds an `Obj` for as long as the handle exists.
        unsafe { self.ptr.as_ref() }
    }
}

impl Drop for PooledObj {
    fn drop(&mut self) {
        // SAFETY: The slot holds an `Obj` that nobody else references.
        unsafe {
            self.ptr.drop_in_place();
        }

        // SAFETY: The slot came from this pool and the handle is going away.
        unsafe {
            self.pool.deallocate(self.ptr);
        }
    }
}

fn main() {
    let mut window = Vec::new();

    for index in 0..10_000 {
        window.push(PooledObj::new(index));

        // Keep at most 100 values alive at any time.
        if window.len() > 100 {
            window.remove(0);
        }
    }

    let sum: usize = window.iter().map(|obj| obj.data).sum();
    println!("Sum of the last {} values: {sum}", window.len());

    let pool = get_memory_pool::<Obj>();
    println!(
        "Pool for Obj: {} live values, {} chunks, capacity {}",
        pool.len(),
        pool.chunk_count(),
        pool.capacity()
    );

    drop(window);
    println!("After dropping all values: {} live", pool.len());
}
