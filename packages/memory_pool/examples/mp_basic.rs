//! Basic usage of the `memory_pool` crate:
//!
//! * Creating a pool.
//! * Allocating slots and storing values in them.
//! * Returning slots and observing that they are reused.
//! * Reading the growth metrics of the pools on this thread.

use memory_pool::MemoryPool;

fn main() {
    let mut pool = MemoryPool::<String, 4>::new();

    // Allocating gives you an uninitialized slot. Storing a value in it is up to you.
    let names = ["Alice", "Bob", "Charlie", "Dave", "Eve"].map(|name| {
        let slot = pool.allocate();

        // SAFETY: The slot is sized and aligned for a String and nobody else uses it.
        unsafe {
            slot.write(name.to_string());
        }

        slot
    });

    println!(
        "Pool holds {} values in {} chunks, with room for {}",
        pool.len(),
        pool.chunk_count(),
        pool.capacity()
    );

    // SAFETY: Every slot holds a String we wrote above.
    let bob = unsafe { names[1].as_ref() };
    println!("Second value: {bob}");

    // The pool does not drop values, so we do that before giving the slots back.
    for slot in names {
        // SAFETY: Each slot holds a String and is released exactly once.
        unsafe {
            slot.drop_in_place();
            pool.deallocate(slot);
        }
    }

    // The most recently returned slot is the first to be handed out again.
    let reused = pool.allocate();
    println!("Reused the last returned slot: {}", reused == names[4]);

    // SAFETY: Never written to, released once.
    unsafe {
        pool.deallocate(reused);
    }

    let report = nm::Report::collect();
    println!("{report}");
}
