use thiserror::Error;

/// Errors that can occur when a memory pool needs more storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The backing allocator could not provide storage for a new chunk.
    ///
    /// The pool is left unchanged; every outstanding allocation remains valid.
    #[error("could not allocate a {chunk_bytes} byte chunk for a memory pool of {element_type}")]
    StorageExhausted {
        /// Name of the element type the pool serves.
        element_type: &'static str,

        /// Size of the chunk that the backing allocator failed to provide.
        chunk_bytes: usize,
    },
}

/// A specialized `Result` type for memory pool operations, returning the crate's
/// [`PoolError`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(PoolError: Send, Sync, Debug);

    #[test]
    fn storage_exhausted_names_type_and_size() {
        let error = PoolError::StorageExhausted {
            element_type: "u64",
            chunk_bytes: 512,
        };

        let message = error.to_string();
        assert!(message.contains("u64"));
        assert!(message.contains("512"));
    }
}
