use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeallocationError {
    /// Reported in debug builds when the pointer lies outside every chunk of the allocator
    #[error("Trying to deallocate a pointer that was not allocated by this allocator")]
    NotFromAllocator,
}
