pub mod allocation;
pub use allocation::{
    allocation_error::AllocationError,
    allocator::*,
    arena_chunk::{ChunkHandle, CHUNK_ALIGN, DEFAULT_CHUNK_CAPACITY},
    deallocation_error::DeallocationError,
    debug_fill::{ALLOCATED_BYTE, DISCARDED_BYTE},
    disable_guard::DisableGuard,
    linked_bump::{LinkedBumpAllocator, LinkedBumpAllocatorBuilder},
    rewind::{RewindGuard, RewindState},
};
