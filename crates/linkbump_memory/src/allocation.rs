pub mod allocation_error;
pub mod allocator;
pub mod arena_chunk;
pub mod debug_fill;
pub mod deallocation_error;
pub mod disable_guard;
pub mod linked_bump;
pub mod rewind;

#[cfg(test)]
mod properties;
