use std::{alloc::Layout, mem::size_of, ptr::NonNull};

use super::allocation_error::AllocationError;

/// Every chunk buffer is aligned to at least this many bytes.
pub const CHUNK_ALIGN: usize = std::mem::align_of::<usize>();

/// Bytes in a chunk unless a request needs more: one page minus the chunk's
/// own bookkeeping.
pub const DEFAULT_CHUNK_CAPACITY: usize = 4096 - size_of::<ArenaChunk>();

/// Identifies one chunk of one allocator: its position in the chunk stack and
/// the serial number it was created with. Serials are never reused, so a
/// handle to a freed chunk never matches a newer chunk at the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkHandle {
    index: usize,
    serial: u64,
}

impl ChunkHandle {
    pub(crate) fn new(index: usize, serial: u64) -> Self {
        Self { index, serial }
    }

    pub fn index(self) -> usize {
        self.index
    }

    pub fn serial(self) -> u64 {
        self.serial
    }
}

/// One block of backing storage plus a link to the chunk before it.
/// The buffer goes back to the system allocator when the record is dropped.
pub(crate) struct ArenaChunk {
    previous: Option<ChunkHandle>,
    serial: u64,
    start: NonNull<u8>,
    layout: Layout,
}

// The buffer is owned exclusively by the record.
unsafe impl Send for ArenaChunk {}

impl ArenaChunk {
    pub fn new(
        previous: Option<ChunkHandle>,
        serial: u64,
        capacity: usize,
        align: usize,
    ) -> Result<Self, AllocationError> {
        let layout = Layout::from_size_align(capacity.max(1), align.max(CHUNK_ALIGN)).map_err(
            |_| AllocationError::SizeOverflow {
                requested: capacity,
                align,
            },
        )?;
        let memory = unsafe { std::alloc::alloc(layout) };
        let start = NonNull::new(memory).unwrap_or_else(|| std::alloc::handle_alloc_error(layout));

        Ok(Self {
            previous,
            serial,
            start,
            layout,
        })
    }

    pub fn previous(&self) -> Option<ChunkHandle> {
        self.previous
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    pub fn start(&self) -> *mut u8 {
        self.start.as_ptr()
    }

    pub fn end(&self) -> *mut u8 {
        unsafe { self.start.as_ptr().add(self.layout.size()) }
    }

    /// Whether `ptr` points into the buffer or one past its end.
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        addr >= self.start() as usize && addr <= self.end() as usize
    }
}

impl Drop for ArenaChunk {
    fn drop(&mut self) {
        unsafe { std::alloc::dealloc(self.start.as_ptr(), self.layout) }
    }
}
