use std::{
    alloc::Layout,
    cell::{Cell, RefCell},
    fmt,
    mem::{align_of, size_of, MaybeUninit},
    ptr::NonNull,
};

use linkbump_logger::core_debug;

use super::{
    allocation_error::AllocationError,
    allocator::{Deallocator, RawAllocator, StableAllocator},
    arena_chunk::{ArenaChunk, ChunkHandle, DEFAULT_CHUNK_CAPACITY},
    deallocation_error::DeallocationError,
    debug_fill::{did_allocate_bytes, did_deallocate_bytes},
};

/// Where the next allocation comes from: the active chunk and the free range
/// `next..end` inside it. Both pointers are null while there are no chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Cursor {
    pub chunk: Option<ChunkHandle>,
    pub next: *mut u8,
    pub end: *mut u8,
}

impl Cursor {
    pub const EMPTY: Cursor = Cursor {
        chunk: None,
        next: std::ptr::null_mut(),
        end: std::ptr::null_mut(),
    };

    pub fn remaining(&self) -> usize {
        self.end as usize - self.next as usize
    }
}

/// A bump allocator over a linked list of chunks.
///
/// Allocation bumps a cursor through the active chunk and appends a new chunk
/// when the request does not fit. Memory is only ever reclaimed in bulk, with
/// [`rewind`](LinkedBumpAllocator::rewind) or
/// [`release`](LinkedBumpAllocator::release).
///
/// Values placed in the allocator are **never dropped**. Rewinding or
/// releasing invalidates their storage without running any destructor, so
/// types owning resources (files, locks, handles, heap buffers) must not be
/// placed here unless leaking them is acceptable.
///
/// Not thread safe. Use one allocator per thread.
pub struct LinkedBumpAllocator {
    pub(super) label: &'static str,
    pub(super) chunk_capacity: usize,
    pub(super) chunks: RefCell<Vec<ArenaChunk>>,
    pub(super) cursor: Cell<Cursor>,
    pub(super) next_serial: Cell<u64>,
    /// Bumped by every [`release`](LinkedBumpAllocator::release).
    pub(super) release_generation: u64,
    #[cfg(debug_assertions)]
    pub(super) disabled_count: Cell<usize>,
}

// Chunks are owned exclusively and the cursor only points into them. Nothing
// placed in the allocator is reachable once the borrows handed out have ended.
unsafe impl Send for LinkedBumpAllocator {}

impl StableAllocator for LinkedBumpAllocator {}

impl LinkedBumpAllocator {
    /// Creates an empty allocator. `label` only shows up in diagnostics.
    pub fn new(label: &'static str) -> Self {
        Self::builder().label(label).build()
    }

    pub fn builder() -> LinkedBumpAllocatorBuilder {
        LinkedBumpAllocatorBuilder::default()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.borrow().len()
    }

    /// Free bytes left in the active chunk. Zero when there is no chunk.
    pub fn remaining_bytes_in_current_chunk(&self) -> usize {
        self.cursor.get().remaining()
    }

    /// Whether `ptr` points into (or one past the end of) any chunk.
    pub fn owns(&self, ptr: *const u8) -> bool {
        self.chunks.borrow().iter().any(|chunk| chunk.contains(ptr))
    }

    /// Returns `size` bytes aligned to `align`.
    ///
    /// # Panics
    ///
    /// If `align` is not a power of two, if no chunk can be laid out for the
    /// request, or (in debug builds) while the allocator is
    /// [disabled](LinkedBumpAllocator::disable).
    pub fn allocate_bytes(&self, size: usize, align: usize) -> NonNull<u8> {
        self.try_allocate_bytes(size, align)
            .unwrap_or_else(|e| panic!("allocator \"{}\": {e}", self.label))
    }

    pub fn try_allocate_bytes(
        &self,
        size: usize,
        align: usize,
    ) -> Result<NonNull<u8>, AllocationError> {
        self.assert_not_disabled();
        if !align.is_power_of_two() {
            return Err(AllocationError::InvalidAlignment { align });
        }

        if let Some(ptr) = self.bump(size, align) {
            return Ok(ptr);
        }
        self.append_chunk(size, align)?;
        match self.bump(size, align) {
            Some(ptr) => Ok(ptr),
            None => unreachable!("a fresh chunk always fits the request it was sized for"),
        }
    }

    fn bump(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let cursor = self.cursor.get();
        cursor.chunk?;

        let padding = (cursor.next as usize).wrapping_neg() & (align - 1);
        let needed = padding.checked_add(size)?;
        if needed > cursor.remaining() {
            return None;
        }

        // `padding + size` bytes past `next` are inside the active chunk.
        let ptr = unsafe { cursor.next.add(padding) };
        self.cursor.set(Cursor {
            next: unsafe { ptr.add(size) },
            ..cursor
        });
        unsafe { did_allocate_bytes(ptr, size) };
        NonNull::new(ptr)
    }

    fn append_chunk(&self, min_size: usize, align: usize) -> Result<(), AllocationError> {
        let serial = self.next_serial.get();
        let previous = self.cursor.get().chunk;
        let chunk = ArenaChunk::new(
            previous,
            serial,
            self.chunk_capacity.max(min_size),
            align,
        )?;
        self.next_serial.set(serial + 1);

        let (start, end, capacity) = (chunk.start(), chunk.end(), chunk.capacity());
        let handle = {
            let mut chunks = self.chunks.borrow_mut();
            let handle = ChunkHandle::new(chunks.len(), serial);
            chunks.push(chunk);
            handle
        };
        self.cursor.set(Cursor {
            chunk: Some(handle),
            next: start,
            end,
        });

        core_debug!(
            "{}: appended chunk #{} ({} bytes)",
            self.label,
            handle.index(),
            capacity
        );
        Ok(())
    }

    /// Frees every chunk and leaves the allocator empty. No destructors run.
    pub fn release(&mut self) {
        let (freed, bytes) = self.free_all_chunks();
        self.release_generation = self.release_generation.wrapping_add(1);

        if freed > 0 {
            core_debug!(
                "{}: released {} chunk(s), {} bytes",
                self.label,
                freed,
                bytes
            );
        }
    }

    /// Pops every chunk, newest first, and empties the cursor. Returns the
    /// number of chunks and bytes freed.
    pub(super) fn free_all_chunks(&mut self) -> (usize, usize) {
        let chunks = self.chunks.get_mut();
        let mut current = self.cursor.get().chunk;
        let (mut freed, mut bytes) = (0usize, 0usize);

        while let Some(handle) = current {
            debug_assert_eq!(handle.index() + 1, chunks.len());
            let Some(chunk) = chunks.pop() else {
                break;
            };
            debug_assert_eq!(chunk.serial(), handle.serial());
            unsafe { did_deallocate_bytes(chunk.start(), chunk.capacity()) };
            current = chunk.previous();
            freed += 1;
            bytes += chunk.capacity();
        }
        debug_assert!(chunks.is_empty(), "chunk list out of sync with the cursor");
        chunks.clear();
        self.cursor.set(Cursor::EMPTY);
        (freed, bytes)
    }

    /// Moves `value` into the allocator.
    #[allow(clippy::mut_from_ref)]
    pub fn new_object<T>(&self, value: T) -> &mut T {
        let ptr = self.allocate_bytes(size_of::<T>(), align_of::<T>()).cast::<T>();
        unsafe {
            ptr.as_ptr().write(value);
            &mut *ptr.as_ptr()
        }
    }

    /// Reserves space for a `T`, then constructs it in place with `construct`.
    #[allow(clippy::mut_from_ref)]
    pub fn new_object_with<T, F: FnOnce() -> T>(&self, construct: F) -> &mut T {
        let ptr = self.allocate_bytes(size_of::<T>(), align_of::<T>()).cast::<T>();
        unsafe {
            ptr.as_ptr().write(construct());
            &mut *ptr.as_ptr()
        }
    }

    #[allow(clippy::mut_from_ref)]
    pub fn new_object_copy<T: Clone>(&self, value: &T) -> &mut T {
        self.new_object(value.clone())
    }

    /// Clones `objects` into the allocator, in order.
    #[allow(clippy::mut_from_ref)]
    pub fn new_objects_copy<T: Clone>(&self, objects: &[T]) -> &mut [T] {
        let slots = self.allocate_uninitialized_slice::<T>(objects.len());
        for (slot, object) in slots.iter_mut().zip(objects) {
            slot.write(object.clone());
        }
        unsafe { assume_init_slice(slots) }
    }

    /// Reserves space for `len` values of `T` without constructing any.
    #[allow(clippy::mut_from_ref)]
    pub fn allocate_uninitialized_slice<T>(&self, len: usize) -> &mut [MaybeUninit<T>] {
        let layout = Layout::array::<T>(len).unwrap_or_else(|_| {
            panic!(
                "allocator \"{}\": array of {len} x {} overflows",
                self.label,
                std::any::type_name::<T>()
            )
        });
        let ptr = self
            .allocate_bytes(layout.size(), layout.align())
            .cast::<MaybeUninit<T>>();
        unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) }
    }

    /// Allocates `len` default-constructed values of `T`.
    #[allow(clippy::mut_from_ref)]
    pub fn allocate_slice<T: Default>(&self, len: usize) -> &mut [T] {
        let slots = self.allocate_uninitialized_slice::<T>(len);
        for slot in slots.iter_mut() {
            slot.write(T::default());
        }
        unsafe { assume_init_slice(slots) }
    }

    /// Extends the array of `old_len` values at `array` to `new_len` values
    /// without moving it, and returns `true`. The added tail is uninitialized.
    ///
    /// This only works for the most recent allocation of the active chunk when
    /// the chunk has room for the added values. Otherwise nothing changes and
    /// `false` is returned; the caller has to allocate a bigger array and copy.
    pub fn try_grow_array_in_place<T>(
        &self,
        array: NonNull<T>,
        old_len: usize,
        new_len: usize,
    ) -> bool {
        self.assert_not_disabled();
        if new_len < old_len {
            return false;
        }
        let (Some(old_bytes), Some(new_bytes)) = (
            old_len.checked_mul(size_of::<T>()),
            new_len.checked_mul(size_of::<T>()),
        ) else {
            return false;
        };

        let cursor = self.cursor.get();
        let Some(handle) = cursor.chunk else {
            return false;
        };
        let Some(chunk_start) = self
            .chunks
            .borrow()
            .get(handle.index())
            .map(|chunk| chunk.start() as usize)
        else {
            return false;
        };

        // The array must start in the active chunk and end at the cursor.
        let start = array.as_ptr() as usize;
        if start < chunk_start || start.checked_add(old_bytes) != Some(cursor.next as usize) {
            return false;
        }
        let extra = new_bytes - old_bytes;
        if extra > cursor.remaining() {
            return false;
        }

        self.cursor.set(Cursor {
            next: unsafe { cursor.next.add(extra) },
            ..cursor
        });
        unsafe { did_allocate_bytes(cursor.next, extra) };
        true
    }
}

unsafe fn assume_init_slice<T>(slice: &mut [MaybeUninit<T>]) -> &mut [T] {
    unsafe { &mut *(slice as *mut [MaybeUninit<T>] as *mut [T]) }
}

impl Drop for LinkedBumpAllocator {
    fn drop(&mut self) {
        self.release();
    }
}

impl Default for LinkedBumpAllocator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for LinkedBumpAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedBumpAllocator")
            .field("label", &self.label)
            .field("chunk_capacity", &self.chunk_capacity)
            .field("chunk_count", &self.chunk_count())
            .field("remaining", &self.remaining_bytes_in_current_chunk())
            .finish()
    }
}

impl RawAllocator for LinkedBumpAllocator {
    fn alloc_raw(&self, layout: Layout) -> anyhow::Result<NonNull<u8>> {
        Ok(self.try_allocate_bytes(layout.size(), layout.align())?)
    }
}

impl Deallocator for LinkedBumpAllocator {
    /// Reclaims nothing. Memory only comes back through rewind or release.
    /// Debug builds overwrite the bytes so later reads through `ptr` show.
    unsafe fn dealloc_raw(&self, ptr: NonNull<u8>, layout: Layout) -> anyhow::Result<()> {
        if cfg!(debug_assertions) && !self.owns(ptr.as_ptr()) {
            anyhow::bail!(DeallocationError::NotFromAllocator);
        }
        unsafe { did_deallocate_bytes(ptr.as_ptr(), layout.size()) };
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LinkedBumpAllocatorBuilder {
    label: &'static str,
    chunk_capacity: usize,
}

impl Default for LinkedBumpAllocatorBuilder {
    fn default() -> Self {
        Self {
            label: "LinkedBumpAllocator",
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }
}

impl LinkedBumpAllocatorBuilder {
    pub fn label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Size of new chunks. Larger requests still get a chunk of their own size.
    pub fn chunk_capacity(mut self, chunk_capacity: usize) -> Self {
        self.chunk_capacity = chunk_capacity.max(1);
        self
    }

    pub fn build(self) -> LinkedBumpAllocator {
        LinkedBumpAllocator {
            label: self.label,
            chunk_capacity: self.chunk_capacity,
            chunks: RefCell::new(Vec::new()),
            cursor: Cell::new(Cursor::EMPTY),
            next_serial: Cell::new(0),
            release_generation: 0,
            #[cfg(debug_assertions)]
            disabled_count: Cell::new(0),
        }
    }
}
