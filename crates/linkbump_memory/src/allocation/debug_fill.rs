use cfg_if::cfg_if;

/// Debug builds fill bytes handed out by the allocator with this value, so
/// reads of memory nobody initialized stand out.
pub const ALLOCATED_BYTE: u8 = 0xAB;

/// Debug builds fill bytes given back by rewind, release or deallocation with
/// this value before the storage is reused or freed.
pub const DISCARDED_BYTE: u8 = 0xCD;

cfg_if! {
    if #[cfg(debug_assertions)] {
        /// Marks `size` bytes at `ptr` as handed out.
        ///
        /// # Safety
        ///
        /// `ptr..ptr + size` must lie inside one live chunk.
        #[inline]
        pub(super) unsafe fn did_allocate_bytes(ptr: *mut u8, size: usize) {
            unsafe { std::ptr::write_bytes(ptr, ALLOCATED_BYTE, size) }
        }

        /// Marks `size` bytes at `ptr` as no longer in use.
        ///
        /// # Safety
        ///
        /// `ptr..ptr + size` must lie inside one live chunk and nothing may
        /// read it as a value afterwards.
        #[inline]
        pub(super) unsafe fn did_deallocate_bytes(ptr: *mut u8, size: usize) {
            unsafe { std::ptr::write_bytes(ptr, DISCARDED_BYTE, size) }
        }
    } else {
        #[inline(always)]
        pub(super) unsafe fn did_allocate_bytes(_ptr: *mut u8, _size: usize) {}

        #[inline(always)]
        pub(super) unsafe fn did_deallocate_bytes(_ptr: *mut u8, _size: usize) {}
    }
}
