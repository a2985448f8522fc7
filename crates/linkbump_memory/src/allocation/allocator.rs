use std::{alloc::Layout, ptr::NonNull};

use anyhow::Result;

use super::allocation_error::AllocationError;

/// The minimal capability generic code needs to get memory: hand out
/// `layout.size()` bytes aligned to `layout.align()`.
pub trait RawAllocator {
    fn alloc_raw(&self, layout: Layout) -> Result<NonNull<u8>>;
}

/// A contractual trait for allocators that won't move allocated objects in no
/// circumstances
pub trait StableAllocator {}

/// A trait for allocators that can construct values of any type.
/// This trait has a default implementation for all [RawAllocators](RawAllocator),
/// as it is possible to construct values of any type on top of raw allocation.
pub trait Constructor {
    fn construct<T>(&self, value: T) -> Result<NonNull<T>>;
    fn construct_slice<T: Clone>(&self, values: &[T]) -> Result<NonNull<[T]>>;
}

impl<R: RawAllocator + ?Sized> Constructor for R {
    fn construct<T>(&self, value: T) -> Result<NonNull<T>> {
        let ptr = self.alloc_raw(Layout::new::<T>())?.cast::<T>();
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    fn construct_slice<T: Clone>(&self, values: &[T]) -> Result<NonNull<[T]>> {
        let ptr = self.alloc_raw(Layout::array::<T>(values.len())?)?.cast::<T>();
        for (i, value) in values.iter().enumerate() {
            unsafe { ptr.as_ptr().add(i).write(value.clone()) };
        }
        Ok(NonNull::slice_from_raw_parts(ptr, values.len()))
    }
}

pub trait Deallocator {
    /// Hands the storage behind `ptr` back to the allocator. Allocators are
    /// free to reclaim nothing.
    ///
    /// # Errors
    ///
    /// Allocators may report pointers they do not recognise.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `alloc_raw` on this allocator with the same
    /// `layout`, and must not be used afterwards.
    unsafe fn dealloc_raw(&self, ptr: NonNull<u8>, layout: Layout) -> Result<()>;

    /// Drops the value in place, then deallocates its storage.
    ///
    /// # Safety
    ///
    /// Same as [`Deallocator::dealloc_raw`], and `ptr` must point to an
    /// initialized `T`.
    unsafe fn dealloc<T>(&self, ptr: NonNull<T>) -> Result<()> {
        unsafe { std::ptr::drop_in_place(ptr.as_ptr()) };
        self.dealloc_raw(ptr.cast::<u8>(), Layout::new::<T>())
    }

    /// # Safety
    ///
    /// Same as [`Deallocator::dealloc`], for every element of the slice.
    unsafe fn dealloc_slice<T>(&self, ptr: NonNull<[T]>) -> Result<()> {
        let layout = Layout::array::<T>(ptr.len())?;
        unsafe { std::ptr::drop_in_place(ptr.as_ptr()) };
        self.dealloc_raw(ptr.cast::<u8>(), layout)
    }
}

impl<A: RawAllocator + ?Sized> RawAllocator for &A {
    fn alloc_raw(&self, layout: Layout) -> Result<NonNull<u8>> {
        (**self).alloc_raw(layout)
    }
}

impl<A: Deallocator + ?Sized> Deallocator for &A {
    unsafe fn dealloc_raw(&self, ptr: NonNull<u8>, layout: Layout) -> Result<()> {
        (**self).dealloc_raw(ptr, layout)
    }
}

/// The global heap behind the capability traits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl StableAllocator for SystemAllocator {}

impl RawAllocator for SystemAllocator {
    fn alloc_raw(&self, layout: Layout) -> Result<NonNull<u8>> {
        if layout.size() == 0 {
            // Any non-null, aligned address is a valid zero-sized allocation.
            return Ok(unsafe { NonNull::new_unchecked(layout.align() as *mut u8) });
        }
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| {
            AllocationError::OutOfMemory {
                requested: layout.size(),
            }
            .into()
        })
    }
}

impl Deallocator for SystemAllocator {
    unsafe fn dealloc_raw(&self, ptr: NonNull<u8>, layout: Layout) -> Result<()> {
        if layout.size() != 0 {
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        }
        Ok(())
    }
}
