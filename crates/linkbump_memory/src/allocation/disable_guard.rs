use std::marker::PhantomData;

use cfg_if::cfg_if;

use super::linked_bump::LinkedBumpAllocator;

/// While alive, every allocation from the allocator panics (debug builds only).
/// Created by [`LinkedBumpAllocator::disable`].
#[must_use = "allocation is only forbidden while the guard is alive"]
pub struct DisableGuard<'a> {
    #[cfg(debug_assertions)]
    allocator: &'a LinkedBumpAllocator,
    _marker: PhantomData<&'a LinkedBumpAllocator>,
}

impl LinkedBumpAllocator {
    /// In debug builds, makes every allocation a fatal error until the
    /// returned guard is dropped. Guards nest: allocation resumes once all of
    /// them are gone. In release builds this does nothing.
    pub fn disable(&self) -> DisableGuard<'_> {
        DisableGuard::new(self)
    }

    #[cfg(debug_assertions)]
    pub fn is_disabled(&self) -> bool {
        self.disabled_count.get() > 0
    }

    #[inline]
    pub(super) fn assert_not_disabled(&self) {
        #[cfg(debug_assertions)]
        assert!(
            !self.is_disabled(),
            "allocator \"{}\" used while disabled",
            self.label
        );
    }
}

cfg_if! {
    if #[cfg(debug_assertions)] {
        impl<'a> DisableGuard<'a> {
            fn new(allocator: &'a LinkedBumpAllocator) -> Self {
                allocator.disabled_count.set(allocator.disabled_count.get() + 1);
                Self {
                    allocator,
                    _marker: PhantomData,
                }
            }
        }

        impl Drop for DisableGuard<'_> {
            fn drop(&mut self) {
                let count = self.allocator.disabled_count.get();
                debug_assert!(count > 0);
                self.allocator.disabled_count.set(count - 1);
            }
        }
    } else {
        impl<'a> DisableGuard<'a> {
            #[inline(always)]
            fn new(_allocator: &'a LinkedBumpAllocator) -> Self {
                Self {
                    _marker: PhantomData,
                }
            }
        }
    }
}


#[cfg(all(test, not(debug_assertions)))]
mod release_test {
    use std::mem::size_of;

    use super::*;

    #[test]
    fn test_guard_is_zero_sized() {
        assert_eq!(size_of::<DisableGuard<'static>>(), 0);
    }

    #[test]
    fn test_allocation_ignores_guard() {
        let arena = LinkedBumpAllocator::new("unchecked");
        let _outer = arena.disable();
        let _inner = arena.disable();
        assert_eq!(*arena.new_object(9u16), 9);
        let array = std::ptr::NonNull::from(&mut arena.allocate_slice::<u8>(4)[0]);
        assert!(arena.try_grow_array_in_place(array, 4, 8));
    }
}
