use std::ops::Deref;

use linkbump_logger::{core_debug, core_warn};

use super::{
    debug_fill::did_deallocate_bytes,
    linked_bump::{Cursor, LinkedBumpAllocator},
};

/// A saved allocator position, taken by
/// [`prepare_for_rewind`](LinkedBumpAllocator::prepare_for_rewind) and
/// consumed by [`rewind`](LinkedBumpAllocator::rewind). It owns no memory and
/// does not keep any chunk alive.
#[derive(Debug)]
#[must_use = "a rewind state does nothing unless passed to `rewind`"]
pub struct RewindState {
    cursor: Cursor,
    release_generation: u64,
}

/// Rewinds its allocator to the position it had when the guard was created,
/// exactly once, when the guard goes out of scope (including by unwinding).
///
/// The guard dereferences to the allocator, so the guarded scope allocates
/// through it. It hands out no `&mut` to the allocator; nested scopes use
/// [`RewindGuard::make_rewind_guard`] and [`RewindGuard::rewind`].
#[must_use = "the allocator is rewound as soon as the guard is dropped"]
pub struct RewindGuard<'a> {
    allocator: &'a mut LinkedBumpAllocator,
    state: Option<RewindState>,
}

impl RewindGuard<'_> {
    /// Opens a nested guarded scope. It rewinds before this guard does.
    pub fn make_rewind_guard(&mut self) -> RewindGuard<'_> {
        self.allocator.make_rewind_guard()
    }

    /// Rewinds to a state taken inside this guarded scope.
    pub fn rewind(&mut self, state: RewindState) {
        self.allocator.rewind(state);
    }
}

impl Deref for RewindGuard<'_> {
    type Target = LinkedBumpAllocator;

    fn deref(&self) -> &Self::Target {
        self.allocator
    }
}

impl Drop for RewindGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.allocator.rewind(state);
        }
    }
}

impl LinkedBumpAllocator {
    pub fn prepare_for_rewind(&self) -> RewindState {
        RewindState {
            cursor: self.cursor.get(),
            release_generation: self.release_generation,
        }
    }

    /// Deallocates everything allocated since `state` was taken. Chunks
    /// appended after it are freed; the chunk that was active keeps its
    /// storage and becomes active again. No destructors run.
    ///
    /// A state taken before a [`release`](LinkedBumpAllocator::release)
    /// refers to a chunk that no longer exists; rewinding to it leaves the
    /// allocator empty.
    ///
    /// # Panics
    ///
    /// If `state` was taken from a different allocator, or if its chunk was
    /// already discarded by rewinding to an older state.
    pub fn rewind(&mut self, state: RewindState) {
        let saved = state.cursor;
        let Some(handle) = saved.chunk else {
            let (discarded, _) = self.free_all_chunks();
            if discarded > 0 {
                core_debug!(
                    "{}: rewind discarded {} chunk(s), allocator is empty",
                    self.label,
                    discarded
                );
            }
            return;
        };

        let is_live = self
            .chunks
            .get_mut()
            .get(handle.index())
            .is_some_and(|chunk| chunk.serial() == handle.serial());
        if !is_live {
            assert!(
                state.release_generation != self.release_generation,
                "stale rewind state for allocator \"{}\": chunk #{} was discarded by an earlier rewind",
                self.label,
                handle.index()
            );
            core_warn!(
                "{}: rewinding to chunk #{} which was already released",
                self.label,
                handle.index()
            );
            self.release();
            return;
        }

        let current = self.cursor.get();
        let chunks = self.chunks.get_mut();
        let chunk = &chunks[handle.index()];
        assert!(
            saved.end == chunk.end()
                && chunk.start() <= saved.next
                && saved.next <= saved.end,
            "rewind state does not belong to allocator \"{}\"",
            self.label
        );

        // Bytes of the snapshot chunk handed out since the snapshot.
        let used_end = if current.chunk == Some(handle) {
            current.next
        } else {
            saved.end
        };
        if used_end > saved.next {
            unsafe { did_deallocate_bytes(saved.next, used_end as usize - saved.next as usize) };
        }

        let mut discarded = 0usize;
        while chunks.len() > handle.index() + 1 {
            if let Some(chunk) = chunks.pop() {
                debug_assert_eq!(chunk.previous().map(|h| h.index()), Some(chunks.len() - 1));
                unsafe { did_deallocate_bytes(chunk.start(), chunk.capacity()) };
                discarded += 1;
            }
        }
        self.cursor.set(saved);

        if discarded > 0 {
            core_debug!(
                "{}: rewind discarded {} chunk(s), chunk #{} is active again",
                self.label,
                discarded,
                handle.index()
            );
        }
    }

    /// Takes a rewind state now and rewinds to it when the guard is dropped.
    pub fn make_rewind_guard(&mut self) -> RewindGuard<'_> {
        let state = self.prepare_for_rewind();
        RewindGuard {
            allocator: self,
            state: Some(state),
        }
    }
}
