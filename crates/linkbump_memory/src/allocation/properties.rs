use proptest::prelude::*;

use super::linked_bump::LinkedBumpAllocator;

/// (size, align) pairs with sizes that regularly overflow a small chunk.
fn requests(max_len: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec(
        (0usize..300, 0u32..7).prop_map(|(size, shift)| (size, 1usize << shift)),
        0..max_len,
    )
}

fn small_arena() -> LinkedBumpAllocator {
    LinkedBumpAllocator::builder()
        .label("properties")
        .chunk_capacity(256)
        .build()
}

/// Allocates every request and records (address, chunk count afterwards).
fn replay(arena: &LinkedBumpAllocator, requests: &[(usize, usize)]) -> Vec<(usize, usize)> {
    requests
        .iter()
        .map(|&(size, align)| {
            let ptr = arena.allocate_bytes(size, align);
            (ptr.as_ptr() as usize, arena.chunk_count())
        })
        .collect()
}

proptest! {
    #[test]
    fn allocations_are_aligned_and_disjoint(requests in requests(64)) {
        let arena = small_arena();
        let mut ranges = vec![];
        let mut last = None;

        for &(size, align) in &requests {
            let addr = arena.allocate_bytes(size, align).as_ptr() as usize;
            prop_assert_eq!(addr % align, 0);
            prop_assert!(arena.owns(addr as *const u8));

            // Within one chunk addresses only move forward.
            let chunks = arena.chunk_count();
            if let Some((prev_end, prev_chunks)) = last {
                if prev_chunks == chunks {
                    prop_assert!(addr >= prev_end);
                }
            }
            last = Some((addr + size, chunks));

            if size > 0 {
                ranges.push((addr, addr + size));
            }
        }

        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].0, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn chunks_never_hand_out_more_than_their_capacity(requests in requests(64)) {
        let arena = small_arena();
        let (mut capacity, mut used, mut chunks) = (0usize, 0usize, 0usize);

        for &(size, align) in &requests {
            let before = arena.remaining_bytes_in_current_chunk();
            arena.allocate_bytes(size, align);
            let after = arena.remaining_bytes_in_current_chunk();

            if arena.chunk_count() != chunks {
                chunks = arena.chunk_count();
                capacity = arena.chunk_capacity().max(size);
                prop_assert!(after <= capacity);
                used = capacity - after;
            } else {
                prop_assert!(after <= before);
                used += before - after;
            }
            prop_assert!(used >= size);
            prop_assert!(used <= capacity);
            prop_assert_eq!(used + after, capacity);
        }
    }

    #[test]
    fn rewind_is_as_if_nothing_happened(
        before in requests(32),
        during in requests(32),
        probe in requests(16),
    ) {
        let mut arena = small_arena();
        replay(&arena, &before);

        let chunks = arena.chunk_count();
        let remaining = arena.remaining_bytes_in_current_chunk();
        let expected = {
            let guard = arena.make_rewind_guard();
            let probed = replay(&guard, &probe);
            probed
        };
        prop_assert_eq!(arena.remaining_bytes_in_current_chunk(), remaining);

        let state = arena.prepare_for_rewind();
        replay(&arena, &during);
        arena.rewind(state);

        prop_assert_eq!(arena.chunk_count(), chunks);
        prop_assert_eq!(arena.remaining_bytes_in_current_chunk(), remaining);

        // Both replays start from the same position, so they match up to and
        // including the first request that spills into a fresh chunk. Where a
        // fresh chunk lands decides the padding of later requests.
        let actual = replay(&arena, &probe);
        prop_assert_eq!(expected.len(), actual.len());
        for (expected, actual) in expected.iter().zip(&actual) {
            prop_assert_eq!(expected.1, actual.1);
            if actual.1 != chunks {
                break;
            }
            prop_assert_eq!(expected.0, actual.0);
        }
    }

    #[test]
    fn grow_in_place_succeeds_iff_room_remains(
        before in requests(16),
        old_len in 0usize..64,
        extra in 0usize..300,
    ) {
        let arena = small_arena();
        replay(&arena, &before);
        let array = arena.allocate_uninitialized_slice::<u16>(old_len);
        let ptr = std::ptr::NonNull::from(array).cast::<u16>();
        let remaining = arena.remaining_bytes_in_current_chunk();

        let grown = arena.try_grow_array_in_place(ptr, old_len, old_len + extra);

        prop_assert_eq!(grown, extra * 2 <= remaining);
        if grown {
            prop_assert_eq!(arena.remaining_bytes_in_current_chunk(), remaining - extra * 2);
        } else {
            prop_assert_eq!(arena.remaining_bytes_in_current_chunk(), remaining);
        }
    }
}
