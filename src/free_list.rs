//! Free-list engine: the address-ordered singly-linked list of free blocks,
//! and the split/merge algebra that keeps it free of adjacent free-block
//! pairs.
//!
//! [`RegionHeap`] owns the arena state: the `start` sentinel, the `end`
//! pointer, the free-byte/free-block counters and the watermark. Region
//! registration lives in [`crate::region`]; this module is the sole mutator
//! once registration has happened.

use core::ptr::null_mut;

use crate::critical_section;
use crate::header::{align_up, allocated_flag, header_size, min_block_size, Header};
use crate::region::Config;

/// The core allocator state: the free list plus its bookkeeping counters.
///
/// `RegionHeap` is the raw handle — it works directly against caller-chosen
/// memory and is usable without going through [`crate::Allocator`]'s
/// `GlobalAlloc` wrapper, the same way `emballoc`'s internal raw allocator
/// is usable on its own terms, wrapped only for the `GlobalAlloc` seam.
pub struct RegionHeap<const A: usize> {
    /// Non-embedded sentinel; `start.next_free` is the lowest-address free
    /// block once initialised.
    pub(crate) start: Header,
    /// Tail sentinel of the *current last* region. `size == 0`,
    /// `next_free == null`. A free block whose `next_free` equals `end` has
    /// no successor.
    pub(crate) end: *mut Header,
    pub(crate) free_bytes_remaining: usize,
    pub(crate) min_ever_free_bytes_remaining: usize,
    pub(crate) free_block_count: usize,
    pub(crate) initialised: bool,
    pub(crate) fail_callback: Option<fn(usize)>,
    pub(crate) best_fit_depth_cap: Option<core::num::NonZeroUsize>,
}

// SAFETY: all mutable access to the pointers embedded in the arena happens
// exclusively through `&mut self`/the critical section, never concurrently;
// the raw pointers themselves carry no thread affinity.
unsafe impl<const A: usize> Send for RegionHeap<A> {}

impl<const A: usize> RegionHeap<A> {
    /// Force evaluation of the `A ∈ {4, 8}` contract at monomorphization
    /// time; see [`crate::header::assert_valid_alignment`].
    const ASSERT_VALID_ALIGNMENT: () = crate::header::assert_valid_alignment::<A>();

    /// Construct an empty, uninitialised heap. Call [`Self::init`] before
    /// any allocation.
    pub const fn new() -> Self {
        let _ = Self::ASSERT_VALID_ALIGNMENT;
        Self {
            start: Header {
                size: 0,
                next_free: null_mut(),
            },
            end: null_mut(),
            free_bytes_remaining: 0,
            min_ever_free_bytes_remaining: 0,
            free_block_count: 0,
            initialised: false,
            fail_callback: None,
            best_fit_depth_cap: None,
        }
    }

    pub(crate) fn config(&mut self, config: Config) {
        self.fail_callback = config.fail_callback;
        self.best_fit_depth_cap = config.best_fit_depth_cap;
    }

    /// Allocate `n` bytes, returning a payload pointer or null.
    ///
    /// `n == 0` and requests with the allocated-flag bit set return null
    /// without invoking the failure callback (a bad-size rejection, not an
    /// out-of-memory condition); every other failure invokes the registered
    /// callback, outside the critical section, with the original `n`.
    pub fn malloc(&mut self, n: usize) -> *mut u8 {
        if !self.initialised {
            return null_mut();
        }
        if n == 0 || (n & allocated_flag()) != 0 {
            return null_mut();
        }

        let want = {
            let requested = align_up::<A>(n + header_size::<A>());
            core::cmp::max(requested, min_block_size::<A>())
        };

        // Step 3: a cheap byte-budget check that skips the list walk
        // entirely, but still counts as an out-of-memory failure for the
        // purposes of the registered callback below.
        let payload = if want > self.free_bytes_remaining {
            null_mut()
        } else {
            let _guard = critical_section::enter();
            self.malloc_locked(want)
        };

        if payload.is_null() {
            if let Some(cb) = self.fail_callback {
                cb(n);
            }
        }
        payload
    }

    /// `malloc(count * size)` followed by a zero-fill of the payload.
    pub fn calloc(&mut self, count: usize, size: usize) -> *mut u8 {
        let total = match count.checked_mul(size) {
            Some(total) => total,
            None => return null_mut(),
        };
        let ptr = self.malloc(total);
        if !ptr.is_null() {
            // SAFETY: `malloc` returns either null or a pointer to exactly
            // `total` freshly-owned, unaliased bytes.
            unsafe { core::ptr::write_bytes(ptr, 0, total) };
        }
        ptr
    }

    fn malloc_locked(&mut self, want: usize) -> *mut u8 {
        let sentinel: *mut Header = &raw mut self.start;

        let mut prev: *mut Header = sentinel;
        // SAFETY: `sentinel` is always valid; `cur` walks the free list,
        // which is well-formed by the loop invariant.
        let mut cur: *mut Header = unsafe { (*prev).next_free };
        while !core::ptr::eq(cur, self.end) && unsafe { (*cur).size } < want {
            prev = cur;
            cur = unsafe { (*cur).next_free };
        }
        if core::ptr::eq(cur, self.end) {
            return null_mut();
        }

        let (mut prev_win, mut cur_win) = (prev, cur);

        #[cfg(feature = "best-fit")]
        if unsafe { (*cur_win).size } - want > min_block_size::<A>() {
            let mut depth = 0usize;
            let mut p = cur_win;
            let mut c = unsafe { (*p).next_free };
            while !core::ptr::eq(c, self.end) {
                if let Some(cap) = self.best_fit_depth_cap {
                    if depth >= cap.get() {
                        break;
                    }
                }
                let csize = unsafe { (*c).size };
                if csize >= want && csize - want <= min_block_size::<A>() {
                    prev_win = p;
                    cur_win = c;
                }
                p = c;
                c = unsafe { (*c).next_free };
                depth += 1;
            }
        }

        // Unlink the winner.
        unsafe {
            (*prev_win).next_free = (*cur_win).next_free;
        }
        self.free_block_count -= 1;

        let original_size = unsafe { (*cur_win).size };
        if original_size - want > min_block_size::<A>() {
            let split_addr = (cur_win as usize) + want;
            let split_ptr = split_addr as *mut Header;
            unsafe {
                (*split_ptr).size = original_size - want;
                (*split_ptr).next_free = null_mut();
                (*cur_win).size = want;
            }
            self.insert_into_free_list(split_ptr);
        }

        let alloc_size = unsafe { (*cur_win).size };
        self.free_bytes_remaining -= alloc_size;
        if self.free_bytes_remaining < self.min_ever_free_bytes_remaining {
            self.min_ever_free_bytes_remaining = self.free_bytes_remaining;
        }

        unsafe {
            (*cur_win).size = alloc_size | allocated_flag();
            (*cur_win).next_free = null_mut();
        }

        ((cur_win as usize) + header_size::<A>()) as *mut u8
    }

    /// Release a pointer previously returned by [`Self::malloc`] or
    /// [`Self::calloc`]. `ptr == NULL` and calls before [`Self::init`] are
    /// no-ops.
    ///
    /// # Safety
    /// `ptr` must either be null or have been produced by this allocator's
    /// `malloc`/`calloc` and not yet freed.
    pub unsafe fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() || !self.initialised {
            return;
        }
        let header = (ptr as usize - header_size::<A>()) as *mut Header;

        // SAFETY: caller contract above.
        let size_field = unsafe { (*header).size };
        // SAFETY: see above.
        let next_free = unsafe { (*header).next_free };
        let is_allocated = size_field & allocated_flag() != 0;
        if !is_allocated || !next_free.is_null() {
            // Corrupt header: allocated flag clear, or a non-null
            // `next_free` on a block claiming to be allocated. This is a
            // programming error (double free, or a foreign pointer); debug
            // builds assert, release builds silently no-op.
            #[cfg(feature = "log")]
            log::error!("regionalloc: corrupt header on free at {:p}", header);
            debug_assert!(is_allocated, "regionalloc: free() of a non-allocated block");
            debug_assert!(
                next_free.is_null(),
                "regionalloc: free() of a block with a dangling next_free"
            );
            return;
        }

        let size = size_field & !allocated_flag();
        // SAFETY: see above; this clears the allocated flag ahead of
        // reinsertion into the free list.
        unsafe {
            (*header).size = size;
        }

        {
            let _guard = critical_section::enter();
            self.free_bytes_remaining += size;
            self.insert_into_free_list(header);
        }
    }

    /// Insert `block` into the free list in address order, merging with an
    /// adjacent predecessor and/or successor. Shared by the split path of
    /// [`Self::malloc_locked`] and by [`Self::free`].
    pub(crate) fn insert_into_free_list(&mut self, block: *mut Header) {
        self.free_block_count += 1;

        let sentinel: *mut Header = &raw mut self.start;
        let mut iter: *mut Header = sentinel;
        // SAFETY: the free list is well-formed by the loop invariant; this
        // walk only reads `next_free`/the sentinel, both always valid.
        while (unsafe { (*iter).next_free } as usize) < (block as usize) {
            iter = unsafe { (*iter).next_free };
        }

        let left_mergeable = !core::ptr::eq(iter, sentinel)
            && (iter as usize) + unsafe { (*iter).size } == block as usize;
        if left_mergeable {
            unsafe {
                (*iter).size += (*block).size;
            }
            self.free_block_count -= 1;
        }
        let insert_point: *mut Header = if left_mergeable { iter } else { block };

        let successor = unsafe { (*iter).next_free };
        let right_mergeable = !core::ptr::eq(successor, self.end)
            && (insert_point as usize) + unsafe { (*insert_point).size } == successor as usize;
        if right_mergeable {
            unsafe {
                (*insert_point).size += (*successor).size;
                (*insert_point).next_free = (*successor).next_free;
            }
            self.free_block_count -= 1;
        } else {
            unsafe {
                (*insert_point).next_free = successor;
            }
        }

        if !left_mergeable {
            unsafe {
                (*iter).next_free = insert_point;
            }
        }
    }
}
