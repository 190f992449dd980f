//! # Contiguous Physical Frame Pools
//!
//! Allocation of **contiguous runs** of physical page frames over fixed
//! regions of physical memory.
//!
//! ## What you get
//!
//! - [`FrameState`] — per-frame allocation state, encoded in 2 bits.
//! - [`FrameBitmap`] — a packed array of frame states, stored inside
//!   dedicated metadata frames ("info frames").
//! - [`ContiguousFramePool`] — first-fit allocator for runs of `k`
//!   contiguous frames over one region `[base_frame, base_frame + n_frames)`.
//! - [`FramePoolRegistry`] — process-wide directory of pools; resolves a
//!   bare frame number back to its owning pool on release.
//!
//! ## How runs are tracked
//!
//! Tracking single free/used bits cannot represent *sequences*, so each
//! frame carries one of three states:
//!
//! - `Free` — available for allocation.
//! - `HeadOfSequence` — allocated, and the **first** frame of its run.
//! - `Allocated` — allocated, continuation of the run started by the
//!   nearest preceding `HeadOfSequence`.
//!
//! Releasing a run therefore needs nothing but the head's frame number:
//! the pool frees the head and walks forward until the next `Free` or
//! `HeadOfSequence` frame.
//!
//! ## Metadata frames
//!
//! The bitmap for `n` frames occupies [`needed_info_frames`]`(n)` metadata
//! frames. A pool may host its own bitmap at the start of its region
//! (in which case those frames are reserved before any allocation can
//! touch them), or use info frames donated from another pool's region.
//!
//! ## Error model
//!
//! All misuse — releasing a non-head frame, reserving allocated memory,
//! decoding a corrupt state code, exhausting the pool — is a logic error or
//! unrecoverable resource failure inside a kernel, and panics. No operation
//! signals failure through a sentinel return value.
//!
//! This crate performs no locking; the surrounding kernel serializes access
//! to each pool and to the registry (e.g. by disabling interrupts around
//! the critical section).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod bitmap;
mod pool;
mod registry;

pub use crate::bitmap::{FRAMES_PER_INFO_FRAME, FrameBitmap, FrameState};
pub use crate::pool::ContiguousFramePool;
pub use crate::registry::{FramePoolRegistry, MAX_POOLS, PoolHandle};

/// Number of metadata frames needed to track `n_frames` frame states.
///
/// One metadata frame packs `4 * PAGE_SIZE` 2-bit states.
///
/// ```rust
/// # use kernel_frame_pool::needed_info_frames;
/// # use kernel_memory_addresses::PAGE_SIZE;
/// assert_eq!(needed_info_frames(0), 0);
/// assert_eq!(needed_info_frames(1), 1);
/// assert_eq!(needed_info_frames(4 * PAGE_SIZE), 1);
/// assert_eq!(needed_info_frames(4 * PAGE_SIZE + 1), 2);
/// ```
#[must_use]
pub const fn needed_info_frames(n_frames: usize) -> usize {
    n_frames.div_ceil(FRAMES_PER_INFO_FRAME)
}

#[cfg(test)]
pub(crate) mod test_support {
    use kernel_memory_addresses::{PAGE_SIZE, PhysMapper, PhysicalAddress};

    /// A 4 KiB-aligned raw frame, used as "physical RAM" backing in tests.
    #[repr(align(4096))]
    pub(crate) struct Aligned4K(pub(crate) [u8; PAGE_SIZE]);

    /// Simulated physical memory: frame `i` lives at physical address
    /// `i * PAGE_SIZE`. Frames are individually allocated and need not be
    /// contiguous in host memory, which keeps per-frame translation honest.
    pub(crate) struct TestPhys {
        frames: Vec<Aligned4K>,
    }

    impl TestPhys {
        pub(crate) fn with_frames(n: usize) -> Self {
            let mut frames = Vec::with_capacity(n);
            for _ in 0..n {
                frames.push(Aligned4K([0u8; PAGE_SIZE]));
            }
            Self { frames }
        }

        pub(crate) fn frame_bytes(&self, index: usize) -> *mut u8 {
            (&raw const self.frames[index]).cast_mut().cast::<u8>()
        }
    }

    impl PhysMapper for TestPhys {
        unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
            let index = (pa.as_u32() as usize) / PAGE_SIZE;
            // Structured views always start at a frame boundary.
            debug_assert!(pa.is_frame_aligned());
            // SAFETY: the caller promises `T` matches the bytes in the frame.
            unsafe { &mut *self.frame_bytes(index).cast::<T>() }
        }
    }
}
