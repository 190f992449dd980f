use crate::bitmap::{FrameBitmap, FrameState};
use crate::needed_info_frames;
use kernel_memory_addresses::{Frame, PhysMapper};
use log::{debug, trace};

/// First-fit allocator for contiguous runs of physical frames.
///
/// A pool manages one fixed region `[base_frame, base_frame + n_frames)` of
/// physical memory. [`get_frames`](Self::get_frames) hands out the lowest
/// run of `k` contiguous free frames; [`release_frames`](Self::release_frames)
/// takes back a run given only its head frame.
///
/// The per-frame state bitmap lives in metadata frames. A pool constructed
/// with `info_frame = None` hosts its own metadata at the start of its
/// region and reserves those frames before anything else can claim them.
pub struct ContiguousFramePool<'m, M: PhysMapper> {
    base_frame: Frame,
    n_frames: usize,
    free_count: usize,
    bitmap: FrameBitmap<'m, M>,
}

impl<'m, M: PhysMapper> ContiguousFramePool<'m, M> {
    /// Creates a pool over `[base_frame, base_frame + n_frames)`.
    ///
    /// `info_frame` is the first of [`needed_info_frames`]`(n_frames)`
    /// metadata frames, donated from outside the managed region. With
    /// `None` the pool is self-hosting: the metadata occupies the first
    /// frames of the region and is marked inaccessible here.
    ///
    /// All frames start out [`FrameState::Free`] (minus self-hosted
    /// metadata).
    ///
    /// # Panics
    ///
    /// Panics if `n_frames` is zero, if the metadata capacity does not
    /// cover `n_frames`, or if a donated `info_frame` range overlaps the
    /// managed region.
    pub fn new(mapper: &'m M, base_frame: Frame, n_frames: usize, info_frame: Option<Frame>) -> Self {
        assert!(n_frames > 0, "frame pool cannot be empty");
        let n_info_frames = needed_info_frames(n_frames);
        let self_hosted = info_frame.is_none();
        let first_info_frame = info_frame.unwrap_or(base_frame);

        if self_hosted {
            assert!(
                n_info_frames < n_frames,
                "region of {n_frames} frame(s) cannot self-host {n_info_frames} metadata frame(s)"
            );
        } else {
            let info_start = first_info_frame.number();
            let info_end = info_start + n_info_frames as u32;
            let base = base_frame.number();
            let end = base + n_frames as u32;
            assert!(
                info_end <= base || info_start >= end,
                "donated metadata frames [{info_start}, {info_end}) overlap managed region [{base}, {end})"
            );
        }

        let bitmap = FrameBitmap::new(mapper, first_info_frame, n_info_frames, n_frames);
        let mut pool = Self {
            base_frame,
            n_frames,
            free_count: n_frames,
            bitmap,
        };
        if self_hosted {
            pool.mark_inaccessible(base_frame, n_info_frames);
        }
        debug!(
            "frame pool over [{}, {}): {} usable frame(s), metadata at {}",
            base_frame.number(),
            base_frame.number() + n_frames as u32,
            pool.free_count,
            first_info_frame.number(),
        );
        pool
    }

    /// First frame of the managed region.
    #[must_use]
    pub const fn base_frame(&self) -> Frame {
        self.base_frame
    }

    /// Total number of managed frames, including reserved ones.
    #[must_use]
    pub const fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// Number of frames currently free.
    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.free_count
    }

    /// Whether `frame` lies within the managed region.
    #[must_use]
    pub fn contains(&self, frame: Frame) -> bool {
        let n = frame.number();
        let base = self.base_frame.number();
        n >= base && n - base < self.n_frames as u32
    }

    /// Reads the allocation state of a managed frame.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is outside the managed region.
    #[must_use]
    pub fn state(&self, frame: Frame) -> FrameState {
        self.bitmap.get(self.index_of(frame))
    }

    /// Allocates the lowest-addressed run of `n` contiguous free frames and
    /// returns its head frame.
    ///
    /// The search is strictly first-fit from the bottom of the region, so
    /// identical request sequences against identical pool states yield
    /// identical placements.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero, if fewer than `n` frames are free, or if the
    /// free frames exist but no run of `n` is contiguous (fragmentation).
    /// Frame exhaustion in a kernel with no swap is unrecoverable.
    pub fn get_frames(&mut self, n: usize) -> Frame {
        assert!(n > 0, "cannot allocate an empty frame sequence");
        assert!(
            self.free_count >= n,
            "out of physical frames: {n} requested, {} free in pool at {}",
            self.free_count,
            self.base_frame.number(),
        );

        let mut start = 0;
        'candidate: while start + n <= self.n_frames {
            for index in start..start + n {
                if self.bitmap.get(index) != FrameState::Free {
                    start = index + 1;
                    continue 'candidate;
                }
            }
            self.claim(start, n);
            let head = self.base_frame + start as u32;
            trace!("allocated {n} frame(s) at {}", head.number());
            return head;
        }
        panic!(
            "pool at {} too fragmented for {n} contiguous frame(s) ({} free)",
            self.base_frame.number(),
            self.free_count,
        );
    }

    /// Reserves `n` frames starting at `base`, removing them from the
    /// allocatable set. Used for memory holes and self-hosted metadata.
    ///
    /// # Panics
    ///
    /// Panics if the range escapes the managed region or if any frame in it
    /// is not currently free.
    pub fn mark_inaccessible(&mut self, base: Frame, n: usize) {
        assert!(n > 0, "cannot reserve an empty frame range");
        let start = self.index_of(base);
        assert!(
            start + n <= self.n_frames,
            "reserved range [{}, +{n}) escapes pool at {}",
            base.number(),
            self.base_frame.number(),
        );
        for index in start..start + n {
            assert!(
                self.bitmap.get(index) == FrameState::Free,
                "frame {} is already in use and cannot be reserved",
                self.base_frame.number() + index as u32,
            );
        }
        self.claim(start, n);
        debug!("reserved {n} frame(s) at {}", base.number());
    }

    /// Releases the run headed by `head` and returns its length.
    ///
    /// Frees the head, then every following `Allocated` frame up to the
    /// next `Free` or `HeadOfSequence` frame or the end of the region.
    ///
    /// # Panics
    ///
    /// Panics if `head` is outside the managed region or is not the head of
    /// an allocated sequence.
    pub fn release_frames(&mut self, head: Frame) -> usize {
        let start = self.index_of(head);
        assert!(
            self.bitmap.get(start) == FrameState::HeadOfSequence,
            "frame {} is not the head of an allocated sequence",
            head.number(),
        );
        self.bitmap.set(start, FrameState::Free);
        let mut freed = 1;
        for index in start + 1..self.n_frames {
            if self.bitmap.get(index) != FrameState::Allocated {
                break;
            }
            self.bitmap.set(index, FrameState::Free);
            freed += 1;
        }
        self.free_count += freed;
        trace!("released {freed} frame(s) at {}", head.number());
        freed
    }

    /// Marks `[start, start + n)` as one allocated sequence.
    /// Caller has verified all frames in the range are free.
    fn claim(&mut self, start: usize, n: usize) {
        self.bitmap.set(start, FrameState::HeadOfSequence);
        for index in start + 1..start + n {
            self.bitmap.set(index, FrameState::Allocated);
        }
        self.free_count -= n;
    }

    /// Bitmap index of a frame inside the managed region.
    ///
    /// # Panics
    ///
    /// Panics if `frame` lies below or beyond the region.
    fn index_of(&self, frame: Frame) -> usize {
        assert!(
            self.contains(frame),
            "frame {} is outside pool [{}, {})",
            frame.number(),
            self.base_frame.number(),
            self.base_frame.number() + self.n_frames as u32,
        );
        (frame.number() - self.base_frame.number()) as usize
    }
}
