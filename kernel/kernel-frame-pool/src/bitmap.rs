use kernel_memory_addresses::{Frame, PAGE_SIZE, PhysMapper, PhysicalAddress};

/// 2-bit states per byte.
const STATES_PER_BYTE: usize = 4;

/// Frame states tracked by a single metadata frame.
pub const FRAMES_PER_INFO_FRAME: usize = STATES_PER_BYTE * PAGE_SIZE;

/// Allocation state of one physical frame.
///
/// Two bits per frame, so a run of allocated frames can record where it
/// starts. The all-zero pattern decodes to [`Allocated`](Self::Allocated):
/// uninitialized or cleared metadata reads as "in use" rather than handing
/// out frames the pool never initialized.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum FrameState {
    /// In use, continuation of a sequence.
    Allocated = 0b00,
    /// In use, first frame of a sequence.
    HeadOfSequence = 0b01,
    /// Available for allocation.
    Free = 0b11,
}

impl FrameState {
    const fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a 2-bit state code.
    ///
    /// # Panics
    ///
    /// Panics on the unassigned code `0b10`, which can only appear if the
    /// metadata frame was corrupted or written by something else.
    fn decode(code: u8, frame_index: usize) -> Self {
        match code {
            0b00 => Self::Allocated,
            0b01 => Self::HeadOfSequence,
            0b11 => Self::Free,
            _ => panic!("corrupt frame state code 0b10 at bitmap index {frame_index}"),
        }
    }
}

/// A packed array of [`FrameState`]s stored inside metadata frames.
///
/// States are packed four to a byte, most significant pair first: index 0
/// occupies bits 7..6 of byte 0, index 3 occupies bits 1..0. The metadata
/// lives in physical frames and is reached through the [`PhysMapper`] on
/// every access, so the info frames need not be mapped contiguously in the
/// kernel's own address space.
pub struct FrameBitmap<'m, M: PhysMapper> {
    mapper: &'m M,
    first_info_frame: Frame,
    n_info_frames: usize,
    n_tracked: usize,
}

impl<'m, M: PhysMapper> FrameBitmap<'m, M> {
    /// Creates a bitmap tracking `n_tracked` frames inside the metadata
    /// region starting at `first_info_frame`, and initializes every tracked
    /// state to [`FrameState::Free`].
    ///
    /// # Panics
    ///
    /// Panics if `n_info_frames` metadata frames cannot hold `n_tracked`
    /// states.
    pub fn new(mapper: &'m M, first_info_frame: Frame, n_info_frames: usize, n_tracked: usize) -> Self {
        assert!(
            n_tracked <= n_info_frames * FRAMES_PER_INFO_FRAME,
            "{n_info_frames} info frame(s) cannot track {n_tracked} frames"
        );
        let mut bitmap = Self {
            mapper,
            first_info_frame,
            n_info_frames,
            n_tracked,
        };
        for index in 0..n_tracked {
            bitmap.set(index, FrameState::Free);
        }
        bitmap
    }

    /// Number of tracked frames.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.n_tracked
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.n_tracked == 0
    }

    /// First metadata frame backing this bitmap.
    #[must_use]
    pub const fn first_info_frame(&self) -> Frame {
        self.first_info_frame
    }

    /// Number of metadata frames backing this bitmap.
    #[must_use]
    pub const fn info_frame_count(&self) -> usize {
        self.n_info_frames
    }

    /// Reads the state at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or the stored code is corrupt.
    #[must_use]
    pub fn get(&self, index: usize) -> FrameState {
        assert!(index < self.n_tracked, "bitmap index {index} out of range");
        let byte = *self.byte_mut(index / STATES_PER_BYTE);
        FrameState::decode((byte >> Self::shift_for(index)) & 0b11, index)
    }

    /// Writes the state at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn set(&mut self, index: usize, state: FrameState) {
        assert!(index < self.n_tracked, "bitmap index {index} out of range");
        let shift = Self::shift_for(index);
        let byte = self.byte_mut(index / STATES_PER_BYTE);
        *byte = (*byte & !(0b11u8 << shift)) | (state.code() << shift);
    }

    /// Bit position of the state pair for `index` within its byte.
    /// Index 0 sits in the most significant pair.
    const fn shift_for(index: usize) -> u8 {
        (6 - 2 * (index % STATES_PER_BYTE)) as u8
    }

    fn byte_mut(&self, byte_index: usize) -> &mut u8 {
        let info_frame = self.first_info_frame + (byte_index / PAGE_SIZE) as u32;
        let pa = PhysicalAddress::from(info_frame);
        // SAFETY: the metadata frames are exclusively owned by this bitmap
        // and a raw byte array is valid for any frame contents.
        let bytes: &mut [u8; PAGE_SIZE] = unsafe { self.mapper.phys_to_mut(pa) };
        &mut bytes[byte_index % PAGE_SIZE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestPhys;

    #[test]
    fn new_bitmap_is_all_free() {
        let phys = TestPhys::with_frames(2);
        let bitmap = FrameBitmap::new(&phys, Frame::from_number(0), 1, 64);
        for index in 0..64 {
            assert_eq!(bitmap.get(index), FrameState::Free);
        }
    }

    #[test]
    fn states_pack_four_per_byte_msb_first() {
        let phys = TestPhys::with_frames(1);
        let mut bitmap = FrameBitmap::new(&phys, Frame::from_number(0), 1, 8);
        bitmap.set(0, FrameState::HeadOfSequence);
        bitmap.set(1, FrameState::Allocated);
        // Indices 2 and 3 remain Free.
        let byte0 = unsafe { *phys.frame_bytes(0) };
        assert_eq!(byte0, 0b01_00_11_11);
        assert_eq!(bitmap.get(0), FrameState::HeadOfSequence);
        assert_eq!(bitmap.get(1), FrameState::Allocated);
        assert_eq!(bitmap.get(2), FrameState::Free);
    }

    #[test]
    fn set_does_not_disturb_neighbors() {
        let phys = TestPhys::with_frames(1);
        let mut bitmap = FrameBitmap::new(&phys, Frame::from_number(0), 1, 12);
        bitmap.set(5, FrameState::HeadOfSequence);
        bitmap.set(6, FrameState::Allocated);
        bitmap.set(6, FrameState::Free);
        assert_eq!(bitmap.get(4), FrameState::Free);
        assert_eq!(bitmap.get(5), FrameState::HeadOfSequence);
        assert_eq!(bitmap.get(6), FrameState::Free);
        assert_eq!(bitmap.get(7), FrameState::Free);
    }

    #[test]
    fn states_span_info_frame_boundary() {
        let phys = TestPhys::with_frames(2);
        let n = FRAMES_PER_INFO_FRAME + 8;
        let mut bitmap = FrameBitmap::new(&phys, Frame::from_number(0), 2, n);
        bitmap.set(FRAMES_PER_INFO_FRAME, FrameState::HeadOfSequence);
        bitmap.set(FRAMES_PER_INFO_FRAME + 1, FrameState::Allocated);
        assert_eq!(bitmap.get(FRAMES_PER_INFO_FRAME - 1), FrameState::Free);
        assert_eq!(bitmap.get(FRAMES_PER_INFO_FRAME), FrameState::HeadOfSequence);
        // The second info frame holds the spilled states.
        let byte = unsafe { *phys.frame_bytes(1) };
        assert_eq!(byte, 0b01_00_11_11);
    }

    #[test]
    #[should_panic(expected = "corrupt frame state code")]
    fn corrupt_state_code_is_fatal() {
        let phys = TestPhys::with_frames(1);
        let bitmap = FrameBitmap::new(&phys, Frame::from_number(0), 1, 4);
        // Stamp the unassigned code 0b10 into the pair for index 0.
        unsafe { *phys.frame_bytes(0) = 0b10_11_11_11 };
        let _ = bitmap.get(0);
    }

    #[test]
    #[should_panic(expected = "cannot track")]
    fn capacity_overflow_is_fatal() {
        let phys = TestPhys::with_frames(1);
        let _ = FrameBitmap::new(&phys, Frame::from_number(0), 1, FRAMES_PER_INFO_FRAME + 1);
    }
}
