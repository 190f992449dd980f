use crate::{PAGE_SHIFT, PhysicalAddress};
use core::fmt;
use core::ops::Add;

/// Typed handle for one physical page frame.
///
/// A `Frame` carries the absolute, pool-independent **frame number** of a
/// 4 KiB unit of physical memory (physical address `>> PAGE_SHIFT`). It is
/// the only currency the frame pools and the paging layer exchange: flag
/// bits never travel inside a `Frame`.
///
/// ### Invariants
/// - `base()` is always frame aligned (low [`PAGE_SHIFT`](crate::PAGE_SHIFT)
///   bits zero).
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let frame = Frame::from_number(0x300);
/// assert_eq!(frame.base().as_u32(), 0x0030_0000);
/// assert_eq!(Frame::containing(PhysicalAddress::new(0x0030_0FFF)), frame);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Frame(u32);

impl Frame {
    /// Build a frame handle from an absolute frame number.
    #[inline]
    #[must_use]
    pub const fn from_number(number: u32) -> Self {
        Self(number)
    }

    /// The frame containing the given physical address.
    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysicalAddress) -> Self {
        Self(pa.as_u32() >> PAGE_SHIFT)
    }

    /// Absolute frame number.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0
    }

    /// Physical address of the first byte of this frame.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << PAGE_SHIFT)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({} @ {})", self.number(), self.base())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl Add<u32> for Frame {
    type Output = Self;

    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.checked_add(rhs).expect("Frame add"))
    }
}
