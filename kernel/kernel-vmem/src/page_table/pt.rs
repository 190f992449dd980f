//! # Page Table (lower level)
//!
//! - [`PtIndex`]: index type for VA bits `[21:12]`.
//! - [`PtEntry`]: a table entry; when present it maps one 4 KiB page.
//! - [`PageTable`]: a 4 KiB-aligned array of 1024 entries.

use super::ENTRY_COUNT;
use crate::PageEntryBits;
use kernel_memory_addresses::{Frame, PhysicalAddress, VirtualAddress};

/// Index into a page table (derived from VA bits `[21:12]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct PtIndex(u16);

/// A single page-table entry (PTE).
///
/// A present PTE maps exactly one 4 KiB page.
#[doc(alias = "PTE")]
#[repr(transparent)]
#[derive(Copy, Clone)]
pub struct PtEntry(PageEntryBits);

/// A page table: 1024 entries, one physical frame, covering 4 MiB of
/// virtual address space.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PtEntry; ENTRY_COUNT],
}

impl PtIndex {
    /// Extracts the table index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn from_va(va: VirtualAddress) -> Self {
        Self::new(((va.as_u32() >> 12) & 0x3FF) as u16)
    }

    /// Constructs from a raw `u16`, asserting `v < 1024` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < ENTRY_COUNT as u16);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl PtEntry {
    /// An unmapped slot (not present, writable marker bit kept).
    #[inline]
    #[must_use]
    pub const fn blank() -> Self {
        Self(PageEntryBits::blank())
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// Creates a present PTE mapping the page at `frame`.
    ///
    /// Forces `present=1`.
    #[inline]
    #[must_use]
    pub fn make_page(frame: Frame, flags: PageEntryBits) -> Self {
        Self(flags.with_present(true).with_frame_phys(frame.base()))
    }

    /// If present, returns the physical base of the mapped frame.
    #[inline]
    #[must_use]
    pub const fn page_phys(self) -> Option<PhysicalAddress> {
        if self.is_present() {
            Some(self.0.frame_phys())
        } else {
            None
        }
    }

    /// Exposes the underlying bitfield for inspection.
    #[inline]
    #[must_use]
    pub const fn flags(self) -> PageEntryBits {
        self.0
    }
}

impl PageTable {
    /// Marks every entry unmapped.
    ///
    /// Used to initialize a table in place inside a freshly allocated
    /// frame, whose previous contents are arbitrary.
    pub const fn reset(&mut self) {
        let mut i = 0;
        while i < ENTRY_COUNT {
            self.entries[i] = PtEntry::blank();
            i += 1;
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: PtIndex) -> PtEntry {
        self.entries[i.as_usize()]
    }

    /// Writes the entry at `i`.
    ///
    /// Changing an entry of a live mapping requires a TLB flush before
    /// the change is reliably visible.
    #[inline]
    pub const fn set(&mut self, i: PtIndex, e: PtEntry) {
        self.entries[i.as_usize()] = e;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pte_round_trips_frame() {
        let frame = Frame::from_number(0x555);
        let e = PtEntry::make_page(frame, PageEntryBits::kernel_rw());
        assert!(e.is_present());
        assert_eq!(e.page_phys(), Some(frame.base()));
    }

    #[test]
    fn blank_pte_maps_nothing() {
        let e = PtEntry::blank();
        assert!(!e.is_present());
        assert_eq!(e.page_phys(), None);
    }
}
