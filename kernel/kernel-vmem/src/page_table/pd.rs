//! # Page Directory (upper level)
//!
//! - [`PdIndex`]: index type for VA bits `[31:22]`.
//! - [`PdEntry`]: a directory entry; when present it points at a
//!   [`PageTable`](super::PageTable) frame.
//! - [`PageDirectory`]: a 4 KiB-aligned array of 1024 entries.

use super::ENTRY_COUNT;
use crate::PageEntryBits;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Index into the page directory (derived from VA bits `[31:22]`).
///
/// Strongly typed to avoid mixing with table indices. Range is `0..1024`
/// (checked in debug builds).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct PdIndex(u16);

/// A single page-directory entry (PDE).
///
/// A present PDE points at the physical frame holding a page table. All
/// flag bits live inside the inner [`PageEntryBits`].
#[doc(alias = "PDE")]
#[repr(transparent)]
#[derive(Copy, Clone)]
pub struct PdEntry(PageEntryBits);

/// The page directory: 1024 entries, one physical frame.
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PdEntry; ENTRY_COUNT],
}

impl PdIndex {
    /// Extracts the directory index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn from_va(va: VirtualAddress) -> Self {
        Self::new((va.as_u32() >> 22) as u16)
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

impl PdEntry {
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

    /// Creates a present PDE pointing at the page-table frame at `table_phys`.
    ///
    /// Forces `present=1`; `table_phys` must be 4 KiB-aligned.
    #[inline]
    #[must_use]
    pub fn make_table(table_phys: PhysicalAddress, flags: PageEntryBits) -> Self {
        Self(flags.with_present(true).with_frame_phys(table_phys))
    }

    /// If present, returns the physical base of the referenced page table.
    #[inline]
    #[must_use]
    pub const fn table_phys(self) -> Option<PhysicalAddress> {
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

impl PageDirectory {
    /// Marks every entry unmapped.
    ///
    /// Used to initialize a directory in place inside a freshly allocated
    /// frame, whose previous contents are arbitrary.
    pub const fn reset(&mut self) {
        let mut i = 0;
        while i < ENTRY_COUNT {
            self.entries[i] = PdEntry::blank();
            i += 1;
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: PdIndex) -> PdEntry {
        self.entries[i.as_usize()]
    }

    /// Writes the entry at `i`.
    ///
    /// Changing an entry of the active directory requires a TLB flush
    /// before the new mapping is reliably visible.
    #[inline]
    pub const fn set(&mut self, i: PdIndex, e: PdEntry) {
        self.entries[i.as_usize()] = e;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pde_round_trips_table_address() {
        let table = PhysicalAddress::new(0x0009_A000);
        let e = PdEntry::make_table(table, PageEntryBits::kernel_rw());
        assert!(e.is_present());
        assert_eq!(e.table_phys(), Some(table));
        assert!(e.flags().writable());
        assert!(!e.flags().user_access());
    }

    #[test]
    fn blank_pde_has_no_table() {
        let e = PdEntry::blank();
        assert!(!e.is_present());
        assert_eq!(e.table_phys(), None);
    }
}
