use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// Flag and address bits shared by page-directory and page-table entries
/// (32-bit paging, 4 KiB pages).
///
/// The low 12 bits are flags, the high 20 bits are the physical base of
/// the referenced frame. A non-present entry keeps only the writable bit
/// set, so unmapped slots are visibly distinct from all-zero memory when
/// inspecting a table.
#[bitfield(u32)]
pub struct PageEntryBits {
    /// Bit 0 — P: entry refers to a frame that is mapped in.
    pub present: bool,

    /// Bit 1 — R/W: writes allowed through this entry.
    pub writable: bool,

    /// Bit 2 — U/S: accessible from user mode (ring 3).
    pub user_access: bool,

    /// Bit 3 — PWT: write-through caching for the referenced frame.
    pub write_through: bool,

    /// Bit 4 — PCD: caching disabled for the referenced frame.
    pub cache_disable: bool,

    /// Bit 5 — A: set by the processor on first access.
    pub accessed: bool,

    /// Bit 6 — D: set by the processor on first write (PTE only).
    pub dirty: bool,

    /// Bits 7–11 — PS/PAT/G and software-available bits, unused here.
    #[bits(5, default = 0)]
    _available: u8,

    /// Bits 12–31 — physical frame base >> 12.
    #[bits(20)]
    frame_base_4k: u32,
}

impl PageEntryBits {
    /// The marker written into unmapped slots: not present, writable.
    #[must_use]
    pub const fn blank() -> Self {
        Self::new().with_writable(true)
    }

    /// Present, writable, supervisor-only. The standard flag set for
    /// kernel mappings and for directory entries pointing at tables.
    #[must_use]
    pub const fn kernel_rw() -> Self {
        Self::new().with_present(true).with_writable(true)
    }

    /// Physical base address of the referenced frame.
    #[must_use]
    pub const fn frame_phys(self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame_base_4k() << 12)
    }

    /// Points the entry at the frame starting at `pa`.
    ///
    /// `pa` must be 4 KiB-aligned.
    #[must_use]
    pub fn with_frame_phys(self, pa: PhysicalAddress) -> Self {
        debug_assert!(pa.is_frame_aligned(), "entry target must be 4K-aligned");
        self.with_frame_base_4k(pa.as_u32() >> 12)
    }
}
