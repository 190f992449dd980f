use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// CR3 — Page-Directory Base Register (32-bit paging, no PAE).
///
/// Holds the physical base address of the current page directory and
/// cache-control flags for directory walks. Assumes standard 4 KiB
/// alignment of the directory.
#[bitfield(u32)]
pub struct Cr3 {
    /// Bits 0–2 — Reserved (must be 0).
    #[bits(3)]
    pub reserved0: u8,

    /// Bit 3 — PWT: Page-level Write-Through for the directory.
    ///
    /// Controls write-through vs write-back caching when the processor
    /// accesses the page directory via CR3.
    pub pwt: bool,

    /// Bit 4 — PCD: Page-level Cache Disable for the directory.
    ///
    /// When set, disables caching for page-directory accesses.
    pub pcd: bool,

    /// Bits 5–11 — Reserved (must be 0 when written).
    #[bits(7)]
    pub reserved1: u8,

    /// Bits 12–31 — Page-directory physical base >> 12.
    ///
    /// These bits store the physical base address of the page directory,
    /// shifted right by 12 (4 KiB alignment). To get the full physical
    /// address: `directory_base_phys = directory_base_4k << 12`.
    #[bits(20)]
    directory_base_4k: u32,
}

impl Cr3 {
    /// Create a `Cr3` value from a page-directory physical base and flags.
    ///
    /// `directory_phys` must be 4 KiB-aligned.
    #[must_use]
    pub fn from_directory_phys(directory_phys: PhysicalAddress, pwt: bool, pcd: bool) -> Self {
        debug_assert!(
            directory_phys.is_frame_aligned(),
            "page directory base must be 4K-aligned"
        );
        let mut cr3 = Self::new();
        cr3.set_pwt(pwt);
        cr3.set_pcd(pcd);
        cr3.set_directory_base_4k(directory_phys.as_u32() >> 12);
        cr3
    }

    /// Return the full physical address of the page-directory base.
    #[must_use]
    pub const fn directory_phys(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.directory_base_4k() << 12)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl crate::LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let cr3: u32;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl crate::StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_base_round_trip() {
        let base = PhysicalAddress::new(0x0010_3000);
        let cr3 = Cr3::from_directory_phys(base, false, false);
        assert_eq!(cr3.directory_phys(), base);
        assert_eq!(cr3.into_bits(), 0x0010_3000);
    }

    #[test]
    fn flags_do_not_disturb_base() {
        let base = PhysicalAddress::new(0x0020_0000);
        let cr3 = Cr3::from_directory_phys(base, true, true);
        assert!(cr3.pwt());
        assert!(cr3.pcd());
        assert_eq!(cr3.directory_phys(), base);
    }
}
