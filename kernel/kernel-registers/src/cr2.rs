use kernel_memory_addresses::VirtualAddress;

/// CR2 — Page-Fault Linear Address.
///
/// The processor latches the faulting linear (virtual) address here before
/// raising the page-fault exception. The whole 32-bit register is the
/// address; there are no flag bits.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Cr2(VirtualAddress);

impl Cr2 {
    #[must_use]
    pub const fn fault_address(self) -> VirtualAddress {
        self.0
    }
}

impl From<Cr2> for VirtualAddress {
    fn from(value: Cr2) -> Self {
        value.fault_address()
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl crate::LoadRegisterUnsafe for Cr2 {
    unsafe fn load_unsafe() -> Self {
        let cr2: u32;
        unsafe {
            core::arch::asm!("mov {}, cr2", out(reg) cr2, options(nomem, nostack, preserves_flags));
        }
        Self(VirtualAddress::new(cr2))
    }
}
