use bitfield_struct::bitfield;
use kernel_memory_addresses::VirtualAddress;
use thiserror::Error;

/// Error code pushed by the processor on a page-fault exception.
///
/// Bit 0 is the discriminator the fault handler cares about: clear means
/// the translation was simply not present (resolved by mapping a frame),
/// set means the access violated page-level protection.
#[bitfield(u32)]
pub struct PageFaultCode {
    /// Bit 0 — 0: page not present; 1: page-level protection violation.
    pub protection_violation: bool,

    /// Bit 1 — the faulting access was a write.
    pub caused_by_write: bool,

    /// Bit 2 — the fault originated in user mode (ring 3).
    pub user_mode: bool,

    /// Bit 3 — a reserved bit was set in a paging structure.
    pub reserved_bit_set: bool,

    /// Bit 4 — the fault was an instruction fetch.
    pub instruction_fetch: bool,

    #[bits(27, default = 0)]
    _reserved: u32,
}

impl PageFaultCode {
    /// One-line description of the fault class, for diagnostics.
    #[must_use]
    pub const fn explain(self) -> &'static str {
        if self.protection_violation() {
            "page-level protection violation"
        } else if self.caused_by_write() {
            "write to a non-present page"
        } else {
            "read from a non-present page"
        }
    }
}

/// A page fault as delivered to the memory manager: the faulting virtual
/// address (latched in CR2 by the processor) plus the pushed error code.
#[derive(Debug, Copy, Clone)]
pub struct PageFault {
    address: VirtualAddress,
    code: PageFaultCode,
}

impl PageFault {
    #[must_use]
    pub const fn new(address: VirtualAddress, code: PageFaultCode) -> Self {
        Self { address, code }
    }

    /// Captures the faulting address from CR2.
    ///
    /// # Safety
    ///
    /// Must be called from the page-fault exception handler, before any
    /// code that could fault again and overwrite CR2.
    #[cfg(all(feature = "asm", target_arch = "x86"))]
    #[must_use]
    pub unsafe fn from_cr2(code: PageFaultCode) -> Self {
        use kernel_registers::{Cr2, LoadRegisterUnsafe};
        // SAFETY: reading CR2 has no side effects; the caller guarantees
        // handler context.
        let cr2 = unsafe { Cr2::load_unsafe() };
        Self::new(cr2.fault_address(), code)
    }

    #[must_use]
    pub const fn address(self) -> VirtualAddress {
        self.address
    }

    #[must_use]
    pub const fn code(self) -> PageFaultCode {
        self.code
    }
}

/// Fault classes the memory manager refuses to resolve.
///
/// Only not-present faults are mapped on demand. Everything else is
/// reported back to the exception dispatcher, which decides whether to
/// kill the offending task or halt.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum FaultError {
    /// The page was present; the access itself was illegal.
    #[error("page-level protection violation at {address}")]
    ProtectionViolation { address: VirtualAddress },
}
