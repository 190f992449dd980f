//! # Typed x86 (32-bit protected mode) Registers
//!
//! Bit-exact models of the control registers the paging subsystem touches:
//!
//! - [`Cr0`](cr0::Cr0) — protection/paging control; bit 31 (PG) enables paging.
//! - [`Cr2`](cr2::Cr2) — linear address that caused the last page fault.
//! - [`Cr3`](cr3::Cr3) — physical base address of the current page directory.
//!
//! The models themselves are plain data and build everywhere; the privileged
//! `mov`-based accessors are gated behind the `asm` cargo feature and only
//! compile for `target_arch = "x86"`, so host test builds never reference
//! privileged instructions.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod cr0;
pub mod cr2;
pub mod cr3;

pub use crate::cr0::Cr0;
pub use crate::cr2::Cr2;
pub use crate::cr3::Cr3;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel
    /// mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel
    /// mode (Ring 0).
    unsafe fn store_unsafe(self);
}
