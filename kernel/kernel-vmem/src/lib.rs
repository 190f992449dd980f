//! # Virtual Memory Management
//!
//! Two-level 32-bit paging on top of the contiguous frame pools:
//!
//! - [`page_table`]: typed [`PageDirectory`]/[`PageTable`] structures and
//!   index types for the two translation levels.
//! - [`PageEntryBits`]: the flag/address bitfield shared by both levels.
//! - [`AddressSpace`]: one page directory plus the policy for filling it.
//!   The region `[0, shared_size)` is identity-mapped at construction;
//!   everything above is mapped lazily, one page per fault.
//! - [`PageFault`]/[`FaultError`]: the fault-handler interface. Faults on
//!   non-present pages are resolved by allocation; protection violations
//!   are reported back to the exception dispatcher.
//! - [`active`]: machine-global state (CR3 owner, CR0.PG, boot config).
//!
//! Paging structures are never moved: they are built in place inside
//! physical frames reached through a [`PhysMapper`], which is also what
//! makes the whole crate testable on a host with simulated RAM.
//!
//! Privileged register access is compiled only with the `asm` feature on
//! x86 targets. Without it, activation and enablement only track state,
//! so the same code paths run under `cargo test`.
//!
//! [`PhysMapper`]: kernel_memory_addresses::PhysMapper

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod active;
mod address_space;
mod fault;
mod page_entry_bits;
pub mod page_table;
pub mod sync;

pub use crate::active::{PagingConfig, enable_paging, init_paging, paging_enabled};
pub use crate::address_space::AddressSpace;
pub use crate::fault::{FaultError, PageFault, PageFaultCode};
pub use crate::page_entry_bits::PageEntryBits;
pub use crate::page_table::{PageDirectory, PageTable, PdEntry, PdIndex, PtEntry, PtIndex};
