//! # Two-Level 32-bit Page Tables
//!
//! Structures for the classic 32-bit paging hierarchy:
//!
//! - [`PageDirectory`] with [`PdEntry`]s, indexed by VA bits `[31:22]`.
//! - [`PageTable`] with [`PtEntry`]s, indexed by VA bits `[21:12]`.
//!
//! Both tables are 4 KiB-aligned arrays of 1024 32-bit entries, sized to
//! occupy exactly one physical frame. They are constructed **in place**
//! inside freshly allocated frames (via a [`PhysMapper`] view), never
//! moved, and referenced from CR3 or directory entries by physical
//! address alone.
//!
//! [`PhysMapper`]: kernel_memory_addresses::PhysMapper

mod pd;
mod pt;

pub use pd::{PageDirectory, PdEntry, PdIndex};
pub use pt::{PageTable, PtEntry, PtIndex};

use kernel_memory_addresses::VirtualAddress;

/// Entries per directory or table.
pub const ENTRY_COUNT: usize = 1024;

/// Splits a virtual address into its directory and table indices.
///
/// The remaining low 12 bits are the byte offset within the page.
#[must_use]
pub const fn split_indices(va: VirtualAddress) -> (PdIndex, PtIndex) {
    (PdIndex::from_va(va), PtIndex::from_va(va))
}
