//! Machine-global paging state.
//!
//! Exactly one address space is active at a time (CR3) and paging is
//! switched on exactly once during boot (CR0.PG). This module owns those
//! globals together with the boot-time paging configuration. Off-target
//! builds track the same state in atomics only, which lets the full
//! activation flow run in host tests.

use crate::sync::SyncOnceCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress};
use log::info;

/// Boot-time paging parameters, installed once via [`init_paging`].
#[derive(Debug, Copy, Clone)]
pub struct PagingConfig {
    /// Size in bytes of the identity-mapped region shared by every
    /// address space, starting at virtual address 0. Must be a multiple
    /// of the page size.
    pub shared_size: usize,
}

static PAGING_CONFIG: SyncOnceCell<PagingConfig> = SyncOnceCell::new();

/// Physical base of the active page directory; 0 means none loaded yet.
/// Frame 0 is never handed out for a directory, so 0 is a safe sentinel.
static CURRENT_DIRECTORY: AtomicU32 = AtomicU32::new(0);

static PAGING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Installs the paging configuration. Called once during boot, before
/// any address space is created through [`AddressSpace::new_from_config`].
///
/// # Panics
///
/// Panics if called twice or if `shared_size` is not page-aligned.
///
/// [`AddressSpace::new_from_config`]: crate::AddressSpace::new_from_config
pub fn init_paging(config: PagingConfig) {
    assert!(
        config.shared_size.is_multiple_of(PAGE_SIZE),
        "shared region size must be a multiple of the page size"
    );
    assert!(
        PAGING_CONFIG.set(config).is_ok(),
        "paging configuration installed twice"
    );
    info!("paging configured: {} byte(s) shared", config.shared_size);
}

/// The installed paging configuration, if [`init_paging`] has run.
#[must_use]
pub fn paging_config() -> Option<&'static PagingConfig> {
    PAGING_CONFIG.get()
}

/// Makes the directory at `directory_phys` the active one.
///
/// On x86 targets this writes CR3, which also flushes the non-global TLB.
pub fn activate_directory(directory_phys: PhysicalAddress) {
    #[cfg(all(feature = "asm", target_arch = "x86"))]
    {
        use kernel_registers::{Cr3, StoreRegisterUnsafe};
        // SAFETY: the caller hands us a fully initialized page directory;
        // switching CR3 to it is the intended privileged operation.
        unsafe { Cr3::from_directory_phys(directory_phys, false, false).store_unsafe() };
    }
    CURRENT_DIRECTORY.store(directory_phys.as_u32(), Ordering::Release);
    info!("page directory at {directory_phys} activated");
}

/// Physical base of the active page directory, if one has been loaded.
#[must_use]
pub fn current_directory() -> Option<PhysicalAddress> {
    match CURRENT_DIRECTORY.load(Ordering::Acquire) {
        0 => None,
        pa => Some(PhysicalAddress::new(pa)),
    }
}

/// Turns on address translation (CR0.PG).
///
/// # Panics
///
/// Panics if no directory has been activated; enabling paging with a
/// stale CR3 would crash on the very next instruction fetch.
pub fn enable_paging() {
    assert!(
        current_directory().is_some(),
        "cannot enable paging before a page directory is activated"
    );
    #[cfg(all(feature = "asm", target_arch = "x86"))]
    {
        use kernel_registers::{Cr0, LoadRegisterUnsafe, StoreRegisterUnsafe};
        // SAFETY: read-modify-write of CR0 flipping only PG, with CR3
        // already pointing at a valid directory.
        unsafe {
            let cr0 = Cr0::load_unsafe();
            cr0.with_pg_paging(true).store_unsafe();
        }
    }
    PAGING_ENABLED.store(true, Ordering::Release);
    info!("paging enabled");
}

/// Whether address translation has been turned on.
#[must_use]
pub fn paging_enabled() -> bool {
    PAGING_ENABLED.load(Ordering::Acquire)
}

/// Flushes the TLB if `directory_phys` is the active directory.
///
/// Mapping changes in an inactive directory need no flush; they become
/// visible when that directory is next loaded into CR3.
pub fn flush_if_active(directory_phys: PhysicalAddress) {
    if current_directory() != Some(directory_phys) {
        return;
    }
    #[cfg(all(feature = "asm", target_arch = "x86"))]
    {
        use kernel_registers::{Cr3, LoadRegisterUnsafe, StoreRegisterUnsafe};
        // SAFETY: rewriting CR3 with its current value is the canonical
        // full TLB flush on processors without INVLPG usage here.
        unsafe { Cr3::load_unsafe().store_unsafe() };
    }
}
