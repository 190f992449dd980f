use crate::active;
use crate::fault::{FaultError, PageFault};
use crate::page_entry_bits::PageEntryBits;
use crate::page_table::{
    ENTRY_COUNT, PageDirectory, PageTable, PdEntry, PdIndex, PtEntry, PtIndex, split_indices,
};
use kernel_frame_pool::{FramePoolRegistry, PoolHandle};
use kernel_memory_addresses::{Frame, PAGE_SIZE, PhysMapper, PhysicalAddress, VirtualAddress};
use log::{debug, trace, warn};

/// One virtual address space: a page directory plus the policy for
/// filling it.
///
/// The directory and every page table live in frames drawn from the
/// *kernel* pool; frames backing faulted-in data pages come from the
/// *process* pool. The space holds pool handles rather than the pools
/// themselves, so the [`FramePoolRegistry`] stays the single owner of all
/// pools and is borrowed per call.
///
/// Construction eagerly identity-maps the shared region `[0, shared_size)`
/// with kernel read-write pages. Everything above it starts unmapped and
/// is populated page by page from [`handle_fault`](Self::handle_fault).
pub struct AddressSpace<'m, M: PhysMapper> {
    mapper: &'m M,
    directory_phys: PhysicalAddress,
    kernel_pool: PoolHandle,
    process_pool: PoolHandle,
    shared_size: usize,
}

impl<'m, M: PhysMapper> AddressSpace<'m, M> {
    /// Creates an address space with the shared region identity-mapped.
    ///
    /// Allocates one frame for the directory and one per started 4 MiB of
    /// shared region for its page tables, all from `kernel_pool`.
    ///
    /// # Panics
    ///
    /// Panics if `shared_size` is not page-aligned, if it exceeds the
    /// 4 GiB address space, or if the kernel pool runs dry.
    pub fn new(
        mapper: &'m M,
        registry: &mut FramePoolRegistry<'m, M>,
        kernel_pool: PoolHandle,
        process_pool: PoolHandle,
        shared_size: usize,
    ) -> Self {
        assert!(shared_size > 0, "shared region cannot be empty");
        assert!(
            shared_size.is_multiple_of(PAGE_SIZE),
            "shared region size must be a multiple of the page size"
        );
        let shared_pages = shared_size / PAGE_SIZE;
        assert!(
            shared_pages <= ENTRY_COUNT * ENTRY_COUNT,
            "shared region does not fit the 32-bit address space"
        );

        let directory_frame = registry.pool_mut(kernel_pool).get_frames(1);
        let directory_phys = directory_frame.base();
        // SAFETY: the frame was just allocated for this directory and is
        // not aliased; a PageDirectory is valid for any frame contents
        // once reset.
        let directory: &mut PageDirectory = unsafe { mapper.phys_to_mut(directory_phys) };
        directory.reset();

        let mut page = 0;
        let mut dir_slot: u16 = 0;
        while page < shared_pages {
            let table_frame = registry.pool_mut(kernel_pool).get_frames(1);
            // SAFETY: freshly allocated, unaliased frame.
            let table: &mut PageTable = unsafe { mapper.phys_to_mut(table_frame.base()) };
            table.reset();

            let in_this_table = (shared_pages - page).min(ENTRY_COUNT);
            for i in 0..in_this_table {
                let frame = Frame::from_number((page + i) as u32);
                table.set(
                    PtIndex::new(i as u16),
                    PtEntry::make_page(frame, PageEntryBits::kernel_rw()),
                );
            }
            directory.set(
                PdIndex::new(dir_slot),
                PdEntry::make_table(table_frame.base(), PageEntryBits::kernel_rw()),
            );
            page += in_this_table;
            dir_slot += 1;
        }

        debug!(
            "address space created: directory at {directory_phys}, {shared_pages} shared page(s) in {dir_slot} table(s)"
        );
        Self {
            mapper,
            directory_phys,
            kernel_pool,
            process_pool,
            shared_size,
        }
    }

    /// Creates an address space using the globally installed
    /// [`PagingConfig`](crate::PagingConfig).
    ///
    /// # Panics
    ///
    /// Panics if [`init_paging`](crate::init_paging) has not run yet, plus
    /// everything [`new`](Self::new) panics on.
    pub fn new_from_config(
        mapper: &'m M,
        registry: &mut FramePoolRegistry<'m, M>,
        kernel_pool: PoolHandle,
        process_pool: PoolHandle,
    ) -> Self {
        let config = active::paging_config().expect("paging configuration not installed");
        Self::new(mapper, registry, kernel_pool, process_pool, config.shared_size)
    }

    /// Physical base of this space's page directory (the CR3 value).
    #[must_use]
    pub const fn directory_phys(&self) -> PhysicalAddress {
        self.directory_phys
    }

    /// Size in bytes of the identity-mapped shared region.
    #[must_use]
    pub const fn shared_size(&self) -> usize {
        self.shared_size
    }

    /// Makes this the active address space.
    pub fn activate(&self) {
        active::activate_directory(self.directory_phys);
    }

    /// Walks the tables and translates `va`, if it is currently mapped.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let (pd_i, pt_i) = split_indices(va);
        // SAFETY: directory_phys points at the directory this space owns.
        let directory: &PageDirectory = unsafe { self.mapper.phys_to_mut(self.directory_phys) };
        let table_phys = directory.get(pd_i).table_phys()?;
        // SAFETY: a present PDE in our directory points at a table frame
        // we allocated and initialized.
        let table: &PageTable = unsafe { self.mapper.phys_to_mut(table_phys) };
        let page_phys = table.get(pt_i).page_phys()?;
        Some(page_phys + va.offset())
    }

    /// Resolves a page fault by mapping a fresh frame at the faulting
    /// page, allocating the intermediate page table on the way if the
    /// directory slot is still empty.
    ///
    /// Only not-present faults are resolved. Protection violations are
    /// handed back for the exception dispatcher to act on.
    ///
    /// # Panics
    ///
    /// Panics if the kernel or process pool runs dry; frame exhaustion
    /// during fault handling is unrecoverable.
    pub fn handle_fault(
        &mut self,
        registry: &mut FramePoolRegistry<'m, M>,
        fault: PageFault,
    ) -> Result<(), FaultError> {
        if fault.code().protection_violation() {
            return Err(FaultError::ProtectionViolation {
                address: fault.address(),
            });
        }

        let (pd_i, pt_i) = split_indices(fault.address());
        // SAFETY: directory_phys points at the directory this space owns.
        let directory: &mut PageDirectory = unsafe { self.mapper.phys_to_mut(self.directory_phys) };
        let table_phys = if let Some(pa) = directory.get(pd_i).table_phys() {
            pa
        } else {
            let table_frame = registry.pool_mut(self.kernel_pool).get_frames(1);
            // SAFETY: freshly allocated, unaliased frame.
            let table: &mut PageTable = unsafe { self.mapper.phys_to_mut(table_frame.base()) };
            table.reset();
            directory.set(
                pd_i,
                PdEntry::make_table(table_frame.base(), PageEntryBits::kernel_rw()),
            );
            trace!("page table installed in directory slot {}", pd_i.as_usize());
            table_frame.base()
        };

        // SAFETY: the PDE was either just written or found present; either
        // way the table frame belongs to this space.
        let table: &mut PageTable = unsafe { self.mapper.phys_to_mut(table_phys) };
        if table.get(pt_i).is_present() {
            // A racing fault on another task may have mapped this page
            // already; the new frame simply replaces the old mapping.
            warn!("remapping already-present page at {}", fault.address());
        }
        let data_frame = registry.pool_mut(self.process_pool).get_frames(1);
        table.set(pt_i, PtEntry::make_page(data_frame, PageEntryBits::kernel_rw()));
        active::flush_if_active(self.directory_phys);

        trace!(
            "{} at {} resolved with frame {}",
            fault.code().explain(),
            fault.address(),
            data_frame.number(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::PageFaultCode;
    use crate::test_support::TestPhys;
    use kernel_frame_pool::ContiguousFramePool;

    const SHARED: usize = 3 * PAGE_SIZE;

    struct Fixture {
        registry: FramePoolRegistry<'static, TestPhys>,
        kernel: PoolHandle,
        process: PoolHandle,
    }

    /// 160 simulated frames: pool metadata at 0 and 1, kernel pool over
    /// [8, 72), process pool over [80, 144).
    fn fixture(phys: &'static TestPhys) -> Fixture {
        let mut registry = FramePoolRegistry::new();
        let kernel = registry.register(ContiguousFramePool::new(
            phys,
            Frame::from_number(8),
            64,
            Some(Frame::from_number(0)),
        ));
        let process = registry.register(ContiguousFramePool::new(
            phys,
            Frame::from_number(80),
            64,
            Some(Frame::from_number(1)),
        ));
        Fixture {
            registry,
            kernel,
            process,
        }
    }

    fn leak_phys() -> &'static TestPhys {
        Box::leak(Box::new(TestPhys::with_frames(160)))
    }

    fn not_present_write() -> PageFaultCode {
        PageFaultCode::new().with_caused_by_write(true)
    }

    #[test]
    fn shared_region_is_identity_mapped() {
        let phys = leak_phys();
        let mut fx = fixture(phys);
        let space = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, SHARED);

        for page in 0..3u32 {
            let va = VirtualAddress::new(page * PAGE_SIZE as u32 + 0x123);
            let pa = space.translate(va).unwrap();
            assert_eq!(pa.as_u32(), page * PAGE_SIZE as u32 + 0x123);
        }
        // The first page beyond the shared region is unmapped.
        assert_eq!(space.translate(VirtualAddress::new(SHARED as u32)), None);
    }

    #[test]
    fn construction_draws_metadata_from_kernel_pool_only() {
        let phys = leak_phys();
        let mut fx = fixture(phys);
        let _space = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, SHARED);

        // One directory frame plus one page table for 3 shared pages.
        assert_eq!(fx.registry.pool(fx.kernel).free_count(), 62);
        assert_eq!(fx.registry.pool(fx.process).free_count(), 64);
    }

    #[test]
    fn large_shared_region_spans_multiple_tables() {
        let phys = leak_phys();
        let mut fx = fixture(phys);
        // One full table plus one page spilling into a second table.
        let shared = (ENTRY_COUNT + 1) * PAGE_SIZE;
        let space = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, shared);

        assert_eq!(fx.registry.pool(fx.kernel).free_count(), 61);
        let last = VirtualAddress::new((ENTRY_COUNT * PAGE_SIZE) as u32);
        assert_eq!(space.translate(last).unwrap().as_u32(), last.as_u32());
        let beyond = VirtualAddress::new(((ENTRY_COUNT + 1) * PAGE_SIZE) as u32);
        assert_eq!(space.translate(beyond), None);
    }

    #[test]
    fn fault_maps_page_from_process_pool() {
        let phys = leak_phys();
        let mut fx = fixture(phys);
        let mut space = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, SHARED);

        let va = VirtualAddress::new(0x0040_2000);
        assert_eq!(space.translate(va), None);

        space
            .handle_fault(&mut fx.registry, PageFault::new(va, not_present_write()))
            .unwrap();

        // First fault in a fresh 4 MiB region: one table from the kernel
        // pool, one data frame from the process pool.
        assert_eq!(fx.registry.pool(fx.kernel).free_count(), 61);
        assert_eq!(fx.registry.pool(fx.process).free_count(), 63);

        let pa = space.translate(va).unwrap();
        assert_eq!(pa, fx.registry.pool(fx.process).base_frame().base());
        // Offsets within the page translate through.
        let pa2 = space.translate(VirtualAddress::new(0x0040_2ABC)).unwrap();
        assert_eq!(pa2.as_u32(), pa.as_u32() + 0xABC);
    }

    #[test]
    fn second_fault_reuses_existing_table() {
        let phys = leak_phys();
        let mut fx = fixture(phys);
        let mut space = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, SHARED);

        let first = VirtualAddress::new(0x0040_2000);
        let second = VirtualAddress::new(0x0040_5000);
        space
            .handle_fault(&mut fx.registry, PageFault::new(first, not_present_write()))
            .unwrap();
        let kernel_free = fx.registry.pool(fx.kernel).free_count();

        space
            .handle_fault(&mut fx.registry, PageFault::new(second, not_present_write()))
            .unwrap();

        // Same directory slot: no second table allocation.
        assert_eq!(fx.registry.pool(fx.kernel).free_count(), kernel_free);
        assert_eq!(fx.registry.pool(fx.process).free_count(), 62);
        assert!(space.translate(second).is_some());
    }

    #[test]
    fn faulted_mappings_are_independent_per_page() {
        let phys = leak_phys();
        let mut fx = fixture(phys);
        let mut space = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, SHARED);

        let a = VirtualAddress::new(0x0040_0000);
        let b = VirtualAddress::new(0x0080_0000);
        space
            .handle_fault(&mut fx.registry, PageFault::new(a, not_present_write()))
            .unwrap();
        space
            .handle_fault(&mut fx.registry, PageFault::new(b, not_present_write()))
            .unwrap();

        let pa_a = space.translate(a).unwrap();
        let pa_b = space.translate(b).unwrap();
        assert_ne!(pa_a, pa_b);
        // Two directory slots were filled, so two tables were allocated.
        assert_eq!(fx.registry.pool(fx.kernel).free_count(), 60);
    }

    #[test]
    fn protection_violation_is_not_resolved() {
        let phys = leak_phys();
        let mut fx = fixture(phys);
        let mut space = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, SHARED);

        let va = VirtualAddress::new(0x0000_0000);
        let code = PageFaultCode::new()
            .with_protection_violation(true)
            .with_caused_by_write(true);
        let err = space
            .handle_fault(&mut fx.registry, PageFault::new(va, code))
            .unwrap_err();

        assert_eq!(err, FaultError::ProtectionViolation { address: va });
        // Nothing was allocated on the rejected fault.
        assert_eq!(fx.registry.pool(fx.kernel).free_count(), 62);
        assert_eq!(fx.registry.pool(fx.process).free_count(), 64);
    }

    #[test]
    fn spaces_share_pools_but_not_mappings() {
        let phys = leak_phys();
        let mut fx = fixture(phys);
        let mut space_a = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, SHARED);
        let space_b = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, SHARED);

        let va = VirtualAddress::new(0x0040_2000);
        space_a
            .handle_fault(&mut fx.registry, PageFault::new(va, not_present_write()))
            .unwrap();

        assert!(space_a.translate(va).is_some());
        assert_eq!(space_b.translate(va), None);
        assert_ne!(space_a.directory_phys(), space_b.directory_phys());
    }

    #[test]
    #[should_panic(expected = "multiple of the page size")]
    fn unaligned_shared_size_is_fatal() {
        let phys = leak_phys();
        let mut fx = fixture(phys);
        let _ = AddressSpace::new(phys, &mut fx.registry, fx.kernel, fx.process, SHARED + 1);
    }
}
