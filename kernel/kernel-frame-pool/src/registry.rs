use crate::pool::ContiguousFramePool;
use kernel_memory_addresses::{Frame, PhysMapper};
use log::info;

/// Maximum number of pools a registry can hold.
pub const MAX_POOLS: usize = 8;

/// Stable identifier of a pool inside a [`FramePoolRegistry`].
///
/// Handles are slot indices; registration is append-only, so a handle
/// stays valid for the lifetime of the registry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PoolHandle(usize);

/// Directory of every frame pool in the system.
///
/// Frame ownership is released by bare frame number, so something has to
/// map a frame back to the pool whose region contains it. The registry
/// owns the pools outright and keeps a side index sorted by base frame,
/// making the owner lookup a binary search instead of a walk over all
/// registered pools.
pub struct FramePoolRegistry<'m, M: PhysMapper> {
    pools: [Option<ContiguousFramePool<'m, M>>; MAX_POOLS],
    /// Slot numbers of registered pools, ordered by ascending base frame.
    by_base: [usize; MAX_POOLS],
    len: usize,
}

impl<'m, M: PhysMapper> FramePoolRegistry<'m, M> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pools: [const { None }; MAX_POOLS],
            by_base: [0; MAX_POOLS],
            len: 0,
        }
    }

    /// Number of registered pools.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Registers a pool and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the registry is full or if the pool's region overlaps a
    /// pool registered earlier. Overlapping regions would make frame
    /// ownership ambiguous.
    pub fn register(&mut self, pool: ContiguousFramePool<'m, M>) -> PoolHandle {
        assert!(self.len < MAX_POOLS, "frame pool registry is full ({MAX_POOLS} pools)");

        let base = pool.base_frame().number();
        let end = base + pool.n_frames() as u32;
        for &slot in &self.by_base[..self.len] {
            let other = self.pools[slot].as_ref().unwrap();
            let other_base = other.base_frame().number();
            let other_end = other_base + other.n_frames() as u32;
            assert!(
                end <= other_base || base >= other_end,
                "pool region [{base}, {end}) overlaps registered region [{other_base}, {other_end})"
            );
        }

        let slot = self.len;
        let insert_at = self.by_base[..self.len]
            .partition_point(|&s| self.pools[s].as_ref().unwrap().base_frame().number() < base);
        self.by_base.copy_within(insert_at..self.len, insert_at + 1);
        self.by_base[insert_at] = slot;
        self.pools[slot] = Some(pool);
        self.len += 1;

        info!("registered frame pool [{base}, {end}) as pool #{slot}");
        PoolHandle(slot)
    }

    /// Borrows a registered pool.
    #[must_use]
    pub fn pool(&self, handle: PoolHandle) -> &ContiguousFramePool<'m, M> {
        self.pools[handle.0].as_ref().expect("stale pool handle")
    }

    /// Mutably borrows a registered pool.
    pub fn pool_mut(&mut self, handle: PoolHandle) -> &mut ContiguousFramePool<'m, M> {
        self.pools[handle.0].as_mut().expect("stale pool handle")
    }

    /// Finds the pool whose region contains `frame`, if any.
    #[must_use]
    pub fn owner_of(&self, frame: Frame) -> Option<PoolHandle> {
        let n = frame.number();
        // Last pool whose base is <= n is the only candidate.
        let idx = self.by_base[..self.len]
            .partition_point(|&s| self.pools[s].as_ref().unwrap().base_frame().number() <= n);
        let slot = self.by_base[..idx].last().copied()?;
        let pool = self.pools[slot].as_ref().unwrap();
        pool.contains(frame).then_some(PoolHandle(slot))
    }

    /// Releases the frame sequence headed by `head` back to its owning
    /// pool.
    ///
    /// # Panics
    ///
    /// Panics if no registered pool contains `head`, or if `head` is not a
    /// sequence head (see [`ContiguousFramePool::release_frames`]).
    pub fn release_frames(&mut self, head: Frame) {
        let Some(handle) = self.owner_of(head) else {
            panic!("frame {} does not belong to any registered pool", head.number());
        };
        self.pool_mut(handle).release_frames(head);
    }
}

impl<M: PhysMapper> Default for FramePoolRegistry<'_, M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestPhys;

    /// Two pools: frames [8, 72) with metadata at 0, frames [80, 144)
    /// with metadata at 1.
    fn two_pool_registry(phys: &TestPhys) -> (FramePoolRegistry<'_, TestPhys>, PoolHandle, PoolHandle) {
        let mut registry = FramePoolRegistry::new();
        let low = registry.register(ContiguousFramePool::new(
            phys,
            Frame::from_number(8),
            64,
            Some(Frame::from_number(0)),
        ));
        let high = registry.register(ContiguousFramePool::new(
            phys,
            Frame::from_number(80),
            64,
            Some(Frame::from_number(1)),
        ));
        (registry, low, high)
    }

    #[test]
    fn owner_lookup_picks_containing_pool() {
        let phys = TestPhys::with_frames(160);
        let (registry, low, high) = two_pool_registry(&phys);
        assert_eq!(registry.owner_of(Frame::from_number(8)), Some(low));
        assert_eq!(registry.owner_of(Frame::from_number(71)), Some(low));
        assert_eq!(registry.owner_of(Frame::from_number(80)), Some(high));
        assert_eq!(registry.owner_of(Frame::from_number(143)), Some(high));
        // Gaps and out-of-range frames belong to nobody.
        assert_eq!(registry.owner_of(Frame::from_number(7)), None);
        assert_eq!(registry.owner_of(Frame::from_number(75)), None);
        assert_eq!(registry.owner_of(Frame::from_number(144)), None);
    }

    #[test]
    fn lookup_is_order_independent() {
        let phys = TestPhys::with_frames(160);
        let mut registry = FramePoolRegistry::new();
        // Register the higher region first.
        let high = registry.register(ContiguousFramePool::new(
            &phys,
            Frame::from_number(80),
            64,
            Some(Frame::from_number(1)),
        ));
        let low = registry.register(ContiguousFramePool::new(
            &phys,
            Frame::from_number(8),
            64,
            Some(Frame::from_number(0)),
        ));
        assert_eq!(registry.owner_of(Frame::from_number(10)), Some(low));
        assert_eq!(registry.owner_of(Frame::from_number(90)), Some(high));
    }

    #[test]
    fn release_dispatches_to_owning_pool() {
        let phys = TestPhys::with_frames(160);
        let (mut registry, low, high) = two_pool_registry(&phys);
        let head = registry.pool_mut(high).get_frames(3);
        assert_eq!(registry.pool(high).free_count(), 61);

        registry.release_frames(head);
        assert_eq!(registry.pool(high).free_count(), 64);
        assert_eq!(registry.pool(low).free_count(), 64);
    }

    #[test]
    #[should_panic(expected = "does not belong to any registered pool")]
    fn releasing_unowned_frame_is_fatal() {
        let phys = TestPhys::with_frames(160);
        let (mut registry, _, _) = two_pool_registry(&phys);
        registry.release_frames(Frame::from_number(4));
    }

    #[test]
    #[should_panic(expected = "overlaps registered region")]
    fn overlapping_registration_is_fatal() {
        let phys = TestPhys::with_frames(160);
        let (mut registry, _, _) = two_pool_registry(&phys);
        let overlapping =
            ContiguousFramePool::new(&phys, Frame::from_number(60), 16, Some(Frame::from_number(2)));
        let _ = registry.register(overlapping);
    }

    #[test]
    #[should_panic(expected = "registry is full")]
    fn capacity_overflow_is_fatal() {
        let phys = TestPhys::with_frames(160);
        let mut registry = FramePoolRegistry::new();
        for i in 0..=MAX_POOLS as u32 {
            let base = Frame::from_number(16 + i * 8);
            let _ = registry.register(ContiguousFramePool::new(&phys, base, 4, None));
        }
    }
}
