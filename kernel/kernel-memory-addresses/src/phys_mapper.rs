use crate::PhysicalAddress;

/// Converts physical addresses to *temporarily* usable pointers in the
/// current virtual address space (e.g., via an identity map of low memory).
///
/// Rust code can only dereference virtual addresses. Whenever the frame pools
/// touch their bitmap metadata frames, or the paging layer edits a page
/// directory or page table, the physical frame holding that structure must
/// first be turned into a usable reference. The mapping strategy differs
/// between bring-up, the running kernel, and host tests, so this trait
/// abstracts over it.
///
/// # Safety
/// - Implementations must ensure `pa` is mapped as writable in the current
///   address space for `&mut T`.
/// - Lifetime `'a` is purely borrow-checked; the mapping must remain valid
///   for `'a`.
/// - Type `T` must match the bytes at `pa` (no aliasing UB).
pub trait PhysMapper {
    /// Convert a *physical* address to a usable mutable reference in the
    /// current address space.
    ///
    /// # Safety
    /// `pa` must reference memory that is valid and writable as a `T` in the
    /// current address space, and the caller must not create aliasing
    /// references to it.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}
