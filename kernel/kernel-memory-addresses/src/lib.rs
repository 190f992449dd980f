//! # Memory Addresses and Frames
//!
//! Typed building blocks for 32-bit x86 physical memory management:
//!
//! - [`PhysicalAddress`] / [`VirtualAddress`] newtypes (u32) to avoid mixing
//!   address kinds.
//! - [`Frame`], a typed handle for a physical page frame, identified by its
//!   absolute **frame number** (physical address divided by [`PAGE_SIZE`]).
//! - The [`PhysMapper`] trait, which converts a physical address into a
//!   usable mutable view in the current virtual address space.
//!
//! Frame numbers are the common currency between the frame pools and the
//! paging layer: page-directory and page-table entries store a frame number
//! in their high 20 bits, and a pool release request carries nothing but a
//! frame number.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod frame;
mod phys_mapper;
mod physical_address;
mod virtual_address;

pub use crate::frame::Frame;
pub use crate::phys_mapper::PhysMapper;
pub use crate::physical_address::PhysicalAddress;
pub use crate::virtual_address::VirtualAddress;

/// Size of one page frame in bytes (the base hardware page size).
pub const PAGE_SIZE: usize = 4096;

/// log2 of [`PAGE_SIZE`]; shift between addresses and frame numbers.
pub const PAGE_SHIFT: u32 = 12;

const _: () = {
    assert!(PAGE_SIZE == 1 << PAGE_SHIFT);
};
