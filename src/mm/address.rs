//! User Virtual Addresses
//!
//! Addresses handed to the kernel by user programs are 32-bit words. They are
//! wrapped in [`VirtAddr`] so that an unvalidated user value cannot be mixed
//! up with a length or an identifier, and so the user/kernel split is checked
//! in one place.
//!
//! # Address Space Layout
//! ```text
//! 0xFFFF_FFFF ┌──────────────────────┐
//!             │ kernel (all procs)   │
//! PHYS_BASE   ├──────────────────────┤ 0xC000_0000
//!             │ user stack           │
//!             │ ...                  │
//!             │ user code + data     │
//! 0x0000_0000 └──────────────────────┘
//! ```

use core::fmt;

use crate::config::{PAGE_SIZE, PHYS_BASE};

/// Page size mask
pub const PAGE_MASK: u32 = PAGE_SIZE - 1;

/// A user-supplied virtual address.
///
/// Construction never fails; whether the address may be touched is decided
/// by [`VirtAddr::is_user`] plus the address space's own mapping check.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(u32);

impl VirtAddr {
    /// The null address.
    pub const NULL: Self = Self(0);

    /// Wrap a raw address word.
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get the raw address as usize (for offsets into kernel buffers).
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Check for the null pointer.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if this is a user address (below `PHYS_BASE`).
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 < PHYS_BASE
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> u32 {
        self.0 & PAGE_MASK
    }

    /// Add an offset, returning `None` if the result wraps past 4 GiB.
    #[inline]
    pub const fn checked_add(self, offset: u32) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Distance in bytes from `base` up to this address.
    #[inline]
    pub const fn offset_from(self, base: Self) -> Option<u32> {
        self.0.checked_sub(base.0)
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#010x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_kernel_split() {
        assert!(VirtAddr::new(0x0804_8000).is_user());
        assert!(VirtAddr::new(PHYS_BASE - 1).is_user());
        assert!(!VirtAddr::new(PHYS_BASE).is_user());
        assert!(!VirtAddr::new(u32::MAX).is_user());
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(VirtAddr::new(0x0804_9234).page_offset(), 0x234);
        assert_eq!(VirtAddr::new(0x0804_9000).page_offset(), 0);
    }

    #[test]
    fn test_checked_add_wraps_to_none() {
        assert_eq!(VirtAddr::new(u32::MAX - 3).checked_add(4), None);
        assert_eq!(
            VirtAddr::new(0xBFFF_FFF0).checked_add(0x10),
            Some(VirtAddr::new(PHYS_BASE))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", VirtAddr::new(0xBFFF_F000)), "0xbffff000");
    }
}
