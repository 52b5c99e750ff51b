//! User Address Space Access
//!
//! The kernel never dereferences a user pointer directly. Every access goes
//! through a [`UserMemory`] implementation for the trapping process, which
//! answers two questions: is this address mapped for the user, and copy these
//! bytes in or out.
//!
//! # Security Considerations
//! - `is_mapped` is consulted for every page touched, never once per range
//! - Copies re-check their bounds; a copy outside the address space is an
//!   error, not undefined behavior

use core::fmt;
use core::marker::PhantomData;

use super::address::VirtAddr;

/// Why a user address could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAccessError {
    /// The pointer was null.
    Null,
    /// The address is in kernel space or not mapped.
    Fault(VirtAddr),
    /// A string ran past the copy limit without a terminating NUL.
    TooLong,
}

impl fmt::Display for UserAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null user pointer"),
            Self::Fault(addr) => write!(f, "bad user address {}", addr),
            Self::TooLong => write!(f, "user string not terminated"),
        }
    }
}

/// The address space of the process that trapped.
pub trait UserMemory {
    /// Is `addr` backed by a user mapping?
    ///
    /// Only asked about addresses below `PHYS_BASE`.
    fn is_mapped(&self, addr: VirtAddr) -> bool;

    /// Copy `buf.len()` bytes starting at `addr` into `buf`.
    fn read(&self, addr: VirtAddr, buf: &mut [u8]) -> Result<(), UserAccessError>;

    /// Copy `data` to user memory starting at `addr`.
    fn write(&mut self, addr: VirtAddr, data: &[u8]) -> Result<(), UserAccessError>;

    /// The address-space validator: user half and mapped.
    #[inline]
    fn is_valid(&self, addr: VirtAddr) -> bool {
        addr.is_user() && self.is_mapped(addr)
    }
}

/// A contiguous user region reachable through a kernel mapping.
///
/// User address `start + i` lives at kernel pointer `base + i`. This is the
/// layout of a process whose pages are wired and mapped linearly into the
/// kernel half (and of a flat memory image under test).
pub struct UserWindow<'a> {
    base: *mut u8,
    start: VirtAddr,
    len: usize,
    _region: PhantomData<&'a mut [u8]>,
}

impl<'a> UserWindow<'a> {
    /// Create a window over a raw kernel mapping.
    ///
    /// # Safety
    /// - `base` must be valid for reads and writes of `len` bytes for `'a`
    /// - Nothing else may access that memory while the window is alive
    /// - `start + len` must not exceed `PHYS_BASE`
    pub unsafe fn from_raw(base: *mut u8, start: VirtAddr, len: usize) -> Self {
        debug_assert!(start.as_usize() + len <= crate::config::PHYS_BASE as usize);
        Self {
            base,
            start,
            len,
            _region: PhantomData,
        }
    }

    /// Create a window backed by a kernel buffer.
    pub fn from_slice(start: VirtAddr, region: &'a mut [u8]) -> Self {
        // SAFETY: The slice is valid and exclusively borrowed for 'a.
        unsafe { Self::from_raw(region.as_mut_ptr(), start, region.len()) }
    }

    /// First user address of the window.
    #[inline]
    pub fn start(&self) -> VirtAddr {
        self.start
    }

    /// Length of the window in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the window empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of `[addr, addr + count)` inside the window.
    fn offset(&self, addr: VirtAddr, count: usize) -> Result<usize, UserAccessError> {
        let offset = addr
            .offset_from(self.start)
            .ok_or(UserAccessError::Fault(addr))? as usize;
        match offset.checked_add(count) {
            Some(end) if end <= self.len => Ok(offset),
            _ => Err(UserAccessError::Fault(addr)),
        }
    }
}

impl UserMemory for UserWindow<'_> {
    fn is_mapped(&self, addr: VirtAddr) -> bool {
        self.offset(addr, 1).is_ok()
    }

    fn read(&self, addr: VirtAddr, buf: &mut [u8]) -> Result<(), UserAccessError> {
        let offset = self.offset(addr, buf.len())?;
        // SAFETY:
        // - offset + buf.len() <= len, checked above
        // - base is valid for len bytes (constructor contract)
        // - buf is a kernel buffer and cannot overlap the user region
        unsafe {
            core::ptr::copy_nonoverlapping(self.base.add(offset), buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    fn write(&mut self, addr: VirtAddr, data: &[u8]) -> Result<(), UserAccessError> {
        let offset = self.offset(addr, data.len())?;
        // SAFETY: Same bounds argument as `read`; we hold the window mutably.
        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr(), self.base.add(offset), data.len());
        }
        Ok(())
    }
}

impl fmt::Debug for UserWindow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserWindow({}, len={:#x})", self.start, self.len)
    }
}
