//! System Call Input Validation
//!
//! Every user pointer is checked here before the kernel touches it.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: a bad pointer terminates the process
//! - Check every page a range touches; a paged address space is not
//!   contiguous just because both ends are mapped
//! - Copy into kernel buffers, never hand out references to user memory

use alloc::vec::Vec;

use crate::config::{MAX_USER_STR, PAGE_SIZE, WORD_SIZE};
use crate::mm::{UserAccessError, UserMemory, VirtAddr};

/// Check a single address with the address-space validator.
#[inline]
pub fn check_user_addr(mem: &impl UserMemory, addr: VirtAddr) -> Result<(), UserAccessError> {
    if mem.is_valid(addr) {
        Ok(())
    } else {
        Err(UserAccessError::Fault(addr))
    }
}

/// Check every page of `[addr, addr + len)` and its last byte.
fn check_user_range(mem: &impl UserMemory, addr: VirtAddr, len: u32) -> Result<(), UserAccessError> {
    // Zero-length ranges are valid
    if len == 0 {
        return Ok(());
    }

    if addr.is_null() {
        return Err(UserAccessError::Null);
    }

    let last = addr
        .checked_add(len - 1)
        .ok_or(UserAccessError::Fault(addr))?;

    let mut cursor = addr;
    loop {
        check_user_addr(mem, cursor)?;
        match cursor.checked_add(PAGE_SIZE - cursor.page_offset()) {
            Some(next) if next <= last => cursor = next,
            _ => break,
        }
    }

    check_user_addr(mem, last)
}

/// Address `offset` bytes into a validated range of `len` bytes, for a
/// transfer of `count` bytes.
fn sub_range(base: VirtAddr, len: u32, offset: usize, count: usize) -> Result<VirtAddr, UserAccessError> {
    let in_bounds = offset
        .checked_add(count)
        .is_some_and(|end| end <= len as usize);
    if !in_bounds {
        return Err(UserAccessError::Fault(base));
    }
    base.checked_add(offset as u32)
        .ok_or(UserAccessError::Fault(base))
}

/// A validated user buffer the kernel reads from (the source of `write`).
///
/// Only constructed by [`validate_user_read`].
#[derive(Debug, Clone, Copy)]
pub struct UserBuffer {
    addr: VirtAddr,
    len: u32,
}

impl UserBuffer {
    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `out.len()` bytes starting `offset` bytes into the buffer.
    pub fn copy_to(&self, mem: &impl UserMemory, offset: usize, out: &mut [u8]) -> Result<(), UserAccessError> {
        let addr = sub_range(self.addr, self.len, offset, out.len())?;
        mem.read(addr, out)
    }
}

/// A validated user buffer the kernel writes into (the target of `read`).
///
/// Only constructed by [`validate_user_write`].
#[derive(Debug, Clone, Copy)]
pub struct UserBufferMut {
    addr: VirtAddr,
    len: u32,
}

impl UserBufferMut {
    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `data` starting `offset` bytes into the buffer.
    pub fn copy_from(&self, mem: &mut impl UserMemory, offset: usize, data: &[u8]) -> Result<(), UserAccessError> {
        let addr = sub_range(self.addr, self.len, offset, data.len())?;
        mem.write(addr, data)
    }
}

/// Validate a user-space buffer the kernel will read from
///
/// # Security Checks
/// 1. Pointer is not null (unless the length is zero)
/// 2. Pointer + length doesn't overflow
/// 3. Every page in the range is a mapped user page
/// 4. The last byte is a mapped user address
pub fn validate_user_read(mem: &impl UserMemory, ptr: VirtAddr, len: u32) -> Result<UserBuffer, UserAccessError> {
    check_user_range(mem, ptr, len)?;
    Ok(UserBuffer { addr: ptr, len })
}

/// Validate a user-space buffer the kernel will write into
///
/// Same checks as [`validate_user_read`].
pub fn validate_user_write(mem: &impl UserMemory, ptr: VirtAddr, len: u32) -> Result<UserBufferMut, UserAccessError> {
    check_user_range(mem, ptr, len)?;
    Ok(UserBufferMut { addr: ptr, len })
}

/// Fetch one little-endian argument word from the user stack.
///
/// All four bytes are validated; a word may straddle a page boundary.
pub fn read_user_word(mem: &impl UserMemory, addr: VirtAddr) -> Result<u32, UserAccessError> {
    check_user_range(mem, addr, WORD_SIZE)?;
    let mut word = [0u8; WORD_SIZE as usize];
    mem.read(addr, &mut word)?;
    Ok(u32::from_le_bytes(word))
}

/// Copy a NUL-terminated user string into the kernel.
///
/// Each byte's address is validated before it is read. The NUL is not
/// included in the result. Strings longer than `MAX_USER_STR` (including
/// the NUL) are rejected.
pub fn read_user_str(mem: &impl UserMemory, addr: VirtAddr) -> Result<Vec<u8>, UserAccessError> {
    if addr.is_null() {
        return Err(UserAccessError::Null);
    }

    let mut bytes = Vec::new();
    for offset in 0..MAX_USER_STR as u32 {
        let cursor = addr
            .checked_add(offset)
            .ok_or(UserAccessError::Fault(addr))?;
        check_user_addr(mem, cursor)?;

        let mut byte = [0u8; 1];
        mem.read(cursor, &mut byte)?;
        if byte[0] == 0 {
            return Ok(bytes);
        }
        bytes.push(byte[0]);
    }

    Err(UserAccessError::TooLong)
}
