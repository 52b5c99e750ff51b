//! Compile-time configuration for the user-program layer.
//!
//! These values are part of the contract with the user-mode runtime and the
//! interrupt entry stubs; changing any of them breaks existing binaries.

/// Interrupt vector user programs raise with `int $0x30`.
pub const SYSCALL_VECTOR: u8 = 0x30;

/// Descriptor privilege level of the syscall gate (reachable from ring 3).
pub const SYSCALL_DPL: u8 = 3;

/// Name the gate is registered under.
pub const SYSCALL_NAME: &str = "syscall";

/// Base of the kernel half of every address space.
/// Everything below is user memory.
pub const PHYS_BASE: u32 = 0xC000_0000;

/// Page size (4 KiB)
pub const PAGE_SIZE: u32 = 4096;

/// Size of one argument word on the user stack.
pub const WORD_SIZE: u32 = 4;

/// Longest user string (path or command line) copied into the kernel,
/// including the terminating NUL.
pub const MAX_USER_STR: usize = PAGE_SIZE as usize;

/// Bounce buffer size used when moving file data across the boundary.
pub const IO_CHUNK: usize = 512;

/// Capacity of the in-kernel log ring buffer in bytes.
pub const KLOG_CAPACITY: usize = 64 * 1024;
