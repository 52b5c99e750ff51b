//! System Call Interface
//!
//! Provides the system call boundary for user programs.
//!
//! # Security Model
//! - Whitelist approach: only numbers in the known range are accepted
//! - The stack pointer and all three argument words are validated before
//!   any handler runs
//! - Pointer arguments are validated by the handler before first use
//! - A bad pointer terminates the process with status -1; every other
//!   failure is a -1 return
//!
//! # Current Syscalls
//! halt, exit, exec, wait, create, remove, open, filesize, read, write,
//! seek, tell, close. Numbers 13-19 are reserved and return -1.

pub mod handler;
pub mod numbers;
pub mod table;
pub mod validate;

pub use handler::{SyscallResult, Terminate};
pub use table::{init, Syscall, SyscallEntry, SyscallFlags, SyscallTable};
pub use validate::{UserBuffer, UserBufferMut};
