//! PantherOS User-Program Layer
//!
//! The system-call boundary between user programs and the kernel.
//!
//! # Responsibilities
//! - Validate the trapping stack and every user pointer before use
//! - Dispatch through a fixed table to typed syscall handlers
//! - Track open files per process and system-wide
//! - Close a process's files when it exits or is killed
//!
//! # Collaborators
//! - File system: [`fs::FileSystem`], [`fs::OpenFile`]
//! - Process runtime: [`proc::ProcessControl`], [`proc::SleepLock`]
//! - Console: [`drivers::Console`]
//! - Address space: [`mm::UserMemory`]
//!
//! # Locking
//! - Global file lock: a runtime [`proc::SleepLock`] held across read, write
//!   and exec
//! - Registry lock: protects both views of the handle registry for lookups
//!   only; taken inside the file lock, never the other way round
//! - Per-file lock: held while one operation runs on that file

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod fs;
pub mod kernel;
pub mod klog;
pub mod mm;
pub mod proc;
pub mod sched;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

pub use kernel::Kernel;
pub use trap::{TrapFrame, TrapOutcome};
