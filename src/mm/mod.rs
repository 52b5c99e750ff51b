//! Memory access for the user-program layer
//!
//! Provides:
//! - Typed user virtual addresses and the user/kernel split
//! - The address-space contract used to validate and copy user memory
//!
//! Paging itself belongs to the VM subsystem; this module only asks it
//! whether an address is mapped.

pub mod address;
pub mod user;

pub use address::VirtAddr;
pub use user::{UserAccessError, UserMemory, UserWindow};
