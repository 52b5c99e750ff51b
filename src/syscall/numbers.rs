//! System call numbers
//!
//! Shared with the user-mode runtime (`lib/syscall-nr.h` on the user side);
//! these values are ABI and must not be renumbered.

/// Halt the operating system.
pub const SYS_HALT: u32 = 0;
/// Terminate this process.
pub const SYS_EXIT: u32 = 1;
/// Start another process.
pub const SYS_EXEC: u32 = 2;
/// Wait for a child process to die.
pub const SYS_WAIT: u32 = 3;
/// Create a file.
pub const SYS_CREATE: u32 = 4;
/// Delete a file.
pub const SYS_REMOVE: u32 = 5;
/// Open a file.
pub const SYS_OPEN: u32 = 6;
/// Obtain a file's size.
pub const SYS_FILESIZE: u32 = 7;
/// Read from a file.
pub const SYS_READ: u32 = 8;
/// Write to a file.
pub const SYS_WRITE: u32 = 9;
/// Change position in a file.
pub const SYS_SEEK: u32 = 10;
/// Report current position in a file.
pub const SYS_TELL: u32 = 11;
/// Close a file.
pub const SYS_CLOSE: u32 = 12;

// Reserved for the virtual memory and file system projects. Known to the
// validator, no handler installed.
/// Map a file into memory.
pub const SYS_MMAP: u32 = 13;
/// Remove a memory mapping.
pub const SYS_MUNMAP: u32 = 14;
/// Change the current directory.
pub const SYS_CHDIR: u32 = 15;
/// Create a directory.
pub const SYS_MKDIR: u32 = 16;
/// Reads a directory entry.
pub const SYS_READDIR: u32 = 17;
/// Tests if a fd represents a directory.
pub const SYS_ISDIR: u32 = 18;
/// Returns the inode number for a fd.
pub const SYS_INUMBER: u32 = 19;

/// Lowest number the validator accepts.
pub const SYS_MIN: u32 = SYS_HALT;

/// Highest number the validator accepts.
pub const SYS_MAX: u32 = SYS_INUMBER;

/// Number of dispatch table slots.
pub const SYSCALL_COUNT: usize = SYS_MAX as usize + 1;

/// Is `nr` inside the known range?
#[inline]
pub fn is_known(nr: u32) -> bool {
    (SYS_MIN..=SYS_MAX).contains(&nr)
}

/// Name of a syscall number, for logs.
pub const fn name(nr: u32) -> &'static str {
    match nr {
        SYS_HALT => "halt",
        SYS_EXIT => "exit",
        SYS_EXEC => "exec",
        SYS_WAIT => "wait",
        SYS_CREATE => "create",
        SYS_REMOVE => "remove",
        SYS_OPEN => "open",
        SYS_FILESIZE => "filesize",
        SYS_READ => "read",
        SYS_WRITE => "write",
        SYS_SEEK => "seek",
        SYS_TELL => "tell",
        SYS_CLOSE => "close",
        SYS_MMAP => "mmap",
        SYS_MUNMAP => "munmap",
        SYS_CHDIR => "chdir",
        SYS_MKDIR => "mkdir",
        SYS_READDIR => "readdir",
        SYS_ISDIR => "isdir",
        SYS_INUMBER => "inumber",
        _ => "unknown",
    }
}
